//! Filesystem index
//!
//! Built once from decoded entries and never mutated afterwards. Holds the
//! path map, the canonical path ordering and each directory's child list.

use crate::content::{Content, LoadMode};
use crate::entry::{parent_path, path_order, Entry, EntryKind, Metadata};
use crate::error::FsError;
use chrono::DateTime;
use std::collections::HashMap;
use std::sync::Arc;

/// An indexed entry: entry metadata plus its loaded content.
#[derive(Debug)]
pub struct Node {
    pub(crate) path: String,
    pub(crate) kind: EntryKind,
    pub(crate) size: u64,
    pub(crate) mod_time: i64,
    pub(crate) content: Content,
}

impl Node {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn metadata(&self) -> Metadata {
        Metadata::new(&self.path, self.kind, self.size, self.mod_time)
    }
}

#[derive(Debug, Default)]
pub struct Index {
    nodes: HashMap<String, Arc<Node>>,
    /// All paths in canonical order.
    paths: Vec<String>,
    /// Directory path -> child paths in canonical order. Top-level entries live under "".
    children: HashMap<String, Vec<String>>,
}

impl Index {
    pub fn build(mut entries: Vec<Entry>, mode: LoadMode) -> Result<Self, FsError> {
        // bundles arrive sorted; this keeps hand-built entry sets canonical too
        entries.sort_by(|a, b| path_order(&a.path, &b.path));

        let mut index = Index {
            nodes: HashMap::with_capacity(entries.len()),
            paths: Vec::with_capacity(entries.len()),
            children: HashMap::new(),
        };

        for entry in entries {
            let Entry {
                path,
                kind,
                size,
                mod_time,
                content,
            } = entry;
            if DateTime::from_timestamp(mod_time, 0).is_none() {
                return Err(FsError::CorruptBundle(format!(
                    "{path}: modification time {mod_time} out of range"
                )));
            }
            let size = match kind {
                EntryKind::File => content.len() as u64,
                EntryKind::Directory => size,
            };
            index
                .children
                .entry(parent_path(&path).to_string())
                .or_default()
                .push(path.clone());
            let node = Node {
                path: path.clone(),
                kind,
                size,
                mod_time,
                content: Content::new(content, mode)?,
            };
            index.nodes.insert(path.clone(), Arc::new(node));
            index.paths.push(path);
        }

        Ok(index)
    }

    /// Exact-match lookup; no normalization is applied.
    pub fn lookup(&self, path: &str) -> Result<&Arc<Node>, FsError> {
        self.nodes.get(path).ok_or_else(|| FsError::not_found(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        Ok(self.lookup(path)?.metadata())
    }

    /// Immediate children of `dir`, or `None` when nothing is recorded under it.
    pub fn children(&self, dir: &str) -> Option<&[String]> {
        self.children.get(dir).map(Vec::as_slice)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// `root` followed by its whole subtree, in canonical order.
    ///
    /// The empty root stands for the whole index.
    pub fn subtree(&self, root: &str) -> Result<&[String], FsError> {
        if root.is_empty() {
            return Ok(&self.paths);
        }
        if !self.contains(root) {
            return Err(FsError::not_found(root));
        }
        let start = self
            .paths
            .binary_search_by(|p| path_order(p, root))
            .map_err(|_| FsError::not_found(root))?;
        let prefix = format!("{root}/");
        let len = self.paths[start + 1..]
            .iter()
            .take_while(|p| p.starts_with(&prefix))
            .count();
        Ok(&self.paths[start..=start + len])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
