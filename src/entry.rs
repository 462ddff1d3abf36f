//! Packed entry records and synthesized file metadata.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Kind of a packed entry. Symlinks and special files are never packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// One file or directory record as stored in a bundle.
///
/// Field order is part of the bundle format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub mod_time: i64,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn file(path: impl Into<String>, mod_time: i64, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size: content.len() as u64,
            mod_time,
            content,
        }
    }

    pub fn directory(path: impl Into<String>, mod_time: i64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            size: 0,
            mod_time,
            content: Vec::new(),
        }
    }

    /// Build an entry from a file or directory on disk, stored under `name`.
    ///
    /// The modification time is truncated to whole seconds.
    pub fn from_disk(source: &Path, name: impl Into<String>) -> Result<Self, ApiError> {
        let name = name.into();
        let metadata = std::fs::symlink_metadata(source)?;
        let mod_time = match metadata.modified()?.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            // pre-epoch: floor toward negative infinity
            Err(e) => {
                let d = e.duration();
                -(d.as_secs() as i64) - i64::from(d.subsec_nanos() > 0)
            }
        };

        if metadata.is_dir() {
            Ok(Entry::directory(name, mod_time))
        } else if metadata.is_file() {
            let content = std::fs::read(source)?;
            Ok(Entry::file(name, mod_time, content))
        } else {
            Err(ApiError::InvalidEntry(format!(
                "{} is neither a regular file nor a directory",
                source.display()
            )))
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Final segment of a slash-separated path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a slash-separated path; top-level paths have the empty parent.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Canonical ordering: component-wise lexicographic.
///
/// A directory sorts directly before its own subtree, and the subtree before the
/// directory's next sibling, so `a/b`, `a/b/c`, `a/b.txt`.
pub fn path_order(a: &str, b: &str) -> Ordering {
    a.split('/').cmp(b.split('/'))
}

/// Unix-style file mode bits synthesized for packed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    const TYPE_MASK: u32 = 0o170000;
    const TYPE_DIR: u32 = 0o040000;

    /// Read-only regular file.
    pub const REGULAR: FileMode = FileMode(0o100444);
    /// Read-only, traversable directory.
    pub const DIRECTORY: FileMode = FileMode(0o040555);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn permissions(self) -> u32 {
        self.0 & 0o777
    }

    pub fn is_dir(self) -> bool {
        self.0 & Self::TYPE_MASK == Self::TYPE_DIR
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        let perms = self.permissions();
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let triple = (perms >> shift) & 0o7;
            out.push(if triple & 0o4 != 0 { 'r' } else { '-' });
            out.push(if triple & 0o2 != 0 { 'w' } else { '-' });
            out.push(if triple & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

/// Metadata synthesized from an entry. There is no backing OS descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    size: u64,
    mode: FileMode,
    modified: DateTime<Utc>,
}

impl Metadata {
    pub(crate) fn new(path: &str, kind: EntryKind, size: u64, mod_time: i64) -> Self {
        let (mode, size) = match kind {
            EntryKind::File => (FileMode::REGULAR, size),
            EntryKind::Directory => (FileMode::DIRECTORY, 0),
        };
        Self {
            name: base_name(path).to_string(),
            size,
            mode,
            // range checked when the index is built
            modified: DateTime::from_timestamp(mod_time, 0).unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// System-specific data; always absent for packed entries.
    pub fn sys(&self) -> Option<&dyn std::any::Any> {
        None
    }
}
