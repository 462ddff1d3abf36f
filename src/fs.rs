//! Virtual filesystem over a loaded bundle.

use crate::bundle;
use crate::content::LoadMode;
use crate::entry::{Entry, Metadata};
use crate::error::FsError;
use crate::handle::Handle;
use crate::index::Index;
use crate::serve::ServeHandler;
use std::sync::Arc;
use tracing::debug;

/// Read-only filesystem backed by an immutable index.
///
/// Cloning is cheap and every clone shares the same index, so one instance can
/// be built at startup and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct Filesystem {
    index: Arc<Index>,
}

impl Filesystem {
    /// Load a bundle produced by [`bundle::pack`].
    ///
    /// # Panics
    ///
    /// Panics if the bundle is empty or corrupt. Embedded assets are produced
    /// by the matching packer, so a bad blob means the program was built wrong.
    pub fn new(mode: LoadMode, bundle: &[u8]) -> Self {
        match Self::load(mode, bundle) {
            Ok(fs) => fs,
            Err(err) => panic!("packfs: cannot load embedded bundle: {err}"),
        }
    }

    /// Fallible form of [`Filesystem::new`].
    pub fn load(mode: LoadMode, bundle: &[u8]) -> Result<Self, FsError> {
        let entries =
            bundle::unpack(bundle).map_err(|e| FsError::CorruptBundle(e.to_string()))?;
        let fs = Self::from_entries(entries, mode)?;
        debug!(entries = fs.index.len(), ?mode, "bundle loaded");
        Ok(fs)
    }

    /// Build a filesystem directly from entries, skipping the codec.
    pub fn from_entries(entries: Vec<Entry>, mode: LoadMode) -> Result<Self, FsError> {
        Ok(Self {
            index: Arc::new(Index::build(entries, mode)?),
        })
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Open `path` (exact match) and return a handle positioned at the start.
    pub fn open(&self, path: &str) -> Result<Handle, FsError> {
        let node = self.index.lookup(path)?.clone();
        Handle::open_node(self.index.clone(), node)
    }

    pub fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        self.index.stat(path)
    }

    /// Depth-first pre-order traversal of `root` and everything below it.
    ///
    /// Entries are visited in canonical path order. The first error returned by
    /// `visit` stops the walk and is handed back unchanged. An unknown root is
    /// reported as [`FsError::NotFound`] without calling `visit`.
    pub fn walk<F, E>(&self, root: &str, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&str, &Metadata) -> Result<(), E>,
        E: From<FsError>,
    {
        let root = clean_root(root);
        for path in self.index.subtree(root)? {
            let metadata = self.index.stat(path)?;
            visit(path, &metadata)?;
        }
        Ok(())
    }

    /// HTTP static-file handler rooted at `root`.
    pub fn serve(&self, root: &str) -> ServeHandler {
        ServeHandler::new(self.clone(), clean_root(root))
    }
}

/// Strip a leading `./` and trailing slashes from a caller-supplied root.
pub(crate) fn clean_root(root: &str) -> &str {
    let mut root = root;
    while let Some(rest) = root.strip_prefix("./") {
        root = rest;
    }
    if root == "." {
        return "";
    }
    root.trim_end_matches('/')
}
