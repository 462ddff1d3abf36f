//! File handles
//!
//! A [`Handle`] is a single-owner cursor over one indexed entry, the in-memory
//! counterpart of an open file descriptor. Regular files carry a byte offset,
//! directories carry a child-enumeration cursor. Both share the open flag and
//! the [`VirtualFile`] capability set; operations a kind does not support
//! report [`FsError::Unsupported`].

use crate::entry::{EntryKind, Metadata};
use crate::error::FsError;
use crate::index::{Index, Node};
use std::io;
use std::sync::Arc;

/// Reference point for [`VirtualFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    /// The offset counts backwards from the end of the content.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = FsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(FsError::BadWhence(other)),
        }
    }
}

/// Operations shared by every handle kind.
pub trait VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, FsError>;
    fn readdir(&mut self, count: isize) -> Result<Vec<Metadata>, FsError>;
    fn stat(&self) -> Metadata;
    fn close(&mut self) -> Result<(), FsError>;
}

#[derive(Debug)]
enum Cursor {
    File { data: Arc<[u8]>, offset: u64 },
    Directory { next: usize },
}

#[derive(Debug)]
pub struct Handle {
    index: Arc<Index>,
    node: Arc<Node>,
    /// Path used to enumerate children; normally the node's own path.
    path: String,
    cursor: Cursor,
    open: bool,
}

impl Handle {
    /// Open a handle on `node`, materializing its content if it is deferred.
    pub(crate) fn open_node(index: Arc<Index>, node: Arc<Node>) -> Result<Self, FsError> {
        let cursor = match node.kind {
            EntryKind::File => Cursor::File {
                data: node.content.bytes()?,
                offset: 0,
            },
            EntryKind::Directory => Cursor::Directory { next: 0 },
        };
        Ok(Self {
            path: node.path.clone(),
            index,
            node,
            cursor,
            open: true,
        })
    }

    /// Reopen the handle and rewind a file to offset 0.
    ///
    /// Calling it on an open handle is allowed and simply rewinds. A directory's
    /// enumeration cursor is left where it is.
    pub fn open(&mut self) -> Result<(), FsError> {
        if !self.index.contains(&self.path) {
            return Err(FsError::not_found(&self.path));
        }
        if let Cursor::File { offset, .. } = &mut self.cursor {
            *offset = 0;
        }
        self.open = true;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_dir(&self) -> bool {
        self.node.kind == EntryKind::Directory
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current byte offset for files, child cursor for directories.
    pub fn position(&self) -> u64 {
        match &self.cursor {
            Cursor::File { offset, .. } => *offset,
            Cursor::Directory { next } => *next as u64,
        }
    }

    fn ensure_open(&self) -> Result<(), FsError> {
        if self.open {
            Ok(())
        } else {
            Err(FsError::Closed)
        }
    }

    fn unsupported(&self, op: &'static str) -> FsError {
        FsError::Unsupported {
            op,
            kind: self.node.kind,
        }
    }

    /// Move a file cursor to `target` if it lies within `[0, size]`.
    fn reposition(&mut self, target: Option<i64>) -> Result<u64, FsError> {
        let Cursor::File { data, offset } = &mut self.cursor else {
            return Err(FsError::Unsupported {
                op: "seek",
                kind: self.node.kind,
            });
        };
        match target {
            Some(t) if t >= 0 && t as u64 <= data.len() as u64 => {
                *offset = t as u64;
                Ok(*offset)
            }
            Some(t) => Err(FsError::BadOffset(t)),
            None => Err(FsError::BadOffset(i64::MAX)),
        }
    }

    fn file_bounds(&self) -> Option<(i64, i64)> {
        match &self.cursor {
            Cursor::File { data, offset } => Some((*offset as i64, data.len() as i64)),
            Cursor::Directory { .. } => None,
        }
    }
}

impl VirtualFile for Handle {
    /// Copy bytes from the current offset. A read at or past the end returns 0.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.ensure_open()?;
        let Cursor::File { data, offset } = &mut self.cursor else {
            return Err(FsError::Unsupported {
                op: "read",
                kind: self.node.kind,
            });
        };
        let start = (*offset as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        *offset += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, FsError> {
        self.ensure_open()?;
        let (pos, size) = self.file_bounds().ok_or_else(|| self.unsupported("seek"))?;
        let target = match whence {
            Whence::Start => Some(offset),
            Whence::Current => pos.checked_add(offset),
            Whence::End => size.checked_sub(offset),
        };
        self.reposition(target)
    }

    /// Paginated listing of immediate children.
    ///
    /// `count <= 0` returns everything left (possibly nothing). `count > 0`
    /// returns at most `count` entries and reports [`FsError::EndOfEntries`]
    /// once the listing is exhausted.
    fn readdir(&mut self, count: isize) -> Result<Vec<Metadata>, FsError> {
        self.ensure_open()?;
        let Cursor::Directory { next } = &mut self.cursor else {
            return Err(FsError::Unsupported {
                op: "readdir",
                kind: self.node.kind,
            });
        };

        let children = self.index.children(&self.path).unwrap_or(&[]);
        let remaining = children.get(*next..).unwrap_or(&[]);
        if count > 0 && remaining.is_empty() {
            return Err(FsError::EndOfEntries);
        }

        let take = if count <= 0 {
            remaining.len()
        } else {
            remaining.len().min(count as usize)
        };
        let listing = remaining[..take]
            .iter()
            .filter_map(|path| self.index.stat(path).ok())
            .collect();
        *next += take;
        Ok(listing)
    }

    fn stat(&self) -> Metadata {
        self.node.metadata()
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.ensure_open()?;
        self.open = false;
        Ok(())
    }
}

impl io::Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        VirtualFile::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let result = match pos {
            io::SeekFrom::Start(n) => {
                let n = i64::try_from(n).unwrap_or(i64::MAX);
                VirtualFile::seek(self, n, Whence::Start)
            }
            io::SeekFrom::Current(n) => VirtualFile::seek(self, n, Whence::Current),
            // std counts End offsets forwards from the end
            io::SeekFrom::End(n) => match n.checked_neg() {
                Some(back) => VirtualFile::seek(self, back, Whence::End),
                None => Err(FsError::BadOffset(n)),
            },
        };
        result.map_err(io::Error::from)
    }
}
