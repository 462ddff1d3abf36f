//! Error types for the bundle codec, the virtual filesystem and the tooling layer.

use crate::entry::EntryKind;
use thiserror::Error;

/// Errors raised by the virtual filesystem and its handles.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{path}: file does not exist")]
    NotFound { path: String },

    #[error("file already closed")]
    Closed,

    #[error("Seek: bad whence")]
    BadWhence(i32),

    #[error("Seek: bad offset")]
    BadOffset(i64),

    #[error("no more directory entries")]
    EndOfEntries,

    #[error("{op}: not supported on a {kind}")]
    Unsupported { op: &'static str, kind: EntryKind },

    #[error("corrupt bundle: {0}")]
    CorruptBundle(String),
}

impl FsError {
    pub(crate) fn not_found(path: &str) -> Self {
        FsError::NotFound {
            path: path.to_string(),
        }
    }
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        use std::io::ErrorKind;
        let kind = match &err {
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::BadWhence(_) | FsError::BadOffset(_) => ErrorKind::InvalidInput,
            FsError::EndOfEntries => ErrorKind::UnexpectedEof,
            FsError::Unsupported { .. } => ErrorKind::Unsupported,
            FsError::CorruptBundle(_) => ErrorKind::InvalidData,
            FsError::Closed => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Errors raised while packing or unpacking a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("compression level {0} out of range 0..=9")]
    InvalidLevel(u32),

    #[error("not a packfs bundle (bad magic)")]
    BadMagic,

    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u8),

    #[error("entry serialization failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("bundle I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the generator, configuration and CLI layers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid ignore file: {0}")]
    Ignore(#[from] ignore::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<walkdir::Error> for ApiError {
    fn from(err: walkdir::Error) -> Self {
        ApiError::Io(err.into())
    }
}
