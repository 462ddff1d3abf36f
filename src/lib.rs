//! packfs: an embedded, read-only virtual filesystem
//!
//! A directory tree is packed at build time into a single compressed bundle.
//! At startup the bundle is decoded into an immutable index that serves
//! seekable file handles, paginated directory listings, an ordered tree walk
//! and an HTTP static-file handler.

pub mod bundle;
pub mod config;
pub mod content;
pub mod entry;
pub mod error;
pub mod fs;
pub mod generator;
pub mod handle;
pub mod index;
pub mod logging;
pub mod serve;
pub mod tooling;

pub use bundle::{pack, unpack};
pub use content::LoadMode;
pub use entry::{Entry, EntryKind, FileMode, Metadata};
pub use error::{ApiError, BundleError, FsError};
pub use fs::Filesystem;
pub use generator::Generator;
pub use handle::{Handle, VirtualFile, Whence};
pub use serve::ServeHandler;
