//! In-memory holders for entry content after a bundle is loaded.

use crate::error::FsError;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

/// How file content is held once a bundle is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Every file's bytes are materialized at load time.
    #[default]
    Eager,
    /// Each file is kept deflated and inflated on first open, then cached.
    Lazy,
}

impl LoadMode {
    pub fn from_lazy_flag(lazy: bool) -> Self {
        if lazy {
            LoadMode::Lazy
        } else {
            LoadMode::Eager
        }
    }
}

#[derive(Debug)]
pub(crate) enum Content {
    Plain(Arc<[u8]>),
    Deferred {
        packed: Box<[u8]>,
        len: usize,
        cache: OnceLock<Arc<[u8]>>,
    },
}

impl Content {
    pub(crate) fn new(bytes: Vec<u8>, mode: LoadMode) -> Result<Self, FsError> {
        match mode {
            LoadMode::Eager => Ok(Content::Plain(bytes.into())),
            LoadMode::Lazy if bytes.is_empty() => Ok(Content::Plain(bytes.into())),
            LoadMode::Lazy => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
                encoder
                    .write_all(&bytes)
                    .and_then(|_| encoder.finish())
                    .map(|packed| Content::Deferred {
                        packed: packed.into_boxed_slice(),
                        len: bytes.len(),
                        cache: OnceLock::new(),
                    })
                    .map_err(|e| FsError::CorruptBundle(e.to_string()))
            }
        }
    }

    /// Materialized bytes, inflating deferred content on first use.
    pub(crate) fn bytes(&self) -> Result<Arc<[u8]>, FsError> {
        match self {
            Content::Plain(bytes) => Ok(bytes.clone()),
            Content::Deferred { packed, len, cache } => {
                if let Some(bytes) = cache.get() {
                    return Ok(bytes.clone());
                }
                let mut out = Vec::with_capacity(*len);
                DeflateDecoder::new(&packed[..])
                    .read_to_end(&mut out)
                    .map_err(|e| FsError::CorruptBundle(e.to_string()))?;
                if out.len() != *len {
                    return Err(FsError::CorruptBundle(format!(
                        "inflated {} bytes, expected {}",
                        out.len(),
                        len
                    )));
                }
                Ok(cache.get_or_init(|| out.into()).clone())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_materialized(&self) -> bool {
        match self {
            Content::Plain(_) => true,
            Content::Deferred { cache, .. } => cache.get().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eager_is_plain() {
        let content = Content::new(b"abc".to_vec(), LoadMode::Eager).unwrap();
        assert!(content.is_materialized());
        assert_eq!(&content.bytes().unwrap()[..], b"abc");
    }

    #[test]
    fn test_lazy_inflates_once() {
        let data = b"lazy lazy lazy lazy lazy lazy".repeat(8);
        let content = Content::new(data.clone(), LoadMode::Lazy).unwrap();
        assert!(!content.is_materialized());

        let first = content.bytes().unwrap();
        assert!(content.is_materialized());
        let second = content.bytes().unwrap();
        assert_eq!(&first[..], &data[..]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lazy_empty_stays_plain() {
        let content = Content::new(Vec::new(), LoadMode::Lazy).unwrap();
        assert!(content.is_materialized());
        assert!(content.bytes().unwrap().is_empty());
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(LoadMode::from_lazy_flag(true), LoadMode::Lazy);
        assert_eq!(LoadMode::from_lazy_flag(false), LoadMode::Eager);
        assert_eq!(LoadMode::default(), LoadMode::Eager);
    }
}
