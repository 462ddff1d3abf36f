//! Bundle codec
//!
//! A bundle is the 4-byte magic `PKFS`, a one-byte format version, then a zlib
//! stream whose payload is the bincode encoding of the entry sequence in
//! canonical path order. Changing the field order of [`Entry`], the encoding or
//! the compressor requires a new format version.

use crate::entry::{path_order, Entry};
use crate::error::BundleError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

pub const MAGIC: [u8; 4] = *b"PKFS";
pub const FORMAT_VERSION: u8 = 1;
pub const MAX_LEVEL: u32 = 9;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// Sort, encode and compress `entries` into a bundle.
///
/// The output is byte-for-byte reproducible for the same entry set and level.
pub fn pack(mut entries: Vec<Entry>, level: u32) -> Result<Vec<u8>, BundleError> {
    if level > MAX_LEVEL {
        return Err(BundleError::InvalidLevel(level));
    }
    entries.sort_by(|a, b| path_order(&a.path, &b.path));

    let payload = bincode::serialize(&entries)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() / 2);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    let mut encoder = ZlibEncoder::new(out, Compression::new(level));
    encoder.write_all(&payload)?;
    let out = encoder.finish()?;

    debug!(
        entries = entries.len(),
        raw_bytes = payload.len(),
        packed_bytes = out.len(),
        level,
        "bundle packed"
    );
    Ok(out)
}

/// Decompress and decode a bundle back into its entries.
pub fn unpack(bundle: &[u8]) -> Result<Vec<Entry>, BundleError> {
    if bundle.len() < HEADER_LEN || bundle[..MAGIC.len()] != MAGIC {
        return Err(BundleError::BadMagic);
    }
    let version = bundle[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(BundleError::UnsupportedVersion(version));
    }

    let mut payload = Vec::new();
    ZlibDecoder::new(&bundle[HEADER_LEN..]).read_to_end(&mut payload)?;
    let entries: Vec<Entry> = bincode::deserialize(&payload)?;

    debug!(entries = entries.len(), packed_bytes = bundle.len(), "bundle unpacked");
    Ok(entries)
}
