//! Staging of buffer inputs as temporary files.
//!
//! pdftk only reads documents from paths, so raw byte inputs are written to
//! a uniquely named file in the configured staging directory first. The
//! request that staged a file owns it and removes it after execution.

use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::error::{Error, Result};

/// Write `bytes` to a fresh, collision-resistant file under `dir`.
///
/// The name is 128 bits of randomness, hex-encoded, so concurrent requests
/// sharing a staging directory never need locking. The write completes
/// before this returns; the path can be referenced immediately.
pub(crate) fn stage_buffer(dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| Error::Staging { source })?;

    let mut name = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut name);
    let path = dir.join(hex::encode(name));

    fs::write(&path, bytes).map_err(|source| Error::Staging { source })?;
    tracing::debug!("staged {} byte buffer at {}", bytes.len(), path.display());

    Ok(path)
}
