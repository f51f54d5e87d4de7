//! Whole-file reads and writes, and scoped scratch directories.
//!
//! Every failure is mapped to [`CompressError::Io`] with the offending path.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use crate::error::{CompressError, Result};

/// Read a whole file into memory.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| CompressError::io(path, &e))
}

/// Write a whole buffer, replacing any existing file.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| CompressError::io(path, &e))
}

/// Whether a write may replace a file that is already there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    #[default]
    Allow,
    Deny,
}

/// Write a whole buffer to a path that must not exist yet.
///
/// The existence check and the create are one operation, so a file that
/// appears between planning and writing is never clobbered.
pub fn create_file(path: &Path, bytes: &[u8]) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|mut file| file.write_all(bytes))
        .map_err(|e| CompressError::io(path, &e))
}

/// Write with the given overwrite policy.
pub fn save(path: &Path, bytes: &[u8], overwrite: Overwrite) -> Result<()> {
    match overwrite {
        Overwrite::Allow => write_file(path, bytes),
        Overwrite::Deny => create_file(path, bytes),
    }
}

/// Size of a file on disk, in bytes.
pub fn file_len(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|e| CompressError::io(path, &e))
}

/// Create a scratch directory that is removed when the handle drops.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("sizefit-")
        .tempdir()
        .map_err(|e| CompressError::io(std::env::temp_dir(), &e))
}
