//! Output files.
//!
//! Results are written to a temporary file next to the destination and
//! renamed over it once complete, so a failed run never leaves a truncated
//! table or image behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CompareError, CompareResult};

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write `path` through `write`, replacing it only if `write` succeeds.
pub fn write_atomically<F>(path: &Path, write: F) -> CompareResult<()>
where
    F: FnOnce(&mut File) -> CompareResult<()>,
{
    let parent = parent_dir(path);
    fs::create_dir_all(&parent).map_err(|e| CompareError::io(path, e))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| CompareError::io(path, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush().map_err(|e| CompareError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| CompareError::io(path, e))?;
    tmp.persist(path).map_err(|e| CompareError::io(path, e.error))?;

    debug!(path = %path.display(), "wrote output");
    Ok(())
}

/// Write a byte buffer atomically.
pub fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> CompareResult<()> {
    write_atomically(path, |file| file.write_all(bytes).map_err(|e| CompareError::io(path, e)))
}
