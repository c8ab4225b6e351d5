//! File helpers shared by the snapshot store, the history log and the
//! vocabulary loader.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{GameError, Result};

/// Maximum size of any file wordcall reads into memory (4 MB).
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Read a file into a string, refusing files above [`MAX_FILE_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns an error if the file exceeds `max_size` or cannot be read.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| GameError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(GameError::serde(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| GameError::storage(path, e))
}

/// Read at most the last `max_size` bytes of a file.
///
/// Returns the bytes and whether the front of the file was cut off.
pub fn read_tail(path: &Path, max_size: u64) -> Result<(Vec<u8>, bool)> {
    let mut file = fs::File::open(path).map_err(|e| GameError::storage(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| GameError::storage(path, e))?
        .len();

    let truncated = size > max_size;
    if truncated {
        file.seek(SeekFrom::Start(size - max_size))
            .map_err(|e| GameError::storage(path, e))?;
    }

    let mut bytes = Vec::with_capacity(size.min(max_size) as usize);
    file.take(max_size)
        .read_to_end(&mut bytes)
        .map_err(|e| GameError::storage(path, e))?;
    Ok((bytes, truncated))
}

/// Write `contents` to `path` via a sibling temp file and a rename.
///
/// The temp file is `.<name>.tmp` in the same directory so the rename stays
/// on one filesystem.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| GameError::invalid_state(format!("{} has no file name", path.display())))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&temp_path).map_err(|e| GameError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| GameError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| GameError::storage(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| GameError::storage(path, e))
}
