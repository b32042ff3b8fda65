//! Whole-file read and write of the history.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use alerthist_error::{HistoryError, Result};
use alerthist_store::HistoryStore;
use alerthist_types::ByteOrder;
use tracing::{debug, info};

use crate::codec::{decode, encode};

/// Load the history stored at `path`.
///
/// Returns `Ok(None)` when nothing exists at `path`, which callers treat as
/// an empty history.
///
/// # Errors
/// `NotARegularFile` if `path` is a directory or special file, `CannotRead`
/// if it cannot be opened or read, `Malformed`/`OutOfMemory` from decoding.
pub fn read_history_file(path: &Path, order: ByteOrder) -> Result<Option<HistoryStore>> {
    let cannot_read = |source: io::Error| HistoryError::CannotRead {
        path: path.to_path_buf(),
        source,
    };
    if !is_existing_regular_file(path, cannot_read)? {
        debug!(path = %path.display(), "no alert history file yet");
        return Ok(None);
    }

    let bytes = fs::read(path).map_err(cannot_read)?;
    let store = decode(&bytes, order).map_err(|err| match err {
        HistoryError::Malformed { detail } => {
            HistoryError::malformed(format!("'{}': {detail}", path.display()))
        }
        other => other,
    })?;
    info!(
        path = %path.display(),
        buckets = store.len(),
        occurrences = store.total_occurrences(),
        "alert history loaded"
    );
    Ok(Some(store))
}

/// Replace the file at `path` with the full encoding of `store`.
///
/// The file is truncated and rewritten in place, then synced.
///
/// # Errors
/// `NotARegularFile` if `path` exists but is not a regular file,
/// `CannotWrite` on any create/write/sync failure.
pub fn write_history_file(path: &Path, store: &HistoryStore, order: ByteOrder) -> Result<()> {
    let cannot_write = |source: io::Error| HistoryError::CannotWrite {
        path: path.to_path_buf(),
        source,
    };
    is_existing_regular_file(path, cannot_write)?;

    let bytes = encode(store, order)?;
    let mut file = File::create(path).map_err(cannot_write)?;
    file.write_all(&bytes).map_err(cannot_write)?;
    file.sync_data().map_err(cannot_write)?;
    info!(
        path = %path.display(),
        buckets = store.len(),
        bytes = bytes.len(),
        "alert history written"
    );
    Ok(())
}

/// `Ok(true)` for an existing regular file, `Ok(false)` if nothing exists at
/// `path`.
fn is_existing_regular_file(
    path: &Path,
    on_io_error: impl FnOnce(io::Error) -> HistoryError,
) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => Err(HistoryError::NotARegularFile {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(on_io_error(err)),
    }
}
