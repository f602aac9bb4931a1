//! Atomic write operations for JSON documents.
//!
//! # Atomicity Guarantee
//!
//! On POSIX systems, file renames within the same filesystem are atomic. This
//! module relies on that to provide crash-safe writes:
//!
//! 1. The document is serialized into a sibling file with a `.tmp` suffix
//! 2. The temporary file is flushed and synced to disk
//! 3. The temporary file is renamed over the target path
//!
//! If a crash occurs during step 1 or 2 the original document remains intact.
//! The temporary file may be left behind; the next successful write replaces it.

use crate::Result;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Atomically writes `value` as pretty-printed JSON to `path`.
///
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if:
/// - A parent directory or the temporary file cannot be created
/// - The value fails to serialize
/// - An I/O error occurs during writing or syncing
/// - The rename fails (e.g., cross-filesystem move)
///
/// On failure the original file (if any) is left unchanged and the temporary
/// file is removed on a best-effort basis.
pub fn write_json_atomic<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = make_temp_path(path);

    if let Err(e) = write_to_temp_file(&temp_path, value) {
        // Best-effort cleanup of temp file
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    debug!(path = %path.display(), "Wrote document");
    Ok(())
}

/// Removes `path` if it exists.
///
/// Returns `true` if a file was removed and `false` if there was nothing to
/// remove.
///
/// # Errors
///
/// Returns an error for any I/O failure other than the file being absent.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    match std::fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Creates a temporary file path for atomic write operations.
///
/// `.tmp` is appended to the full file name, so `a/.codemap.json` becomes
/// `a/.codemap.json.tmp`.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("document"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes `value` into `temp_path`, ensuring it is flushed and synced.
fn write_to_temp_file<T>(temp_path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let file = File::create(temp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    let file = writer.into_inner().map_err(std::io::IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(())
}
