//! Atomic snapshot persistence.
//!
//! Every store rewrites its whole snapshot on mutation. Writes go to a
//! temporary file in the same directory followed by an atomic rename, so a
//! crash mid-write leaves the previous snapshot intact.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Serialize `value` as JSON and atomically replace the file at `path`.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Atomically replace the file at `path` with raw text content.
pub fn write_text(path: &Path, content: &str) -> Result<(), PersistError> {
    let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Load a JSON snapshot, creating it with the default value when missing.
///
/// A missing file is the normal first-run case and is healed by writing the
/// default snapshot immediately, so subsequent saves always replace a file
/// that exists.
pub fn load_or_init<T>(path: &Path) -> Result<T, PersistError>
where
    T: DeserializeOwned + Serialize + Default,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "snapshot missing, initializing empty");
            let value = T::default();
            write_snapshot(path, &value)?;
            Ok(value)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load raw text, creating the file with `default` when missing.
pub fn load_text_or_init(path: &Path, default: &str) -> Result<String, PersistError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "file missing, initializing default");
            write_text(path, default)?;
            Ok(default.to_string())
        }
        Err(e) => Err(e.into()),
    }
}
