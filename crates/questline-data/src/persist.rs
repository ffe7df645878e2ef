//! Save files on disk.

use crate::config::SaveFormat;
use questline_core::flags::FlagSource;
use questline_core::manager::QuestManager;
use questline_core::serialize::{DeserializeError, RestoreReport, SerializeError};
use std::path::Path;

/// Errors that can occur while writing or reading a save file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),
    #[error("save file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write the manager's progress to `path`. Parent directories are created.
pub fn save_to_file(
    manager: &QuestManager,
    path: &Path,
    format: SaveFormat,
) -> Result<(), PersistError> {
    let bytes = match format {
        SaveFormat::Json => manager.to_json()?.into_bytes(),
        SaveFormat::Binary => manager.serialize()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    tracing::debug!(file = %path.display(), ?format, bytes = bytes.len(), "saved quest progress");
    Ok(())
}

/// Restore the manager's progress from `path`. A missing file means there
/// is nothing to restore yet, and leaves the manager untouched.
pub fn load_from_file(
    manager: &mut QuestManager,
    path: &Path,
    format: SaveFormat,
    flags: &dyn FlagSource,
) -> Result<RestoreReport, PersistError> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "no save file");
        return Ok(RestoreReport::default());
    }
    let bytes = std::fs::read(path)?;
    let report = match format {
        SaveFormat::Json => manager.from_json(&String::from_utf8(bytes)?, flags)?,
        SaveFormat::Binary => manager.deserialize(&bytes, flags)?,
    };
    Ok(report)
}
