//! Quest files on disk.
//!
//! A data file is RON, TOML or JSON, chosen by extension. One base name may
//! exist in only one format per directory.

use questline_core::catalog::{Catalog, CatalogBuilder, CatalogError};
use questline_core::definition::QuestDef;
use questline_core::id::QuestId;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// `quests.ron` next to `quests.json`, for instance.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Quest ids are unique across every catalog file.
    #[error("duplicate quest id {id} in {file}")]
    DuplicateQuest { file: PathBuf, id: QuestId },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Every format with its file extension, in lookup order.
    pub const ALL: [(Format, &'static str); 3] =
        [(Format::Ron, "ron"), (Format::Toml, "toml"), (Format::Json, "json")];
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .iter()
        .find(|(_, known)| ext == Some(*known))
        .map(|(format, _)| *format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// The `{base_name}.{ron,toml,json}` file in `dir`, if any.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .iter()
        .map(|(_, ext)| dir.join(format!("{base_name}.{ext}")))
        .filter(|path| path.exists());

    let Some(first) = present.next() else {
        return Ok(None);
    };
    match present.next() {
        Some(second) => Err(DataLoadError::ConflictingFormats { a: first, b: second }),
        None => Ok(Some(first)),
    }
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Parsing
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

fn parse<T: DeserializeOwned>(format: Format, path: &Path, text: &str) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(text).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(text).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(text).map_err(|e| parse_error(path, e)),
    }
}

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    parse(format, path, &std::fs::read_to_string(path)?)
}

/// Read a list of records. TOML has no top-level arrays, so there the list
/// sits under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    if format != Format::Toml {
        return parse(format, path, &text);
    }

    let mut table: toml::Table = parse(format, path, &text)?;
    let list = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("no '{toml_key}' list")))?;
    list.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Catalog loading
// ===========================================================================

/// TOML key holding the quest array.
pub const QUESTS_TOML_KEY: &str = "quests";

/// Read the quest definitions in one file.
pub fn load_quest_file(path: &Path) -> Result<Vec<QuestDef>, DataLoadError> {
    let quests: Vec<QuestDef> = deserialize_list(path, QUESTS_TOML_KEY)?;
    tracing::debug!(file = %path.display(), count = quests.len(), "read quest file");
    Ok(quests)
}

/// Build one catalog from several quest files. Quest ids must be unique
/// across all of them.
pub fn load_catalog(paths: &[PathBuf]) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    for path in paths {
        for quest in load_quest_file(path)? {
            builder.register(quest).map_err(|e| match e {
                CatalogError::DuplicateQuest(id) => DataLoadError::DuplicateQuest {
                    file: path.clone(),
                    id,
                },
            })?;
        }
    }
    let catalog = builder.build();
    tracing::info!(quests = catalog.len(), files = paths.len(), "loaded quest catalog");
    Ok(catalog)
}

// ===========================================================================
// Tests
// ===========================================================================
