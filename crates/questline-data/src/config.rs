//! Runtime configuration read from `questline.{ron,toml,json}`.

use crate::loader::{DataLoadError, deserialize_file, find_data_file};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base name of the optional configuration file.
pub const CONFIG_BASE_NAME: &str = "questline";

/// Encoding used for save files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFormat {
    #[default]
    Json,
    Binary,
}

impl SaveFormat {
    /// File name used when the configuration names none.
    pub fn default_file_name(self) -> &'static str {
        match self {
            SaveFormat::Json => "questline_save.json",
            SaveFormat::Binary => "questline_save.bin",
        }
    }
}

/// Where and how progress is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub format: SaveFormat,
    /// Save file path, relative to the data directory unless absolute.
    pub path: Option<String>,
}

/// Session configuration. Every field has a default, so the file may be
/// sparse or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    /// Quests started when a manager is built.
    pub autostart: Vec<u32>,
    pub save: SaveConfig,
    /// Extra quest files, relative to the data directory, read after
    /// `quests.{ron,toml,json}`.
    pub catalog_files: Vec<String>,
}

/// Read the configuration from `dir`, or the defaults if there is none.
pub fn load_config(dir: &Path) -> Result<QuestConfig, DataLoadError> {
    match find_data_file(dir, CONFIG_BASE_NAME)? {
        Some(path) => {
            let config: QuestConfig = deserialize_file(&path)?;
            tracing::debug!(file = %path.display(), ?config, "read config");
            Ok(config)
        }
        None => Ok(QuestConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "questline_config_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = make_test_dir("missing");
        let config = load_config(&dir).unwrap();
        assert_eq!(config, QuestConfig::default());
        assert_eq!(config.save.format, SaveFormat::Json);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn toml_config() {
        let dir = make_test_dir("toml");
        fs::write(
            dir.join("questline.toml"),
            r#"
autostart = [1001, 1002]
catalog_files = ["side_quests.json"]

[save]
format = "Binary"
path = "slot1.bin"
"#,
        )
        .unwrap();

        let config = load_config(&dir).unwrap();
        assert_eq!(config.autostart, vec![1001, 1002]);
        assert_eq!(config.catalog_files, vec!["side_quests.json".to_string()]);
        assert_eq!(config.save.format, SaveFormat::Binary);
        assert_eq!(config.save.path.as_deref(), Some("slot1.bin"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn sparse_ron_config() {
        let dir = make_test_dir("ron");
        fs::write(dir.join("questline.ron"), "(autostart: [7])").unwrap();

        let config = load_config(&dir).unwrap();
        assert_eq!(config.autostart, vec![7]);
        assert_eq!(config.save, SaveConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_file_names_follow_format() {
        assert!(SaveFormat::Json.default_file_name().ends_with(".json"));
        assert!(SaveFormat::Binary.default_file_name().ends_with(".bin"));
    }
}
