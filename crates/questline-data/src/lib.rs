//! Data-driven setup for questline sessions.
//!
//! A data directory holds:
//!
//! - `quests.{ron,toml,json}` (required): the quest catalog. TOML files keep
//!   the list under a `quests` key.
//! - `questline.{ron,toml,json}` (optional): a [`QuestConfig`] naming the
//!   autostart quests, extra catalog files and save settings.
//!
//! [`load_game_data`] reads both; [`GameData`] then builds managers and
//! saves or restores their progress.

pub mod config;
pub mod loader;
pub mod persist;

pub use config::{QuestConfig, SaveConfig, SaveFormat};
pub use loader::DataLoadError;
pub use persist::PersistError;

use questline_core::catalog::Catalog;
use questline_core::flags::FlagSource;
use questline_core::id::QuestId;
use questline_core::manager::QuestManager;
use questline_core::serialize::RestoreReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base name of the required catalog file.
pub const QUESTS_BASE_NAME: &str = "quests";

/// Everything loaded from one data directory.
#[derive(Debug, Clone)]
pub struct GameData {
    pub dir: PathBuf,
    pub config: QuestConfig,
    pub catalog: Arc<Catalog>,
}

/// Load configuration and catalog from `dir`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let config = config::load_config(dir)?;

    let mut files = vec![loader::require_data_file(dir, QUESTS_BASE_NAME)?];
    files.extend(config.catalog_files.iter().map(|f| dir.join(f)));
    let catalog = loader::load_catalog(&files)?;

    Ok(GameData {
        dir: dir.to_path_buf(),
        config,
        catalog: Arc::new(catalog),
    })
}

impl GameData {
    /// A fresh manager over the catalog with the autostart quests started.
    /// Unknown autostart ids are logged and skipped.
    pub fn build_manager(&self, flags: &dyn FlagSource) -> QuestManager {
        let mut manager = QuestManager::new(Arc::clone(&self.catalog));
        for &id in &self.config.autostart {
            manager.start_quest(QuestId(id), flags);
        }
        manager
    }

    /// Resolved save file path.
    pub fn save_path(&self) -> PathBuf {
        let save = &self.config.save;
        match &save.path {
            Some(path) => self.dir.join(path),
            None => self.dir.join(save.format.default_file_name()),
        }
    }

    /// Save the manager's progress with the configured format and path.
    pub fn save(&self, manager: &QuestManager) -> Result<(), PersistError> {
        persist::save_to_file(manager, &self.save_path(), self.config.save.format)
    }

    /// Restore the manager's progress from the configured save file.
    pub fn load(
        &self,
        manager: &mut QuestManager,
        flags: &dyn FlagSource,
    ) -> Result<RestoreReport, PersistError> {
        persist::load_from_file(manager, &self.save_path(), self.config.save.format, flags)
    }
}
