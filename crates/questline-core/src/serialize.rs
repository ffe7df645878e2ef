//! Save and restore of quest progress.
//!
//! A save blob records, per quest, whether it was started or completed and,
//! per objective, its counters and the done/stay state of every subtask.
//! Subtasks are keyed by their target id string, not by position, so a
//! restore survives target lists being reordered, extended or trimmed in
//! the catalog between save and load.
//!
//! Two encodings share the same blob: JSON via `serde_json`, and a compact
//! binary form via `bitcode`.

use crate::definition::{ObjectiveDef, ObjectiveType};
use crate::flags::FlagSource;
use crate::id::{Fingerprint, QuestId};
use crate::manager::{QuestManager, record};
use crate::state::{Advance, ObjectiveState, QuestState};
use crate::time::{seconds_from_f64, seconds_to_f64};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a quest save blob.
pub const SAVE_MAGIC: u32 = 0x5155_0001;

/// Current format version. Increment when breaking the save layout.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding a save.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur while decoding a save. The registry is untouched
/// whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SAVE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("save from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
}

// ---------------------------------------------------------------------------
// Save header
// ---------------------------------------------------------------------------

/// Optional header on a save blob. Saves written without one are treated
/// as legacy saves and accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for SaveHeader {
    fn default() -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: FORMAT_VERSION,
        }
    }
}

impl SaveHeader {
    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SAVE_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Save layout
// ---------------------------------------------------------------------------

/// Lists written as `null` read back as empty.
mod null_as_empty {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(list: &[T], s: S) -> Result<S::Ok, S::Error> {
        Some(list).serialize(s)
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<T>, D::Error> {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }
}

/// Saved progress on one subtask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedSubTask {
    /// Target id string; the restore key.
    pub id: String,
    pub done: bool,
    /// Accumulated stay seconds.
    pub stay: f64,
}

/// Saved progress on one objective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SavedObjective {
    #[serde(with = "null_as_empty")]
    pub subs: Vec<SavedSubTask>,
    pub completed: bool,
    /// Informational; the live definition decides optionality.
    pub optional: bool,
    pub seq_index: u32,
    pub progress_count: u32,
    /// [`ObjectiveType::tag`] at save time.
    #[serde(rename = "type")]
    pub objective_type: u8,
}

/// Saved progress on one quest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedQuest {
    pub id: u32,
    pub started: bool,
    pub completed: bool,
    #[serde(with = "null_as_empty")]
    pub objectives: Vec<SavedObjective>,
}

/// The whole save. A missing quest list means "nothing to restore".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveBlob {
    #[serde(default)]
    pub header: Option<SaveHeader>,
    #[serde(default)]
    pub quests: Option<Vec<SavedQuest>>,
}

/// What a restore did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Quests rebuilt from the save.
    pub restored: usize,
    /// Saved quests whose id is not in the catalog.
    pub unknown_quests: usize,
    /// Saved objectives whose type no longer matches the catalog.
    pub objectives_skipped: usize,
    /// Saved subtasks with no matching target in the catalog.
    pub subtasks_dropped: usize,
}

impl SavedObjective {
    fn capture(def: &ObjectiveDef, state: &ObjectiveState) -> Self {
        Self {
            subs: state
                .subtasks
                .iter()
                .map(|sub| SavedSubTask {
                    id: sub.target_id.clone(),
                    done: sub.done,
                    stay: seconds_to_f64(sub.stay_seconds),
                })
                .collect(),
            completed: state.completed,
            optional: def.optional,
            seq_index: state.seq_index as u32,
            progress_count: state.progress_count,
            objective_type: def.objective_type.tag(),
        }
    }
}

impl SavedQuest {
    fn capture(quest: &QuestState) -> Self {
        Self {
            id: quest.id().0,
            started: quest.is_started(),
            completed: quest.is_completed(),
            objectives: quest
                .iter()
                .map(|(def, state)| SavedObjective::capture(def, state))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

impl QuestManager {
    /// Capture every quest with runtime state, in ascending id order.
    pub fn save_blob(&self) -> SaveBlob {
        SaveBlob {
            header: Some(SaveHeader::default()),
            quests: Some(self.quests.values().map(SavedQuest::capture).collect()),
        }
    }

    /// Encode the save as compact JSON.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(&self.save_blob())?)
    }

    /// Encode the save as bitcode.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(&self.save_blob()).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore from JSON. An empty string is "nothing to restore".
    pub fn from_json(
        &mut self,
        json: &str,
        flags: &dyn FlagSource,
    ) -> Result<RestoreReport, DeserializeError> {
        if json.trim().is_empty() {
            return Ok(RestoreReport::default());
        }
        let blob: SaveBlob = serde_json::from_str(json)?;
        self.restore(blob, flags)
    }

    /// Restore from bitcode. An empty slice is "nothing to restore".
    pub fn deserialize(
        &mut self,
        data: &[u8],
        flags: &dyn FlagSource,
    ) -> Result<RestoreReport, DeserializeError> {
        if data.is_empty() {
            return Ok(RestoreReport::default());
        }
        let blob: SaveBlob =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        self.restore(blob, flags)
    }

    /// Replace the registry with the saved progress, rebuilt against the
    /// live catalog.
    ///
    /// Saved quests missing from the catalog are skipped. Objectives are
    /// matched by position; one whose type changed is left fresh. Subtasks
    /// are matched by target id. Afterwards flag objectives are re-checked,
    /// completion is re-derived, and every restored quest is notified.
    pub fn restore(
        &mut self,
        blob: SaveBlob,
        flags: &dyn FlagSource,
    ) -> Result<RestoreReport, DeserializeError> {
        if let Some(header) = &blob.header {
            header.validate()?;
        }
        let Some(saved_quests) = blob.quests else {
            return Ok(RestoreReport::default());
        };

        let mut report = RestoreReport::default();
        let mut quests = BTreeMap::new();
        for saved in &saved_quests {
            let id = QuestId(saved.id);
            let Some(definition) = self.catalog.get(id) else {
                tracing::warn!(quest = %id, "skipping saved quest missing from catalog");
                report.unknown_quests += 1;
                continue;
            };
            let definition = Arc::clone(definition);
            let mut quest = QuestState::build(Arc::clone(&definition));
            quest.set_started(saved.started);
            quest.set_completed(saved.completed);

            let live = definition.objectives.iter().zip(quest.objectives_mut());
            for (index, ((def, state), saved_objective)) in live.zip(&saved.objectives).enumerate() {
                restore_objective(id, index, def, state, saved_objective, &mut report);
            }
            quests.insert(id, quest);
        }
        report.restored = quests.len();
        self.quests = quests;

        let ids: Vec<QuestId> = self.quests.keys().copied().collect();
        for id in &ids {
            let Some(quest) = self.quests.get_mut(id) else {
                continue;
            };
            let outcome = if quest.is_started() {
                quest.recheck_flags(flags)
            } else {
                Advance {
                    quest_completed: quest.refresh_completion(),
                    ..Advance::default()
                }
            };
            record(&mut self.events, quest, &outcome);
        }

        tracing::debug!(
            restored = report.restored,
            unknown = report.unknown_quests,
            objectives_skipped = report.objectives_skipped,
            subtasks_dropped = report.subtasks_dropped,
            "quest progress restored"
        );
        self.notify(&ids, flags);
        Ok(report)
    }
}

fn restore_objective(
    quest: QuestId,
    index: usize,
    def: &ObjectiveDef,
    state: &mut ObjectiveState,
    saved: &SavedObjective,
    report: &mut RestoreReport,
) {
    if ObjectiveType::from_tag(saved.objective_type) != Some(def.objective_type) {
        tracing::warn!(
            quest = %quest,
            objective = index,
            saved = saved.objective_type,
            live = ?def.objective_type,
            "objective type changed since save, progress discarded"
        );
        report.objectives_skipped += 1;
        return;
    }

    state.completed = saved.completed;
    state.progress_count = saved.progress_count;
    state.seq_index = (saved.seq_index as usize).min(state.subtasks.len());

    let mut claimed = vec![false; state.subtasks.len()];
    for sub in &saved.subs {
        let fingerprint = Fingerprint::of(&sub.id);
        let slot = (0..state.subtasks.len())
            .find(|&i| !claimed[i] && state.subtasks[i].fingerprint == fingerprint);
        match slot {
            Some(i) => {
                claimed[i] = true;
                state.subtasks[i].done = sub.done;
                state.subtasks[i].stay_seconds = seconds_from_f64(sub.stay);
            }
            None => {
                tracing::warn!(quest = %quest, objective = index, target = %sub.id, "saved target no longer exists");
                report.subtasks_dropped += 1;
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
