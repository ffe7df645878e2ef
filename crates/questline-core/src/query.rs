//! Read-only views of quest progress for UI and tooling.
//!
//! All types are owned copies, no references into manager storage, so a
//! presentation layer can hold them across dispatches.

use crate::definition::{ObjectiveDef, ObjectiveType};
use crate::id::QuestId;
use crate::manager::QuestManager;
use crate::state::{ObjectiveState, QuestState};
use crate::time::seconds_to_f64;
use serde::Serialize;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// One target of an objective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubTaskView {
    pub target_id: String,
    pub done: bool,
    pub stay_seconds: f64,
}

/// One objective, with a `(current, required)` progress pair suitable for
/// a "2/3" style label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveView {
    pub display_name: String,
    pub objective_type: ObjectiveType,
    pub optional: bool,
    pub completed: bool,
    pub current: u32,
    pub required: u32,
    pub subtasks: Vec<SubTaskView>,
}

/// One quest and all of its objectives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestView {
    pub id: QuestId,
    pub title: String,
    pub description: String,
    pub started: bool,
    pub completed: bool,
    pub objectives: Vec<ObjectiveView>,
}

impl ObjectiveView {
    fn build(def: &ObjectiveDef, state: &ObjectiveState) -> Self {
        let (current, required) = progress_pair(def, state);
        Self {
            display_name: def.display_name.clone(),
            objective_type: def.objective_type,
            optional: def.optional,
            completed: state.completed,
            current,
            required,
            subtasks: state
                .subtasks
                .iter()
                .map(|sub| SubTaskView {
                    target_id: sub.target_id.clone(),
                    done: sub.done,
                    stay_seconds: seconds_to_f64(sub.stay_seconds),
                })
                .collect(),
        }
    }
}

impl QuestView {
    pub fn build(quest: &QuestState) -> Self {
        let def = quest.definition();
        Self {
            id: def.id,
            title: def.title.clone(),
            description: def.description.clone(),
            started: quest.is_started(),
            completed: quest.is_completed(),
            objectives: quest
                .iter()
                .map(|(def, state)| ObjectiveView::build(def, state))
                .collect(),
        }
    }
}

/// Progress counter and its target for one objective. A completed objective
/// always reads as full.
fn progress_pair(def: &ObjectiveDef, state: &ObjectiveState) -> (u32, u32) {
    let targets = state.subtasks.len();
    let done = state.done_count() as u32;
    let (current, required) = match def.objective_type {
        ObjectiveType::InteractSet => (done, targets as u32),
        ObjectiveType::InteractSequence if def.must_follow_order => {
            (state.seq_index as u32, targets as u32)
        }
        ObjectiveType::InteractSequence => (done, targets as u32),
        ObjectiveType::HoldOnTargets => (done, def.hold_target_count(targets) as u32),
        ObjectiveType::TriggerFlags => (0, 1),
        ObjectiveType::StayInArea => (done, def.repeat_target_count()),
        ObjectiveType::Delivery => (state.progress_count, def.repeat_target_count()),
    };
    if state.completed {
        (required, required)
    } else {
        (current.min(required), required)
    }
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

impl QuestManager {
    /// Owned view of one quest. `None` if it has no runtime state.
    pub fn view(&self, id: QuestId) -> Option<QuestView> {
        self.quests.get(&id).map(QuestView::build)
    }

    /// Owned views of every quest with runtime state, in ascending id order.
    pub fn views(&self) -> Vec<QuestView> {
        self.quests.values().map(QuestView::build).collect()
    }
}
