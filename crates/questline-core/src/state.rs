//! Runtime quest state.
//!
//! A [`QuestState`] is built from its definition the first time the quest
//! starts and mirrors it 1:1: one [`ObjectiveState`] per objective, one
//! [`SubTaskState`] per target id. The manager owns every `QuestState`;
//! everyone else sees them through shared borrows.

use crate::definition::{ObjectiveDef, QuestDef};
use crate::event::WorldEvent;
use crate::flags::FlagSource;
use crate::id::{Fingerprint, QuestId};
use crate::progress;
use crate::time::Seconds;
use std::sync::Arc;

/// Progress on one target of an objective.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTaskState {
    pub target_id: String,
    pub fingerprint: Fingerprint,
    pub done: bool,
    /// Accumulated stay time (StayInArea only).
    pub stay_seconds: Seconds,
}

impl SubTaskState {
    pub fn new(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            fingerprint: Fingerprint::of(target_id),
            done: false,
            stay_seconds: Seconds::ZERO,
        }
    }

    /// Clear progress, keeping identity.
    pub fn reset(&mut self) {
        self.done = false;
        self.stay_seconds = Seconds::ZERO;
    }
}

/// Progress on one objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveState {
    pub completed: bool,
    /// Cursor into `subtasks` for ordered InteractSequence objectives.
    pub seq_index: usize,
    /// Counter for Delivery objectives.
    pub progress_count: u32,
    pub subtasks: Vec<SubTaskState>,
}

impl ObjectiveState {
    pub fn build(def: &ObjectiveDef) -> Self {
        Self {
            completed: false,
            seq_index: 0,
            progress_count: 0,
            subtasks: def.target_ids.iter().map(|t| SubTaskState::new(t)).collect(),
        }
    }

    pub fn done_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.done).count()
    }

    pub fn all_done(&self) -> bool {
        self.subtasks.iter().all(|s| s.done)
    }
}

/// Result of advancing one quest with one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advance {
    pub changed: bool,
    /// Objectives that went from incomplete to complete, in index order.
    pub completed_objectives: Vec<usize>,
    /// The quest itself went from incomplete to complete.
    pub quest_completed: bool,
}

/// Runtime state of one started (or restored) quest.
#[derive(Debug, Clone)]
pub struct QuestState {
    definition: Arc<QuestDef>,
    started: bool,
    completed: bool,
    objectives: Vec<ObjectiveState>,
}

impl QuestState {
    /// Build fresh, unstarted state mirroring `definition`.
    pub fn build(definition: Arc<QuestDef>) -> Self {
        let objectives = definition.objectives.iter().map(ObjectiveState::build).collect();
        Self {
            definition,
            started: false,
            completed: false,
            objectives,
        }
    }

    pub fn id(&self) -> QuestId {
        self.definition.id
    }

    pub fn definition(&self) -> &QuestDef {
        &self.definition
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Started and not yet completed.
    pub fn is_active(&self) -> bool {
        self.started && !self.completed
    }

    pub fn objectives(&self) -> &[ObjectiveState] {
        &self.objectives
    }

    pub fn objective(&self, index: usize) -> Option<&ObjectiveState> {
        self.objectives.get(index)
    }

    /// Definitions paired with their runtime state.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectiveDef, &ObjectiveState)> {
        self.definition.objectives.iter().zip(self.objectives.iter())
    }

    /// Index of the first incomplete objective, if any.
    pub fn first_incomplete(&self) -> Option<usize> {
        self.objectives.iter().position(|o| !o.completed)
    }

    /// Whether every non-optional objective is complete.
    pub fn mandatory_complete(&self) -> bool {
        self.iter().all(|(def, state)| def.optional || state.completed)
    }

    /// Re-derive quest completion from objective state. Returns `true` if
    /// the quest became complete.
    pub fn refresh_completion(&mut self) -> bool {
        let was = self.completed;
        self.completed = self.mandatory_complete();
        !was && self.completed
    }

    pub(crate) fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub(crate) fn objectives_mut(&mut self) -> &mut [ObjectiveState] {
        &mut self.objectives
    }

    /// Offer an event to the eligible objectives. Sequential quests only
    /// offer it to the first incomplete objective; FlagRaised goes through
    /// [`QuestState::recheck_flags`].
    pub fn advance(&mut self, event: &WorldEvent, flags: &dyn FlagSource) -> Advance {
        if let WorldEvent::FlagRaised { .. } = event {
            return self.recheck_flags(flags);
        }

        let mut outcome = Advance::default();
        let definition = Arc::clone(&self.definition);

        if definition.sequential_objectives {
            if let Some(index) = self.first_incomplete() {
                self.try_objective(&definition.objectives[index], index, event, flags, &mut outcome);
            }
        } else {
            for (index, def) in definition.objectives.iter().enumerate() {
                if !self.objectives[index].completed {
                    self.try_objective(def, index, event, flags, &mut outcome);
                }
            }
        }

        if outcome.changed {
            outcome.quest_completed = self.refresh_completion();
        }
        outcome
    }

    /// Re-evaluate TriggerFlags objectives against current flag state.
    ///
    /// Sequential quests cascade: the first incomplete objective is checked,
    /// and if it completes the next one is checked, until one does not.
    pub fn recheck_flags(&mut self, flags: &dyn FlagSource) -> Advance {
        let mut outcome = Advance::default();
        let definition = Arc::clone(&self.definition);

        if definition.sequential_objectives {
            while let Some(index) = self.first_incomplete() {
                let objective = &mut self.objectives[index];
                if !progress::recheck_flags(&definition.objectives[index], objective, flags) {
                    break;
                }
                outcome.changed = true;
                outcome.completed_objectives.push(index);
            }
        } else {
            for (index, def) in definition.objectives.iter().enumerate() {
                let objective = &mut self.objectives[index];
                if progress::recheck_flags(def, objective, flags) {
                    outcome.changed = true;
                    outcome.completed_objectives.push(index);
                }
            }
        }

        // Always re-derive: a restore may have copied a stale quest flag.
        outcome.quest_completed = self.refresh_completion();
        outcome
    }

    fn try_objective(
        &mut self,
        def: &ObjectiveDef,
        index: usize,
        event: &WorldEvent,
        flags: &dyn FlagSource,
        outcome: &mut Advance,
    ) {
        let objective = &mut self.objectives[index];
        let was_complete = objective.completed;
        if progress::advance(def, objective, event, flags) {
            outcome.changed = true;
            if !was_complete && objective.completed {
                outcome.completed_objectives.push(index);
            }
        }
    }
}
