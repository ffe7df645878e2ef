//! Objective progression rules.
//!
//! Every function takes an objective's definition, its mutable runtime
//! state and one input, and returns whether the state changed. Completed
//! objectives never change. Functions never look at other objectives;
//! gating and quest completion live in [`crate::state`].

use crate::definition::{ObjectiveDef, ObjectiveType};
use crate::event::{AreaStay, DeliveryDrop, Interaction, InteractionKind, WorldEvent};
use crate::flags::FlagSource;
use crate::id::Fingerprint;
use crate::state::ObjectiveState;
use crate::time::{Seconds, seconds_from_f32};

/// Lower bound on a stay requirement, so a zero requirement still needs
/// at least one tick of presence.
pub const MIN_STAY_SECONDS: f32 = 0.01;

/// Route an event to the rule for the objective's type.
pub fn advance(
    def: &ObjectiveDef,
    state: &mut ObjectiveState,
    event: &WorldEvent,
    flags: &dyn FlagSource,
) -> bool {
    match event {
        WorldEvent::Interact(msg) => on_interact(def, state, msg),
        WorldEvent::AreaStayTick(tick) => on_area_stay(def, state, tick),
        WorldEvent::Delivery(delivery) => on_delivery(def, state, delivery),
        WorldEvent::FlagRaised { .. } => recheck_flags(def, state, flags),
    }
}

// ---------------------------------------------------------------------------
// Interact
// ---------------------------------------------------------------------------

/// InteractSet, InteractSequence and HoldOnTargets react to interactions.
pub fn on_interact(def: &ObjectiveDef, state: &mut ObjectiveState, msg: &Interaction) -> bool {
    if state.completed || state.subtasks.is_empty() {
        return false;
    }

    match def.objective_type {
        ObjectiveType::InteractSet => mark_any(state, msg.fingerprint),
        ObjectiveType::InteractSequence if def.must_follow_order => {
            advance_sequence(def, state, msg.fingerprint)
        }
        ObjectiveType::InteractSequence => mark_any(state, msg.fingerprint),
        ObjectiveType::HoldOnTargets => {
            if msg.kind != InteractionKind::Hold {
                return false;
            }
            let Some(sub) = find_open(state, msg.fingerprint) else {
                return false;
            };
            state.subtasks[sub].done = true;
            if state.done_count() >= def.hold_target_count(state.subtasks.len()) {
                state.completed = true;
            }
            true
        }
        ObjectiveType::TriggerFlags | ObjectiveType::StayInArea | ObjectiveType::Delivery => false,
    }
}

/// Mark the first open subtask with this fingerprint; complete when all are done.
fn mark_any(state: &mut ObjectiveState, fingerprint: Fingerprint) -> bool {
    let Some(sub) = find_open(state, fingerprint) else {
        return false;
    };
    state.subtasks[sub].done = true;
    state.completed = state.all_done();
    true
}

fn find_open(state: &ObjectiveState, fingerprint: Fingerprint) -> Option<usize> {
    state
        .subtasks
        .iter()
        .position(|s| !s.done && s.fingerprint == fingerprint)
}

fn advance_sequence(def: &ObjectiveDef, state: &mut ObjectiveState, fingerprint: Fingerprint) -> bool {
    let idx = state.seq_index;
    if idx >= state.subtasks.len() {
        return false;
    }

    if state.subtasks[idx].fingerprint == fingerprint {
        state.subtasks[idx].done = true;
        state.seq_index += 1;
        if state.seq_index >= state.subtasks.len() {
            state.completed = true;
        }
        return true;
    }

    if def.reset_on_wrong_order {
        reset_sequence(state);
        return true;
    }
    false
}

/// Clear every subtask and rewind the cursor.
pub fn reset_sequence(state: &mut ObjectiveState) {
    for sub in &mut state.subtasks {
        sub.reset();
    }
    state.seq_index = 0;
}

// ---------------------------------------------------------------------------
// Area stay
// ---------------------------------------------------------------------------

/// StayInArea accumulates presence on every matching subtask. Only a subtask
/// crossing its threshold counts as a change.
pub fn on_area_stay(def: &ObjectiveDef, state: &mut ObjectiveState, tick: &AreaStay) -> bool {
    if state.completed || def.objective_type != ObjectiveType::StayInArea {
        return false;
    }

    let delta = seconds_from_f32(tick.delta_seconds);
    let required = stay_threshold(def);
    let mut touched = false;

    for sub in state.subtasks.iter_mut().filter(|s| s.fingerprint == tick.fingerprint) {
        sub.stay_seconds = sub.stay_seconds.saturating_add(delta);
        if !sub.done && sub.stay_seconds >= required {
            sub.done = true;
            touched = true;
        }
    }

    if !touched {
        return false;
    }
    if state.done_count() as u32 >= def.repeat_target_count() {
        state.completed = true;
    }
    true
}

/// Threshold a StayInArea subtask must reach.
pub fn stay_threshold(def: &ObjectiveDef) -> Seconds {
    seconds_from_f32(def.required_stay_seconds.max(MIN_STAY_SECONDS))
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Delivery counts accepted drops of the configured item at a configured
/// receiver. Receiver subtasks are never marked done.
pub fn on_delivery(def: &ObjectiveDef, state: &mut ObjectiveState, delivery: &DeliveryDrop) -> bool {
    if state.completed || def.objective_type != ObjectiveType::Delivery {
        return false;
    }

    if def
        .effective_delivery_item()
        .is_some_and(|item| item != delivery.item_id)
    {
        return false;
    }

    if !state.subtasks.is_empty()
        && !state
            .subtasks
            .iter()
            .any(|s| s.fingerprint == delivery.receiver_fingerprint)
    {
        return false;
    }

    state.progress_count = state.progress_count.saturating_add(1);
    if state.progress_count >= def.repeat_target_count() {
        state.completed = true;
    }
    true
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// TriggerFlags completes in one step once every required flag is raised.
/// An empty flag list never completes.
pub fn recheck_flags(def: &ObjectiveDef, state: &mut ObjectiveState, flags: &dyn FlagSource) -> bool {
    if state.completed || def.objective_type != ObjectiveType::TriggerFlags {
        return false;
    }
    if def.required_flags.is_empty() {
        return false;
    }
    if !def.required_flags.iter().all(|f| flags.is_raised(f)) {
        return false;
    }
    state.completed = true;
    true
}

// ===========================================================================
// Tests
// ===========================================================================
