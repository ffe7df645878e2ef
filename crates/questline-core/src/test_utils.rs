//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::Catalog;
use crate::definition::{ObjectiveDef, ObjectiveType, QuestDef};
use crate::event::{InteractionKind, Position, WorldEvent};
use crate::flags::NoFlags;
use crate::id::QuestId;
use crate::manager::QuestManager;
use std::sync::Arc;

// ===========================================================================
// Quest ids
// ===========================================================================

pub const BOXES: QuestId = QuestId(1001);
pub const LEVERS: QuestId = QuestId(1002);
pub const LANTERNS: QuestId = QuestId(1003);
pub const CAMP: QuestId = QuestId(1004);
pub const ERRANDS: QuestId = QuestId(1005);

// ===========================================================================
// Event constructors
// ===========================================================================

pub fn press(id: &str) -> WorldEvent {
    WorldEvent::interact(id, Position::ORIGIN, InteractionKind::Press)
}

pub fn hold(id: &str) -> WorldEvent {
    WorldEvent::interact(id, Position::ORIGIN, InteractionKind::Hold)
}

pub fn stay(area_id: &str, delta_seconds: f32) -> WorldEvent {
    WorldEvent::area_stay_tick(area_id, delta_seconds, Position::ORIGIN)
}

pub fn deliver(item_id: &str, receiver_id: &str) -> WorldEvent {
    WorldEvent::delivery(item_id, receiver_id, Position::ORIGIN)
}

// ===========================================================================
// Quest definitions
// ===========================================================================

/// Open three boxes in any order.
pub fn boxes_quest() -> QuestDef {
    QuestDef::new(BOXES.0, "Open the boxes").with_objective(
        ObjectiveDef::new("Open boxes", ObjectiveType::InteractSet)
            .with_targets(&["Box_A", "Box_B", "Box_C"])
            .granting_flags(&["boxes_opened"]),
    )
}

/// Pull three levers in order; a wrong lever resets the puzzle.
pub fn levers_quest() -> QuestDef {
    QuestDef::new(LEVERS.0, "Lever puzzle").with_objective(
        ObjectiveDef::new("Pull the levers in order", ObjectiveType::InteractSequence)
            .with_targets(&["Lever_1", "Lever_2", "Lever_3"])
            .ordered(true),
    )
}

/// Light two of three lanterns by holding the interact button.
pub fn lanterns_quest() -> QuestDef {
    let mut light = ObjectiveDef::new("Light lanterns", ObjectiveType::HoldOnTargets)
        .with_targets(&["Lantern_1", "Lantern_2", "Lantern_3"])
        .with_required_count(2);
    light.required_hold_seconds = 1.5;
    QuestDef::new(LANTERNS.0, "Lanterns").with_objective(light)
}

/// Rest at camp for five seconds.
pub fn camp_quest() -> QuestDef {
    QuestDef::new(CAMP.0, "Rest at camp").with_objective(
        ObjectiveDef::new("Stay at camp", ObjectiveType::StayInArea)
            .with_targets(&["Camp"])
            .with_stay_seconds(5.0),
    )
}

/// Sequential errand chain: open the gate (flag), deliver three apples to
/// the farmer, then an optional chat with the mayor.
pub fn errands_quest() -> QuestDef {
    QuestDef::new(ERRANDS.0, "Errands")
        .sequential()
        .with_objective(
            ObjectiveDef::new("Open the gate", ObjectiveType::TriggerFlags)
                .with_flags(&["gate_open"]),
        )
        .with_objective(
            ObjectiveDef::new("Bring apples to the farmer", ObjectiveType::Delivery)
                .with_item("apple")
                .with_targets(&["Farmer"])
                .with_required_count(3)
                .granting_item("coin", 10),
        )
        .with_objective(
            ObjectiveDef::new("Chat with the mayor", ObjectiveType::InteractSet)
                .with_targets(&["Mayor"])
                .optional(),
        )
}

/// All five demo quests.
pub fn demo_quests() -> Vec<QuestDef> {
    vec![
        boxes_quest(),
        levers_quest(),
        lanterns_quest(),
        camp_quest(),
        errands_quest(),
    ]
}

// ===========================================================================
// Catalog / manager builders
// ===========================================================================

pub fn demo_catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_quests(demo_quests()).expect("demo quest ids are unique"))
}

/// A manager over the demo catalog with every demo quest started.
pub fn demo_manager() -> QuestManager {
    let mut manager = QuestManager::new(demo_catalog());
    for id in [BOXES, LEVERS, LANTERNS, CAMP, ERRANDS] {
        manager.start_quest(id, &NoFlags);
    }
    manager.drain_events();
    manager
}

/// A catalog of `count` InteractSet quests with `targets` targets each,
/// ids starting at 1. Target ids are `q{quest}_t{target}`.
pub fn wide_catalog(count: u32, targets: u32) -> Arc<Catalog> {
    let quests = (1..=count).map(|q| {
        let ids: Vec<String> = (0..targets).map(|t| format!("q{q}_t{t}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        QuestDef::new(q, &format!("Quest {q}"))
            .with_objective(ObjectiveDef::new("Touch", ObjectiveType::InteractSet).with_targets(&refs))
    });
    Arc::new(Catalog::from_quests(quests).expect("generated quest ids are unique"))
}
