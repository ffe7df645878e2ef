//! Immutable quest and objective definitions.
//!
//! Definitions are authored in data files (see `questline-data`) or built in
//! code with the `ObjectiveDef` builder methods, then frozen inside a
//! [`Catalog`](crate::catalog::Catalog). Field names mirror the data-file
//! keys; every field has a default so sparse data files deserialize.

use crate::id::QuestId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Objective type
// ---------------------------------------------------------------------------

/// How an objective progresses. Each variant has its own progression rule
/// in [`crate::progress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectiveType {
    /// Interact with each target once, in any order.
    #[default]
    InteractSet = 0,
    /// Interact with the targets, optionally in the defined order.
    InteractSequence = 1,
    /// Complete hold-interactions on a number of targets.
    HoldOnTargets = 2,
    /// Complete when every required flag is raised.
    TriggerFlags = 3,
    /// Accumulate time inside one or more areas.
    StayInArea = 4,
    /// Deliver an item, optionally to specific receivers.
    Delivery = 5,
}

impl ObjectiveType {
    /// Stable numeric tag written to save files.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ObjectiveType::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::InteractSet),
            1 => Some(Self::InteractSequence),
            2 => Some(Self::HoldOnTargets),
            3 => Some(Self::TriggerFlags),
            4 => Some(Self::StayInArea),
            5 => Some(Self::Delivery),
            _ => None,
        }
    }

    /// Whether this type reads `target_ids` at all.
    pub fn uses_targets(self) -> bool {
        !matches!(self, Self::TriggerFlags)
    }
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

/// An item granted when an objective completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemReward {
    pub item_id: String,
    pub count: i32,
}

// ---------------------------------------------------------------------------
// Objective definition
// ---------------------------------------------------------------------------

/// One measurable condition within a quest.
///
/// Most parameters only apply to some objective types. `required_count <= 0`
/// means "type default": all targets for InteractSet and HoldOnTargets, one
/// for the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveDef {
    pub display_name: String,
    #[serde(rename = "type")]
    pub objective_type: ObjectiveType,
    /// Excluded from the quest completion requirement.
    pub optional: bool,

    /// Interaction ids, area ids or receiver ids depending on the type.
    pub target_ids: Vec<String>,

    pub must_follow_order: bool,
    pub reset_on_wrong_order: bool,

    /// Hold duration the producer enforces before raising a Hold interaction.
    pub required_hold_seconds: f32,
    pub required_stay_seconds: f32,
    /// Producer-side exit grace. The engine does not read it.
    pub stay_exit_grace_seconds: f32,
    /// Producer-side reset policy. The engine does not read it.
    pub reset_stay_on_exit: bool,

    pub required_item_id: String,
    /// Falls back to `required_item_id` after validation.
    pub delivery_item_id: String,
    /// Consumption is the delivery handler's job; carried for it to read.
    pub consume_on_delivery: bool,
    pub consume_amount: i32,

    pub required_count: i32,

    /// TriggerFlags only.
    pub required_flags: Vec<String>,

    /// Reserved hook: declared and normalized, no failure transition exists.
    pub time_limit_seconds: f32,
    pub fail_on_timeout: bool,

    pub grant_flags_on_complete: Vec<String>,
    pub grant_items_on_complete: Vec<ItemReward>,
}

impl ObjectiveDef {
    /// Create an objective of the given type with every parameter defaulted.
    pub fn new(display_name: &str, objective_type: ObjectiveType) -> Self {
        Self {
            display_name: display_name.to_string(),
            objective_type,
            ..Default::default()
        }
    }

    /// Set the target id list.
    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.target_ids = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Require targets in order; `reset` restarts the sequence on a wrong target.
    pub fn ordered(mut self, reset: bool) -> Self {
        self.must_follow_order = true;
        self.reset_on_wrong_order = reset;
        self
    }

    pub fn with_required_count(mut self, count: i32) -> Self {
        self.required_count = count;
        self
    }

    pub fn with_stay_seconds(mut self, seconds: f32) -> Self {
        self.required_stay_seconds = seconds;
        self
    }

    pub fn with_item(mut self, item_id: &str) -> Self {
        self.required_item_id = item_id.to_string();
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.required_flags = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn granting_flags(mut self, flags: &[&str]) -> Self {
        self.grant_flags_on_complete = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn granting_item(mut self, item_id: &str, count: i32) -> Self {
        self.grant_items_on_complete.push(ItemReward {
            item_id: item_id.to_string(),
            count,
        });
        self
    }

    /// Normalize parameters in place. Idempotent.
    pub fn validate(&mut self) {
        self.required_hold_seconds = non_negative(self.required_hold_seconds);
        self.required_stay_seconds = non_negative(self.required_stay_seconds);
        self.stay_exit_grace_seconds = non_negative(self.stay_exit_grace_seconds);
        self.time_limit_seconds = non_negative(self.time_limit_seconds);
        if self.consume_amount <= 0 {
            self.consume_amount = 1;
        }
        if self.reset_on_wrong_order {
            self.must_follow_order = true;
        }
        if self.delivery_item_id.is_empty() {
            self.delivery_item_id = self.required_item_id.clone();
        }
    }

    /// The item a Delivery objective accepts, or `None` to accept any item.
    pub fn effective_delivery_item(&self) -> Option<&str> {
        if !self.delivery_item_id.is_empty() {
            Some(&self.delivery_item_id)
        } else if !self.required_item_id.is_empty() {
            Some(&self.required_item_id)
        } else {
            None
        }
    }

    /// Number of done subtasks a HoldOnTargets objective needs.
    pub fn hold_target_count(&self, subtask_count: usize) -> usize {
        let wanted = if self.required_count <= 0 {
            subtask_count
        } else {
            (self.required_count as usize).min(subtask_count)
        };
        wanted.max(1)
    }

    /// Counter target for StayInArea (done areas) and Delivery (deliveries).
    pub fn repeat_target_count(&self) -> u32 {
        self.required_count.max(1) as u32
    }
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Quest definition
// ---------------------------------------------------------------------------

/// A quest: metadata plus an ordered list of objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDef {
    pub id: QuestId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Objectives must complete strictly in list order.
    #[serde(default)]
    pub sequential_objectives: bool,
    #[serde(default)]
    pub objectives: Vec<ObjectiveDef>,
}

impl QuestDef {
    pub fn new(id: u32, title: &str) -> Self {
        Self {
            id: QuestId(id),
            title: title.to_string(),
            description: String::new(),
            sequential_objectives: false,
            objectives: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn sequential(mut self) -> Self {
        self.sequential_objectives = true;
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveDef) -> Self {
        self.objectives.push(objective);
        self
    }

    /// Validate every objective.
    pub fn validate(&mut self) {
        for objective in &mut self.objectives {
            objective.validate();
        }
    }
}
