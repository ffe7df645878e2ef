//! Typed, synchronous world-event bus.
//!
//! Producers (interaction scanner, area triggers, delivery handlers, flag
//! sources) publish [`WorldEvent`]s; listeners subscribed to the event's
//! [`EventKind`] run immediately, in subscription order, on the caller's
//! stack. There is no buffering and no cross-thread delivery.
//!
//! # Subscriptions
//!
//! [`EventBus::subscribe`] returns a [`Subscription`] handle. Handles are
//! generation-checked slot keys: unsubscribing twice, or with a handle whose
//! slot was reused, is a harmless no-op.

use crate::id::{Fingerprint, SubscriptionKey};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// World-space position attached to an event. The engine carries it through
/// but never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// How an interaction was performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    #[default]
    Press,
    Hold,
    UseItem,
    EnterArea,
}

/// Payload of an Interact event.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub position: Position,
    pub kind: InteractionKind,
}

/// Payload of an AreaStayTick event.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStay {
    pub area_id: String,
    pub fingerprint: Fingerprint,
    pub delta_seconds: f32,
    pub position: Position,
}

/// Payload of a Delivery event.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryDrop {
    pub item_id: String,
    pub receiver_id: String,
    pub receiver_fingerprint: Fingerprint,
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An event raised by the world. Constructors precompute fingerprints.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Interact(Interaction),
    AreaStayTick(AreaStay),
    Delivery(DeliveryDrop),
    FlagRaised { flag_id: String },
}

/// Discriminant tag for world events, used to route subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Interact,
    AreaStayTick,
    Delivery,
    FlagRaised,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 4;

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::Interact,
        EventKind::AreaStayTick,
        EventKind::Delivery,
        EventKind::FlagRaised,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl WorldEvent {
    pub fn interact(id: &str, position: Position, kind: InteractionKind) -> Self {
        WorldEvent::Interact(Interaction {
            id: id.to_string(),
            fingerprint: Fingerprint::of(id),
            position,
            kind,
        })
    }

    pub fn area_stay_tick(area_id: &str, delta_seconds: f32, position: Position) -> Self {
        WorldEvent::AreaStayTick(AreaStay {
            area_id: area_id.to_string(),
            fingerprint: Fingerprint::of(area_id),
            delta_seconds,
            position,
        })
    }

    pub fn delivery(item_id: &str, receiver_id: &str, position: Position) -> Self {
        WorldEvent::Delivery(DeliveryDrop {
            item_id: item_id.to_string(),
            receiver_id: receiver_id.to_string(),
            receiver_fingerprint: Fingerprint::of(receiver_id),
            position,
        })
    }

    pub fn flag_raised(flag_id: &str) -> Self {
        WorldEvent::FlagRaised {
            flag_id: flag_id.to_string(),
        }
    }

    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            WorldEvent::Interact(_) => EventKind::Interact,
            WorldEvent::AreaStayTick(_) => EventKind::AreaStayTick,
            WorldEvent::Delivery(_) => EventKind::Delivery,
            WorldEvent::FlagRaised { .. } => EventKind::FlagRaised,
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&WorldEvent)>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    key: SubscriptionKey,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The world-event bus. One listener table per event kind, plus an
/// insertion-ordered key list so delivery order is stable across removals.
pub struct EventBus {
    listeners: SlotMap<SubscriptionKey, Listener>,
    order: [Vec<SubscriptionKey>; EVENT_KIND_COUNT],
    published: [u64; EVENT_KIND_COUNT],
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("order", &self.order)
            .field("published", &self.published)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
            order: Default::default(),
            published: [0; EVENT_KIND_COUNT],
        }
    }

    /// Register a listener for one event kind. Listeners run in
    /// registration order.
    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> Subscription {
        let key = self.listeners.insert(listener);
        self.order[kind.index()].push(key);
        Subscription { kind, key }
    }

    /// Remove a listener. Returns `false` if the handle is stale.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        if self.listeners.remove(subscription.key).is_none() {
            return false;
        }
        self.order[subscription.kind.index()].retain(|&k| k != subscription.key);
        true
    }

    /// Number of live listeners for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.order[kind.index()].len()
    }

    /// Total events ever published for a kind.
    pub fn published_count(&self, kind: EventKind) -> u64 {
        self.published[kind.index()]
    }

    /// Deliver an event to every listener of its kind, synchronously.
    pub fn publish(&mut self, event: WorldEvent) {
        let idx = event.kind().index();
        self.published[idx] += 1;
        tracing::trace!(kind = ?event.kind(), listeners = self.order[idx].len(), "publish");

        for &key in &self.order[idx] {
            if let Some(listener) = self.listeners.get_mut(key) {
                listener(&event);
            }
        }
    }

    pub fn publish_interact(&mut self, id: &str, position: Position, kind: InteractionKind) {
        self.publish(WorldEvent::interact(id, position, kind));
    }

    pub fn publish_area_stay_tick(&mut self, area_id: &str, delta_seconds: f32, position: Position) {
        self.publish(WorldEvent::area_stay_tick(area_id, delta_seconds, position));
    }

    pub fn publish_delivery(&mut self, item_id: &str, receiver_id: &str, position: Position) {
        self.publish(WorldEvent::delivery(item_id, receiver_id, position));
    }

    pub fn publish_flag_raised(&mut self, flag_id: &str) {
        self.publish(WorldEvent::flag_raised(flag_id));
    }
}

// ===========================================================================
// Tests
// ===========================================================================
