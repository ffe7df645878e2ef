//! Questline Core -- an event-driven quest progression engine.
//!
//! Game systems publish world events (interactions, area presence ticks,
//! item deliveries, raised flags) on an [`event::EventBus`]. A
//! [`manager::QuestManager`] subscribed to the bus advances the objectives of
//! every started quest, decides when quests complete, and reports what
//! changed. Progress can be saved and restored against a catalog that has
//! drifted since the save.
//!
//! # Dispatch
//!
//! Each published event runs synchronously on the caller's stack:
//!
//! 1. **Route** -- The bus calls every listener of the event's kind.
//! 2. **Advance** -- The manager offers the event to each active quest.
//!    Sequential quests only offer it to their first incomplete objective.
//! 3. **Evaluate** -- Changed quests re-derive completion from their
//!    mandatory objectives.
//! 4. **Notify** -- Quest-changed listeners run once per changed quest;
//!    the commands they return are applied afterwards.
//!
//! ```rust,ignore
//! let manager = Rc::new(RefCell::new(QuestManager::new(catalog)));
//! let flags: Rc<dyn FlagSource> = Rc::new(RefCell::new(FlagSet::new()));
//! let mut bus = EventBus::new();
//! QuestManager::attach(&manager, &mut bus, flags.clone());
//! manager.borrow_mut().start_quest(QuestId(1001), &*flags);
//! bus.publish_interact("Box_A", Position::ORIGIN, InteractionKind::Press);
//! ```
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable quest definitions (frozen at startup).
//! - [`state::QuestState`] -- Runtime progress of one quest.
//! - [`progress`] -- Per-objective-type progression rules.
//! - [`manager::QuestManager`] -- Registry, dispatcher and notifier.
//! - [`query::QuestView`] -- Owned, serializable progress snapshots.
//! - [`serialize`] -- Versioned save/restore via JSON or bitcode.
//! - [`time::Seconds`] -- Q32.32 fixed-point seconds for stay accumulation.

pub mod catalog;
pub mod definition;
pub mod event;
pub mod flags;
pub mod id;
pub mod manager;
pub mod progress;
pub mod query;
pub mod serialize;
pub mod state;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
