//! The quest registry and dispatcher.
//!
//! [`QuestManager`] owns the runtime state of every started quest, routes
//! world events to them, and tells the presentation layer what changed.
//!
//! Three output channels, in the order they fire after a dispatch:
//!
//! 1. The returned list of changed quest ids.
//! 2. Quest-changed listeners registered with
//!    [`QuestManager::on_quest_changed`], called once per changed quest.
//!    They may return [`QuestCommand`]s, applied after every listener ran.
//! 3. Buffered [`ProgressEvent`]s, collected with
//!    [`QuestManager::drain_events`].

use crate::catalog::Catalog;
use crate::definition::ItemReward;
use crate::event::{EventBus, EventKind, Subscription, WorldEvent};
use crate::flags::FlagSource;
use crate::id::{ListenerId, QuestId};
use crate::state::{Advance, QuestState};
use slotmap::SlotMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Commands and progress events
// ---------------------------------------------------------------------------

/// A request a quest-changed listener wants applied once notification ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestCommand {
    /// Start a quest (no-op if unknown or already started).
    Start(QuestId),
}

/// Something that happened to a quest. Rewards travel with the objective
/// that granted them; applying them is game code's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    QuestStarted {
        quest: QuestId,
    },
    ObjectiveCompleted {
        quest: QuestId,
        objective: usize,
        grant_flags: Vec<String>,
        grant_items: Vec<ItemReward>,
    },
    QuestCompleted {
        quest: QuestId,
    },
}

/// Called once per changed quest after a dispatch, start or restore.
pub type QuestListener = Box<dyn FnMut(QuestId, &QuestState) -> Vec<QuestCommand>>;

// ---------------------------------------------------------------------------
// QuestManager
// ---------------------------------------------------------------------------

pub struct QuestManager {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) quests: BTreeMap<QuestId, QuestState>,
    listeners: SlotMap<ListenerId, QuestListener>,
    listener_order: Vec<ListenerId>,
    pub(crate) events: Vec<ProgressEvent>,
}

impl std::fmt::Debug for QuestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestManager")
            .field("catalog", &self.catalog.len())
            .field("quests", &self.quests.keys().collect::<Vec<_>>())
            .field("listeners", &self.listener_order.len())
            .field("events", &self.events)
            .finish()
    }
}

impl QuestManager {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            quests: BTreeMap::new(),
            listeners: SlotMap::with_key(),
            listener_order: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // -- Registry --

    /// Start a quest. Returns `false` if the id is unknown or the quest is
    /// already started.
    ///
    /// Objectives already satisfied by the current flag state complete
    /// immediately, and the quest may complete on the spot.
    pub fn start_quest(&mut self, id: QuestId, flags: &dyn FlagSource) -> bool {
        let Some(definition) = self.catalog.get(id) else {
            tracing::warn!(quest = %id, "cannot start unknown quest");
            return false;
        };

        let quest = self
            .quests
            .entry(id)
            .or_insert_with(|| QuestState::build(Arc::clone(definition)));
        if quest.is_started() {
            return false;
        }

        quest.set_started(true);
        self.events.push(ProgressEvent::QuestStarted { quest: id });
        let outcome = quest.recheck_flags(flags);
        record(&mut self.events, quest, &outcome);
        tracing::debug!(quest = %id, title = %quest.definition().title, "quest started");

        self.notify(&[id], flags);
        true
    }

    /// Read-only borrow of a quest's state. `None` if never started or restored.
    pub fn snapshot(&self, id: QuestId) -> Option<&QuestState> {
        self.quests.get(&id)
    }

    pub fn is_started(&self, id: QuestId) -> bool {
        self.quests.get(&id).is_some_and(QuestState::is_started)
    }

    pub fn is_completed(&self, id: QuestId) -> bool {
        self.quests.get(&id).is_some_and(QuestState::is_completed)
    }

    /// Started, incomplete quests in ascending id order.
    pub fn active_quests(&self) -> impl Iterator<Item = QuestId> + '_ {
        self.quests
            .iter()
            .filter(|(_, q)| q.is_active())
            .map(|(&id, _)| id)
    }

    /// Every quest with runtime state, in ascending id order.
    pub fn quest_ids(&self) -> impl Iterator<Item = QuestId> + '_ {
        self.quests.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    // -- Dispatch --

    /// Offer one world event to every active quest. Returns the ids of the
    /// quests whose state changed, in ascending order.
    pub fn handle(&mut self, event: &WorldEvent, flags: &dyn FlagSource) -> Vec<QuestId> {
        // Snapshot first: listeners may start quests while we notify.
        let ids: Vec<QuestId> = self.active_quests().collect();
        tracing::trace!(kind = ?event.kind(), quests = ids.len(), "dispatch");

        let mut changed = Vec::new();
        for id in ids {
            let Some(quest) = self.quests.get_mut(&id) else {
                continue;
            };
            let outcome = quest.advance(event, flags);
            if outcome.changed || outcome.quest_completed {
                record(&mut self.events, quest, &outcome);
                changed.push(id);
            }
        }

        self.notify(&changed, flags);
        changed
    }

    // -- Listeners --

    /// Register a quest-changed listener. Listeners run in registration order.
    pub fn on_quest_changed(&mut self, listener: QuestListener) -> ListenerId {
        let id = self.listeners.insert(listener);
        self.listener_order.push(id);
        id
    }

    /// Remove a listener. Returns `false` if the id is stale.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(id).is_none() {
            return false;
        }
        self.listener_order.retain(|&l| l != id);
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listener_order.len()
    }

    /// Call every listener for every id, then apply the commands they returned.
    pub(crate) fn notify(&mut self, ids: &[QuestId], flags: &dyn FlagSource) {
        if ids.is_empty() || self.listener_order.is_empty() {
            return;
        }

        let mut commands = Vec::new();
        for id in ids {
            let Some(quest) = self.quests.get(id) else {
                continue;
            };
            for key in &self.listener_order {
                if let Some(listener) = self.listeners.get_mut(*key) {
                    commands.extend(listener(*id, quest));
                }
            }
        }

        for command in commands {
            match command {
                QuestCommand::Start(id) => {
                    self.start_quest(id, flags);
                }
            }
        }
    }

    // -- Event API --

    /// Drain all pending progress events.
    pub fn drain_events(&mut self) -> Vec<ProgressEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get a read-only view of pending progress events.
    pub fn pending_events(&self) -> &[ProgressEvent] {
        &self.events
    }

    // -- Bus wiring --

    /// Subscribe a shared manager to every event kind on `bus`.
    ///
    /// The bus holds a weak reference; dropping the manager silently turns
    /// the subscriptions into no-ops. An event published while the manager is
    /// already borrowed (a listener publishing from inside a dispatch) is
    /// dropped with a warning.
    pub fn attach(
        manager: &Rc<RefCell<QuestManager>>,
        bus: &mut EventBus,
        flags: Rc<dyn FlagSource>,
    ) -> Vec<Subscription> {
        EventKind::ALL
            .iter()
            .map(|&kind| {
                let manager = Rc::downgrade(manager);
                let flags = Rc::clone(&flags);
                bus.subscribe(
                    kind,
                    Box::new(move |event: &WorldEvent| {
                        let Some(manager) = manager.upgrade() else {
                            return;
                        };
                        match manager.try_borrow_mut() {
                            Ok(mut manager) => {
                                manager.handle(event, &*flags);
                            }
                            Err(_) => {
                                tracing::warn!(kind = ?event.kind(), "quest manager busy, event dropped");
                            }
                        }
                    }),
                )
            })
            .collect()
    }

    /// Remove subscriptions returned by [`QuestManager::attach`]. Returns how
    /// many were still live.
    pub fn detach(bus: &mut EventBus, subscriptions: Vec<Subscription>) -> usize {
        subscriptions
            .into_iter()
            .filter(|&sub| bus.unsubscribe(sub))
            .count()
    }
}

/// Push progress events for one quest's outcome.
pub(crate) fn record(events: &mut Vec<ProgressEvent>, quest: &QuestState, outcome: &Advance) {
    let id = quest.id();
    for &index in &outcome.completed_objectives {
        let def = &quest.definition().objectives[index];
        tracing::debug!(quest = %id, objective = index, name = %def.display_name, "objective completed");
        events.push(ProgressEvent::ObjectiveCompleted {
            quest: id,
            objective: index,
            grant_flags: def.grant_flags_on_complete.clone(),
            grant_items: def.grant_items_on_complete.clone(),
        });
    }
    if outcome.quest_completed {
        tracing::debug!(quest = %id, "quest completed");
        events.push(ProgressEvent::QuestCompleted { quest: id });
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ObjectiveDef, ObjectiveType, QuestDef};
    use crate::event::{InteractionKind, Position};
    use crate::flags::{FlagSet, NoFlags};

    fn press(id: &str) -> WorldEvent {
        WorldEvent::interact(id, Position::ORIGIN, InteractionKind::Press)
    }

    fn manager_with(quests: Vec<QuestDef>) -> QuestManager {
        QuestManager::new(Arc::new(Catalog::from_quests(quests).unwrap()))
    }

    fn boxes() -> QuestDef {
        QuestDef::new(1, "Boxes").with_objective(
            ObjectiveDef::new("open", ObjectiveType::InteractSet)
                .with_targets(&["A", "B"])
                .granting_flags(&["boxes_done"])
                .granting_item("coin", 5),
        )
    }

    #[test]
    fn start_unknown_quest_fails() {
        let mut mgr = manager_with(vec![boxes()]);
        assert!(!mgr.start_quest(QuestId(99), &NoFlags));
        assert!(mgr.is_empty());
    }

    #[test]
    fn start_twice_fails() {
        let mut mgr = manager_with(vec![boxes()]);
        assert!(mgr.start_quest(QuestId(1), &NoFlags));
        assert!(!mgr.start_quest(QuestId(1), &NoFlags));
        assert_eq!(mgr.len(), 1);
        assert!(mgr.is_started(QuestId(1)));
    }

    #[test]
    fn events_only_reach_started_quests() {
        let mut mgr = manager_with(vec![boxes()]);
        assert!(mgr.handle(&press("A"), &NoFlags).is_empty());
        assert!(mgr.snapshot(QuestId(1)).is_none());
    }

    #[test]
    fn handle_reports_changed_quests() {
        let other = QuestDef::new(2, "Other").with_objective(
            ObjectiveDef::new("x", ObjectiveType::InteractSet).with_targets(&["X"]),
        );
        let mut mgr = manager_with(vec![boxes(), other]);
        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.start_quest(QuestId(2), &NoFlags);

        assert_eq!(mgr.handle(&press("A"), &NoFlags), vec![QuestId(1)]);
        assert!(mgr.handle(&press("A"), &NoFlags).is_empty());
        assert_eq!(mgr.handle(&press("B"), &NoFlags), vec![QuestId(1)]);
        assert!(mgr.is_completed(QuestId(1)));
        assert_eq!(mgr.active_quests().collect::<Vec<_>>(), vec![QuestId(2)]);
    }

    #[test]
    fn completed_quests_ignore_events() {
        let mut mgr = manager_with(vec![boxes()]);
        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.handle(&press("A"), &NoFlags);
        mgr.handle(&press("B"), &NoFlags);
        assert!(mgr.handle(&press("A"), &NoFlags).is_empty());
    }

    #[test]
    fn progress_events_carry_rewards() {
        let mut mgr = manager_with(vec![boxes()]);
        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.handle(&press("A"), &NoFlags);
        mgr.handle(&press("B"), &NoFlags);

        let events = mgr.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ProgressEvent::QuestStarted { quest: QuestId(1) });
        assert_eq!(
            events[1],
            ProgressEvent::ObjectiveCompleted {
                quest: QuestId(1),
                objective: 0,
                grant_flags: vec!["boxes_done".to_string()],
                grant_items: vec![ItemReward {
                    item_id: "coin".to_string(),
                    count: 5
                }],
            }
        );
        assert_eq!(events[2], ProgressEvent::QuestCompleted { quest: QuestId(1) });
        assert!(mgr.pending_events().is_empty());
    }

    #[test]
    fn start_completes_satisfied_flag_objectives() {
        let quest = QuestDef::new(7, "Flags").with_objective(
            ObjectiveDef::new("door", ObjectiveType::TriggerFlags).with_flags(&["door_open"]),
        );
        let mut mgr = manager_with(vec![quest]);
        let flags: FlagSet = ["door_open"].into_iter().collect();
        assert!(mgr.start_quest(QuestId(7), &flags));
        assert!(mgr.is_completed(QuestId(7)));
    }

    #[test]
    fn flag_raised_rechecks_active_quests() {
        let quest = QuestDef::new(7, "Flags").with_objective(
            ObjectiveDef::new("door", ObjectiveType::TriggerFlags).with_flags(&["door_open"]),
        );
        let mut mgr = manager_with(vec![quest]);
        let mut flags = FlagSet::new();
        mgr.start_quest(QuestId(7), &flags);
        assert!(!mgr.is_completed(QuestId(7)));

        flags.raise("door_open");
        let changed = mgr.handle(&WorldEvent::flag_raised("door_open"), &flags);
        assert_eq!(changed, vec![QuestId(7)]);
        assert!(mgr.is_completed(QuestId(7)));
    }

    #[test]
    fn listeners_see_changes_in_order() {
        let mut mgr = manager_with(vec![boxes()]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..2 {
            let seen = seen.clone();
            mgr.on_quest_changed(Box::new(move |id: QuestId, quest: &QuestState| {
                seen.borrow_mut().push((tag, id, quest.is_completed()));
                Vec::new()
            }));
        }

        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.handle(&press("A"), &NoFlags);
        mgr.handle(&press("B"), &NoFlags);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (0, QuestId(1), false));
        assert_eq!(seen[1], (1, QuestId(1), false));
        assert_eq!(seen[5], (1, QuestId(1), true));
    }

    #[test]
    fn listener_can_chain_follow_up_quest() {
        let follow_up = QuestDef::new(2, "Next").with_objective(
            ObjectiveDef::new("x", ObjectiveType::InteractSet).with_targets(&["X"]),
        );
        let mut mgr = manager_with(vec![boxes(), follow_up]);
        mgr.on_quest_changed(Box::new(|id: QuestId, quest: &QuestState| {
            if id == QuestId(1) && quest.is_completed() {
                vec![QuestCommand::Start(QuestId(2))]
            } else {
                Vec::new()
            }
        }));

        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.handle(&press("A"), &NoFlags);
        assert!(!mgr.is_started(QuestId(2)));
        mgr.handle(&press("B"), &NoFlags);
        assert!(mgr.is_started(QuestId(2)));
    }

    fn chained_on_shared_target() -> QuestManager {
        let follow_up = QuestDef::new(2, "Again").with_objective(
            ObjectiveDef::new("again", ObjectiveType::InteractSet).with_targets(&["B", "C"]),
        );
        let mut mgr = manager_with(vec![boxes(), follow_up]);
        mgr.on_quest_changed(Box::new(|id: QuestId, quest: &QuestState| {
            if id == QuestId(1) && quest.is_completed() {
                vec![QuestCommand::Start(QuestId(2))]
            } else {
                Vec::new()
            }
        }));
        mgr.start_quest(QuestId(1), &NoFlags);
        mgr.handle(&press("A"), &NoFlags);
        mgr
    }

    #[test]
    fn quest_started_mid_dispatch_misses_that_event() {
        let mut mgr = chained_on_shared_target();
        let changed = mgr.handle(&press("B"), &NoFlags);
        assert_eq!(changed, vec![QuestId(1)]);
        assert!(mgr.is_started(QuestId(2)));
        let again = mgr.snapshot(QuestId(2)).unwrap();
        assert!(again.objectives()[0].subtasks.iter().all(|sub| !sub.done));

        mgr.handle(&press("B"), &NoFlags);
        assert!(mgr.snapshot(QuestId(2)).unwrap().objectives()[0].subtasks[0].done);
    }

    #[test]
    fn quest_started_mid_bus_dispatch_misses_that_event() {
        let mgr = Rc::new(RefCell::new(chained_on_shared_target()));
        let flags: Rc<dyn FlagSource> = Rc::new(NoFlags);
        let mut bus = EventBus::new();
        QuestManager::attach(&mgr, &mut bus, flags);

        bus.publish_interact("B", Position::ORIGIN, InteractionKind::Press);
        let mgr = mgr.borrow();
        assert!(mgr.is_completed(QuestId(1)));
        assert!(mgr.is_started(QuestId(2)));
        assert!(!mgr.snapshot(QuestId(2)).unwrap().objectives()[0].subtasks[0].done);
    }

    #[test]
    fn removed_listener_is_silent() {
        let mut mgr = manager_with(vec![boxes()]);
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let id = mgr.on_quest_changed(Box::new(move |_: QuestId, _: &QuestState| {
            *c.borrow_mut() += 1;
            Vec::new()
        }));
        assert!(mgr.remove_listener(id));
        assert!(!mgr.remove_listener(id));
        mgr.start_quest(QuestId(1), &NoFlags);
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(mgr.listener_count(), 0);
    }

    #[test]
    fn attached_manager_receives_bus_events() {
        let mgr = Rc::new(RefCell::new(manager_with(vec![boxes()])));
        let flags: Rc<dyn FlagSource> = Rc::new(NoFlags);
        mgr.borrow_mut().start_quest(QuestId(1), &*flags);

        let mut bus = EventBus::new();
        let subs = QuestManager::attach(&mgr, &mut bus, flags);
        assert_eq!(subs.len(), 4);

        bus.publish_interact("A", Position::ORIGIN, InteractionKind::Press);
        bus.publish_interact("B", Position::ORIGIN, InteractionKind::Press);
        assert!(mgr.borrow().is_completed(QuestId(1)));

        assert_eq!(QuestManager::detach(&mut bus, subs), 4);
        assert_eq!(bus.subscriber_count(EventKind::Interact), 0);
    }

    #[test]
    fn attached_manager_reads_shared_flags() {
        let quest = QuestDef::new(7, "Flags").with_objective(
            ObjectiveDef::new("door", ObjectiveType::TriggerFlags).with_flags(&["door_open"]),
        );
        let mgr = Rc::new(RefCell::new(manager_with(vec![quest])));
        let flags = Rc::new(RefCell::new(FlagSet::new()));
        mgr.borrow_mut().start_quest(QuestId(7), &*flags);

        let mut bus = EventBus::new();
        QuestManager::attach(&mgr, &mut bus, flags.clone());

        flags.borrow_mut().raise("door_open");
        bus.publish_flag_raised("door_open");
        assert!(mgr.borrow().is_completed(QuestId(7)));
    }

    #[test]
    fn busy_manager_drops_event() {
        let mgr = Rc::new(RefCell::new(manager_with(vec![boxes()])));
        mgr.borrow_mut().start_quest(QuestId(1), &NoFlags);
        let mut bus = EventBus::new();
        QuestManager::attach(&mgr, &mut bus, Rc::new(NoFlags));

        let guard = mgr.borrow_mut();
        bus.publish_interact("A", Position::ORIGIN, InteractionKind::Press);
        drop(guard);

        let mgr = mgr.borrow();
        assert!(!mgr.snapshot(QuestId(1)).unwrap().objectives()[0].subtasks[0].done);
    }
}
