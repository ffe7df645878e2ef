//! Cross-crate tests: data files -> catalog -> bus-driven session -> save
//! file -> resumed session.

use proptest::prelude::*;
use questline_core::event::{EventBus, InteractionKind, Position, WorldEvent};
use questline_core::flags::{FlagSet, FlagSource, NoFlags};
use questline_core::id::QuestId;
use questline_core::manager::{ProgressEvent, QuestManager};
use questline_core::test_utils::*;
use questline_data::{GameData, SaveFormat, load_game_data};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

// ===========================================================================
// Fixtures
// ===========================================================================

const QUESTS_RON: &str = r#"[
    (
        id: 1001,
        title: "Open the boxes",
        objectives: [
            (
                display_name: "Open boxes",
                type: InteractSet,
                target_ids: ["Box_A", "Box_B", "Box_C"],
                grant_flags_on_complete: ["boxes_opened"],
            ),
        ],
    ),
    (
        id: 1002,
        title: "After the boxes",
        sequential_objectives: true,
        objectives: [
            (display_name: "Boxes opened", type: TriggerFlags, required_flags: ["boxes_opened"]),
            (display_name: "Rest", type: StayInArea, target_ids: ["Camp"], required_stay_seconds: 3.0),
        ],
    ),
]"#;

const SIDE_QUESTS_TOML: &str = r#"
[[quests]]
id = 2001
title = "Apples"

[[quests.objectives]]
display_name = "Bring apples"
type = "Delivery"
required_item_id = "apple"
target_ids = ["Farmer"]
required_count = 2

[[quests.objectives.grant_items_on_complete]]
item_id = "coin"
count = 3
"#;

const CONFIG_TOML: &str = r#"
autostart = [1001, 1002, 2001]
catalog_files = ["side_quests.toml"]

[save]
format = "Binary"
path = "saves/slot1.bin"
"#;

fn make_data_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "questline_e2e_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("quests.ron"), QUESTS_RON).unwrap();
    fs::write(dir.join("side_quests.toml"), SIDE_QUESTS_TOML).unwrap();
    fs::write(dir.join("questline.toml"), CONFIG_TOML).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

/// A bus-driven session that feeds granted flags back into the world.
struct Session {
    bus: EventBus,
    manager: Rc<RefCell<QuestManager>>,
    flags: Rc<RefCell<FlagSet>>,
}

impl Session {
    fn start(data: &GameData) -> Self {
        let flags = Rc::new(RefCell::new(FlagSet::new()));
        let manager = Rc::new(RefCell::new(data.build_manager(&*flags)));
        let mut bus = EventBus::new();
        QuestManager::attach(&manager, &mut bus, flags.clone());
        Self { bus, manager, flags }
    }

    /// Apply granted flags from drained progress events.
    fn apply_rewards(&mut self) -> Vec<(String, i32)> {
        let events = self.manager.borrow_mut().drain_events();
        let mut items = Vec::new();
        for event in events {
            if let ProgressEvent::ObjectiveCompleted {
                grant_flags,
                grant_items,
                ..
            } = event
            {
                for flag in grant_flags {
                    self.flags.borrow_mut().raise(&flag);
                    self.bus.publish_flag_raised(&flag);
                }
                items.extend(grant_items.into_iter().map(|r| (r.item_id, r.count)));
            }
        }
        items
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn data_directory_builds_a_session() {
    let dir = make_data_dir("build");
    let data = load_game_data(&dir).unwrap();
    assert_eq!(data.catalog.len(), 3);
    assert_eq!(data.config.save.format, SaveFormat::Binary);

    let session = Session::start(&data);
    let active: Vec<QuestId> = session.manager.borrow().active_quests().collect();
    assert_eq!(active, vec![QuestId(1001), QuestId(1002), QuestId(2001)]);

    cleanup(&dir);
}

#[test]
fn rewards_unlock_follow_up_objectives() {
    let dir = make_data_dir("rewards");
    let data = load_game_data(&dir).unwrap();
    let mut s = Session::start(&data);

    // Camp time before the flag gate opens does not count.
    s.bus.publish_area_stay_tick("Camp", 5.0, Position::ORIGIN);

    for id in ["Box_A", "Box_B", "Box_C"] {
        s.bus.publish_interact(id, Position::ORIGIN, InteractionKind::Press);
    }
    s.apply_rewards();
    assert!(s.flags.borrow().is_raised("boxes_opened"));
    {
        let mgr = s.manager.borrow();
        let quest = mgr.snapshot(QuestId(1002)).unwrap();
        assert!(quest.objectives()[0].completed);
        assert!(!quest.objectives()[1].completed);
    }

    s.bus.publish_area_stay_tick("Camp", 3.0, Position::ORIGIN);
    assert!(s.manager.borrow().is_completed(QuestId(1002)));

    for _ in 0..2 {
        s.bus.publish_delivery("apple", "Farmer", Position::ORIGIN);
    }
    assert_eq!(s.apply_rewards(), vec![("coin".to_string(), 3)]);
    assert!(s.manager.borrow().is_completed(QuestId(2001)));

    cleanup(&dir);
}

#[test]
fn save_file_resumes_session() {
    let dir = make_data_dir("resume");
    let data = load_game_data(&dir).unwrap();

    let mut s = Session::start(&data);
    s.bus.publish_interact("Box_B", Position::ORIGIN, InteractionKind::Press);
    s.bus.publish_delivery("apple", "Farmer", Position::ORIGIN);
    data.save(&s.manager.borrow()).unwrap();
    assert!(dir.join("saves/slot1.bin").exists());

    let resumed = Session::start(&data);
    let report = data
        .load(&mut resumed.manager.borrow_mut(), &*resumed.flags)
        .unwrap();
    assert_eq!(report.restored, 3);
    assert_eq!(resumed.manager.borrow().views(), s.manager.borrow().views());

    cleanup(&dir);
}

#[test]
fn catalog_edit_between_sessions_is_reconciled() {
    let dir = make_data_dir("drift");
    let data = load_game_data(&dir).unwrap();

    let mut s = Session::start(&data);
    s.bus.publish_interact("Box_A", Position::ORIGIN, InteractionKind::Press);
    s.bus.publish_interact("Box_C", Position::ORIGIN, InteractionKind::Press);
    data.save(&s.manager.borrow()).unwrap();

    // Box_C removed, Box_D added and list reordered.
    let edited = QUESTS_RON.replace(
        r#"["Box_A", "Box_B", "Box_C"]"#,
        r#"["Box_D", "Box_B", "Box_A"]"#,
    );
    fs::write(dir.join("quests.ron"), edited).unwrap();
    let data = load_game_data(&dir).unwrap();

    let resumed = Session::start(&data);
    let report = data
        .load(&mut resumed.manager.borrow_mut(), &NoFlags)
        .unwrap();
    assert_eq!(report.subtasks_dropped, 1);

    let mgr = resumed.manager.borrow();
    let subs = &mgr.snapshot(QuestId(1001)).unwrap().objectives()[0].subtasks;
    let done: Vec<(&str, bool)> = subs.iter().map(|s| (s.target_id.as_str(), s.done)).collect();
    assert_eq!(done, vec![("Box_D", false), ("Box_B", false), ("Box_A", true)]);

    cleanup(&dir);
}

// ===========================================================================
// Properties
// ===========================================================================

fn arb_event() -> impl Strategy<Value = WorldEvent> {
    let id = proptest::sample::select(&["Box_A", "Box_B", "Box_C", "Camp", "Farmer", "Lever_1"][..]);
    prop_oneof![
        id.clone().prop_map(press),
        (id.clone(), 0.0f32..2.0).prop_map(|(area, dt)| stay(area, dt)),
        id.prop_map(|receiver| deliver("apple", receiver)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Saving to disk and loading into a fresh session reproduces every view,
    /// in both save formats.
    #[test]
    fn file_round_trip(events in proptest::collection::vec(arb_event(), 0..30), binary in any::<bool>()) {
        let dir = make_data_dir(&format!("prop_{binary}"));
        let mut data = load_game_data(&dir).unwrap();
        data.config.save.format = if binary { SaveFormat::Binary } else { SaveFormat::Json };

        let mut s = Session::start(&data);
        for event in events {
            s.bus.publish(event);
            s.apply_rewards();
        }
        data.save(&s.manager.borrow()).unwrap();

        let resumed = Session::start(&data);
        *resumed.flags.borrow_mut() = s.flags.borrow().clone();
        data.load(&mut resumed.manager.borrow_mut(), &*resumed.flags).unwrap();
        prop_assert_eq!(resumed.manager.borrow().views(), s.manager.borrow().views());

        cleanup(&dir);
    }
}
