use std::fs;

use routefinder_core::{ActorHost, ActorId, GridMap, Outcome, SchedulerRecord};
use routefinder_sim::load::load_map_json;
use routefinder_sim::{run, Scenario};

const MAP: &str = r#"{
    "rows": [
        "..........",
        ".####.###.",
        ".#,,,,,,#.",
        ".#,####,#.",
        "...~~~~...",
        "::::::::::"
    ],
    "actors": [
        {"id": 1, "x": 0, "y": 0},
        {"id": 2, "x": 9, "y": 5},
        {"id": 3, "x": 4, "y": 4, "surfing": true}
    ]
}"#;

const SCENARIO: &str = r#"{
    "options": {"operation_budget": 40, "request_cap": 15, "retry_delay_frames": 5},
    "profiles": [{"name": "townsfolk", "default_cost": 3, "costs": {"7": 1}}],
    "requests": [
        {"actor": 1, "target": {"kind": "coords", "x": 5, "y": 2}, "tries": 3, "profile": "wild"},
        {"actor": 2, "target": {"kind": "border", "side": "west"}, "profile": "townsfolk"},
        {"actor": 3, "target": {"kind": "coords", "x": 9, "y": 9}, "tries": 1}
    ]
}"#;

fn setup() -> (GridMap, Scenario) {
    let map = GridMap::from_json(MAP).unwrap();
    let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
    (map, scenario)
}

#[test]
fn scenario_runs_to_completion() {
    let (mut map, scenario) = setup();
    let mut scheduler = scenario.scheduler().unwrap();
    // Out-of-bounds coords are rejected up front.
    assert!(scenario.schedule(&mut scheduler, &map).is_err());

    let mut scenario = scenario;
    scenario.requests.pop();
    let mut scheduler = scenario.scheduler().unwrap();
    scenario.schedule(&mut scheduler, &map).unwrap();

    let summary = run(&mut scheduler, &mut map, 300);
    assert!(summary.pending.is_empty());
    assert!(summary.finished.contains(&(ActorId(1), Outcome::Reached)));
    assert!(summary.finished.contains(&(ActorId(2), Outcome::Reached)));
    assert!(summary.expansions > 0);
    assert_eq!(map.actor_motion(ActorId(2)).map(|m| m.x), Some(0));
    let hero = map.actor_motion(ActorId(1)).unwrap();
    assert_eq!((hero.x, hero.y), (5, 2));
}

#[test]
fn saved_state_resumes_from_file() {
    let (mut map, mut scenario) = setup();
    scenario.requests.pop();
    let mut scheduler = scenario.scheduler().unwrap();
    scenario.schedule(&mut scheduler, &map).unwrap();
    let first = run(&mut scheduler, &mut map, 2);
    assert_eq!(first.ticks, 2);
    assert_eq!(first.pending.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    fs::write(&state, serde_json::to_string(&scheduler.save()).unwrap()).unwrap();

    let record: SchedulerRecord = serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    let mut resumed = scenario.scheduler().unwrap();
    resumed.load(&record).unwrap();
    let mut map_copy = map.clone();

    let a = run(&mut scheduler, &mut map, 300);
    let b = run(&mut resumed, &mut map_copy, 300);
    assert_eq!(a, b);
    assert_eq!(map, map_copy);
}

#[test]
fn map_file_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.json");
    fs::write(&path, MAP).unwrap();
    let map = load_map_json(&path).unwrap();
    assert_eq!(map, GridMap::from_json(MAP).unwrap());
    assert!(load_map_json(&dir.path().join("missing.json")).is_err());
}
