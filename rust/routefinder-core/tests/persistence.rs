use std::fs;

use routefinder_core::{
    ActorId, EngineOptions, GridMap, MotionState, RequestState, Scheduler, SchedulerRecord, TargetSpec, Tries,
};
use serde_json::json;

fn maze() -> GridMap {
    let mut m = GridMap::from_ascii(&[
        "..........",
        ".######.#.",
        ".#....#.#.",
        ".#.##.#...",
        "...#..###.",
        ".#...#....",
    ])
    .unwrap();
    m.add_actor(ActorId(1), MotionState::at(0, 0, 0));
    m.add_actor(ActorId(2), MotionState::at(9, 5, 0));
    m.add_actor(ActorId(3), MotionState::at(4, 2, 0));
    m
}

fn busy_scheduler(m: &GridMap) -> Scheduler {
    let options = EngineOptions { operation_budget: 12, request_cap: 7, ..EngineOptions::default() };
    let mut s = Scheduler::new(options).unwrap();
    s.add_request(m, ActorId(1), &TargetSpec::Coords { x: 5, y: 3, z: 0, radius: 0 }, Tries::Finite(3), "wild").unwrap();
    s.add_request(m, ActorId(2), &TargetSpec::Character { actor: ActorId(3), radius: 1 }, Tries::Unlimited, "road")
        .unwrap();
    s.add_request(m, ActorId(3), &TargetSpec::Border { side: routefinder_core::Side::West }, Tries::Finite(2), "default")
        .unwrap();
    s
}

#[test]
fn save_load_round_trip_continues_identically() {
    let mut world = maze();
    let mut original = busy_scheduler(&world);
    for _ in 0..3 {
        original.tick(&mut world);
        world.advance();
    }
    assert!(original.actors().any(|a| original.state_of(a) == Some(RequestState::Searching)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    fs::write(&path, serde_json::to_string_pretty(&original.save()).unwrap()).unwrap();
    let record: SchedulerRecord = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(record, original.save());

    let mut restored = Scheduler::new(original.options().clone()).unwrap();
    restored.load(&record).unwrap();
    assert_eq!(restored.save(), original.save());

    let mut world_copy = world.clone();
    for _ in 0..60 {
        let a = original.tick(&mut world);
        let b = restored.tick(&mut world_copy);
        assert_eq!(a, b);
        assert_eq!(original.save(), restored.save());
        world.advance();
        world_copy.advance();
        assert_eq!(world, world_copy);
    }
}

#[test]
fn load_replaces_requests_in_saved_order() {
    let world = maze();
    let source = busy_scheduler(&world);
    let mut target = Scheduler::default();
    target
        .add_request(&world, ActorId(3), &TargetSpec::Coords { x: 0, y: 0, z: 0, radius: 0 }, Tries::Unlimited, "default")
        .unwrap();
    target.load(&source.save()).unwrap();
    assert_eq!(target.actors().collect::<Vec<_>>(), vec![ActorId(1), ActorId(2), ActorId(3)]);
    assert_eq!(target.tries_of(ActorId(3)), Some(Tries::Finite(2)));
}

#[test]
fn hand_written_record_loads_and_runs() {
    let record: SchedulerRecord = serde_json::from_value(json!({
        "version": 1,
        "requests": [{
            "actor": 1,
            "target": { "kind": "coords", "x": 0, "y": 4, "z": 0, "radius": 0 },
            "profile": "default",
            "tries": { "finite": 2 },
            "state": "searching"
        }]
    }))
    .unwrap();
    let mut world = maze();
    let mut s = Scheduler::default();
    s.load(&record).unwrap();
    s.tick(&mut world);
    assert_eq!(s.state_of(ActorId(1)), Some(RequestState::Watching));
    assert_eq!(s.request(ActorId(1)).unwrap().moves().len(), 4);
}

#[test]
fn corrupt_records_are_rejected_whole() {
    let world = maze();
    let source = busy_scheduler(&world);
    let mut record = source.save();
    record.requests.push(record.requests[0].clone());

    let mut s = Scheduler::default();
    assert!(s.load(&record).is_err());
    assert!(s.is_empty());

    let watching_without_cursor: SchedulerRecord = serde_json::from_value(json!({
        "version": 1,
        "requests": [{
            "actor": 1,
            "target": { "kind": "border", "side": "north", "width": 10, "height": 6 },
            "profile": "default",
            "tries": "unlimited",
            "state": "watching",
            "moves": ["north"]
        }]
    }))
    .unwrap();
    assert!(s.load(&watching_without_cursor).is_err());

    let finished: SchedulerRecord = serde_json::from_value(json!({
        "version": 1,
        "requests": [{
            "actor": 2,
            "target": { "kind": "coords", "x": 1, "y": 1, "z": 0, "radius": 0 },
            "profile": "default",
            "tries": "unlimited",
            "state": { "finished": "no_path" }
        }]
    }))
    .unwrap();
    assert!(s.load(&finished).is_ok());
}

#[test]
fn off_map_states_in_a_record_do_not_break_tick() {
    let record: SchedulerRecord = serde_json::from_value(json!({
        "version": 1,
        "requests": [
            {
                "actor": 1,
                "target": { "kind": "coords", "x": 0, "y": 4, "z": 0, "radius": 0 },
                "profile": "default",
                "tries": { "finite": 2 },
                "state": "searching",
                "search": {
                    "nodes": [{ "motion": { "x": 10, "y": 0, "z": 0 }, "g": 0, "h": 10 }],
                    "frontier": [[10, 0, 0]],
                    "closed": [],
                    "seq": 0,
                    "expansions": 0
                }
            },
            {
                "actor": 2,
                "target": { "kind": "border", "side": "west", "width": 10, "height": 6 },
                "profile": "default",
                "tries": { "finite": 2 },
                "state": "watching",
                "moves": ["west"],
                "watch": {
                    "motion": { "x": 10, "y": 5, "z": 0 },
                    "index": 0,
                    "idle_frames": 0,
                    "last_actor_tile": [10, 5, 0]
                }
            }
        ]
    }))
    .unwrap();
    let mut world = maze();
    let mut s = Scheduler::default();
    s.load(&record).unwrap();
    s.tick(&mut world);

    // The stored node cannot be expanded, so the search runs dry.
    assert_eq!(s.state_of(ActorId(1)), Some(RequestState::Waiting));
    assert_eq!(s.tries_of(ActorId(1)), Some(Tries::Finite(1)));
    // Actor 2 is not where the stored cursor says, and no step explains it.
    assert_eq!(s.state_of(ActorId(2)), Some(RequestState::Reload));
    assert_eq!(s.tries_of(ActorId(2)), Some(Tries::Finite(1)));
}
