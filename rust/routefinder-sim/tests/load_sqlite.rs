use rusqlite::{params, Connection, OpenFlags};

use routefinder_core::{ActorId, Direction, GridMap, SystemTag, TileMap};
use routefinder_sim::load::load_map;

fn mem_conn() -> Connection {
    Connection::open_in_memory_with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE).unwrap()
}

fn create_schema(conn: &Connection) {
    conn.execute_batch(
        r#"
        CREATE TABLE tiles (
            x INTEGER, y INTEGER,
            terrain_tag INTEGER,
            system_tag TEXT,
            walkable INTEGER,
            exits TEXT
        );
        CREATE TABLE actors (
            id INTEGER PRIMARY KEY,
            x INTEGER, y INTEGER, z INTEGER,
            surfing INTEGER
        );
        "#,
    )
    .unwrap();
}

/// Inserts every tile of `map` as a row.
fn insert_map(conn: &Connection, map: &GridMap) {
    for y in 0..map.height() {
        for x in 0..map.width() {
            let t = map.tile(x, y).unwrap();
            let system = match t.system {
                SystemTag::None => None,
                SystemTag::Water => Some("water".to_string()),
                SystemTag::Ice => Some("ice".to_string()),
                SystemTag::Rapid(d) => Some(format!("rapid:{}", d.name())),
                SystemTag::Ledge(d) => Some(format!("ledge:{}", d.name())),
                SystemTag::Slope(dy) => Some(format!("slope:{dy}")),
                SystemTag::Bridge(_) | SystemTag::BridgeRamp(_) => unreachable!("no bridges in this fixture"),
            };
            conn.execute(
                "INSERT INTO tiles (x, y, terrain_tag, system_tag, walkable, exits) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![x, y, t.terrain as i64, system, t.walkable as i64, Option::<String>::None],
            )
            .unwrap();
        }
    }
}

#[test]
fn sqlite_and_json_maps_match() {
    let json = r#"{
        "rows": ["..~~.", ".#*>.", ",,J\"."],
        "actors": [{"id": 1, "x": 0, "y": 0}, {"id": 2, "x": 2, "y": 0, "surfing": true}]
    }"#;
    let from_json = GridMap::from_json(json).unwrap();

    let conn = mem_conn();
    create_schema(&conn);
    insert_map(&conn, &from_json);
    conn.execute("INSERT INTO actors (id, x, y, z, surfing) VALUES (1, 0, 0, 0, 0)", []).unwrap();
    conn.execute("INSERT INTO actors (id, x, y, z, surfing) VALUES (2, 2, 0, 0, 1)", []).unwrap();

    let from_sqlite = load_map(&conn).unwrap();
    assert_eq!(from_sqlite, from_json);
}

#[test]
fn missing_tiles_are_walls_and_exits_decode() {
    let conn = mem_conn();
    create_schema(&conn);
    conn.execute_batch(
        r#"
        INSERT INTO tiles VALUES (0, 0, 0, NULL, 1, 'south');
        INSERT INTO tiles VALUES (1, 0, 0, NULL, 1, NULL);
        INSERT INTO tiles VALUES (2, 1, 6, 'ice', 1, NULL);
        INSERT INTO actors VALUES (5, 1, 0, 0, 0);
        "#,
    )
    .unwrap();

    let map = load_map(&conn).unwrap();
    assert_eq!((map.width(), map.height()), (3, 2));
    assert!(!map.walkable(0, 1));
    assert!(map.walkable(2, 1));
    assert_eq!(map.system_tag(2, 1), SystemTag::Ice);
    assert!(!map.passable(0, 0, Direction::East));
    assert!(map.passable(1, 0, Direction::West));
    assert!(map.actor(ActorId(5)).is_some());
}

#[test]
fn bad_rows_are_reported() {
    let conn = mem_conn();
    create_schema(&conn);
    assert!(load_map(&conn).is_err());

    conn.execute_batch("INSERT INTO tiles VALUES (0, 0, 0, 'lava', 1, NULL);").unwrap();
    let err = load_map(&conn).unwrap_err();
    assert!(format!("{err:#}").contains("lava"));
}
