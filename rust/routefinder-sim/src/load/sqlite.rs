use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::debug;

use routefinder_core::models::{decode_direction_mask, ALL_DIRECTIONS};
use routefinder_core::grid::Tile;
use routefinder_core::{ActorId, GridMap, MotionState, SystemTag};

#[derive(Debug, Clone)]
pub struct TileRow {
    pub x: i32,
    pub y: i32,
    pub terrain_tag: u8,
    pub system_tag: Option<String>,
    pub walkable: bool,
    pub exits: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ActorRow {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub surfing: bool,
}

pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI)?;
    // Best-effort pragmas; ignore failures
    let _ = conn.execute_batch(
        r#"
        PRAGMA query_only=ON;
        PRAGMA journal_mode=OFF;
        "#,
    );
    Ok(conn)
}

pub fn load_tiles(conn: &Connection) -> Result<Vec<TileRow>> {
    let mut stmt = conn.prepare("SELECT x, y, terrain_tag, system_tag, walkable, exits FROM tiles ORDER BY y, x")?;
    let rows = stmt.query_map([], |row: &Row| {
        let terrain: i64 = row.get(2)?;
        let walkable: i64 = row.get(4)?;
        Ok(TileRow {
            x: row.get(0)?,
            y: row.get(1)?,
            terrain_tag: terrain.clamp(0, u8::MAX as i64) as u8,
            system_tag: row.get(3)?,
            walkable: walkable != 0,
            exits: row.get(5)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_actors(conn: &Connection) -> Result<Vec<ActorRow>> {
    let mut stmt = conn.prepare("SELECT id, x, y, z, surfing FROM actors ORDER BY id")?;
    let rows = stmt.query_map([], |row: &Row| {
        let surfing: i64 = row.get(4)?;
        Ok(ActorRow { id: row.get(0)?, x: row.get(1)?, y: row.get(2)?, z: row.get(3)?, surfing: surfing != 0 })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Builds a map from the `tiles` and `actors` tables. Tiles missing from the
/// table are walls.
pub fn load_map(conn: &Connection) -> Result<GridMap> {
    let tiles = load_tiles(conn).context("failed to load tiles")?;
    if tiles.is_empty() {
        bail!("no tiles found in DB");
    }
    if let Some(t) = tiles.iter().find(|t| t.x < 0 || t.y < 0) {
        bail!("negative tile coordinate ({}, {})", t.x, t.y);
    }
    let width = tiles.iter().map(|t| t.x).max().unwrap_or(0) + 1;
    let height = tiles.iter().map(|t| t.y).max().unwrap_or(0) + 1;

    let mut map = GridMap::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            map.set_tile(x, y, Tile::wall())?;
        }
    }
    for t in &tiles {
        let system = match t.system_tag.as_deref() {
            Some(s) => {
                let parsed = s.parse::<SystemTag>().map_err(anyhow::Error::msg);
                parsed.with_context(|| format!("tile ({}, {})", t.x, t.y))?
            }
            None => SystemTag::None,
        };
        let exits = match t.exits.as_deref() {
            Some(s) => decode_direction_mask(Some(s)),
            None => ALL_DIRECTIONS,
        };
        map.set_tile(t.x, t.y, Tile { terrain: t.terrain_tag, system, walkable: t.walkable, exits })?;
    }

    let actors = load_actors(conn).context("failed to load actors")?;
    for a in &actors {
        if !(0..width).contains(&a.x) || !(0..height).contains(&a.y) {
            bail!("actor {} is outside the map at ({}, {})", a.id, a.x, a.y);
        }
        let motion = MotionState { surfing: a.surfing, ..MotionState::at(a.x, a.y, a.z) };
        map.add_actor(ActorId(a.id), motion);
    }
    debug!(width, height, tiles = tiles.len(), actors = actors.len(), "map loaded from sqlite");
    Ok(map)
}
