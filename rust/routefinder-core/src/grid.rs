//! In-memory reference world: a rectangular tile grid with actors that walk
//! their assigned moves one step per frame.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::models::{decode_direction_mask, terrain, ActorId, Axis, Direction, MotionState, SystemTag, TerrainTag, ALL_DIRECTIONS};
use crate::movement::Mover;
use crate::world::{ActorHost, TileMap};

/// Frames an actor may fail to step before it reports itself stuck.
pub const DEFAULT_STUCK_AFTER: u32 = 30;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub terrain: TerrainTag,
    pub system: SystemTag,
    pub walkable: bool,
    /// Directions an actor may leave this tile in.
    pub exits: u8,
}

impl Default for Tile {
    fn default() -> Self {
        Self { terrain: terrain::PLAIN, system: SystemTag::None, walkable: true, exits: ALL_DIRECTIONS }
    }
}

impl Tile {
    pub fn new(terrain: TerrainTag, system: SystemTag) -> Self {
        Self { terrain, system, ..Self::default() }
    }

    pub fn wall() -> Self {
        Self { walkable: false, ..Self::default() }
    }

    /// ASCII legend used by [`GridMap::from_ascii`] and map files.
    pub fn from_glyph(c: char) -> Option<Self> {
        let tile = match c {
            '.' => Tile::default(),
            '#' => Tile::wall(),
            ',' => Tile::new(terrain::GRASS, SystemTag::None),
            '"' => Tile::new(terrain::TALL_GRASS, SystemTag::None),
            ';' => Tile::new(terrain::SAND, SystemTag::None),
            '%' => Tile::new(terrain::DEEP_SAND, SystemTag::None),
            ':' => Tile::new(terrain::ROAD, SystemTag::None),
            '~' => Tile::new(terrain::WATER, SystemTag::Water),
            '*' => Tile::new(terrain::ICE, SystemTag::Ice),
            '^' => Tile::new(terrain::PLAIN, SystemTag::Rapid(Direction::North)),
            '>' => Tile::new(terrain::PLAIN, SystemTag::Rapid(Direction::East)),
            'v' => Tile::new(terrain::PLAIN, SystemTag::Rapid(Direction::South)),
            '<' => Tile::new(terrain::PLAIN, SystemTag::Rapid(Direction::West)),
            'J' => Tile::new(terrain::PLAIN, SystemTag::Ledge(Direction::South)),
            '/' => Tile::new(terrain::PLAIN, SystemTag::Slope(-1)),
            '\\' => Tile::new(terrain::PLAIN, SystemTag::Slope(1)),
            '=' => Tile::new(terrain::PLAIN, SystemTag::Bridge(Axis::Horizontal)),
            'H' => Tile::new(terrain::PLAIN, SystemTag::Bridge(Axis::Vertical)),
            '+' => Tile::new(terrain::PLAIN, SystemTag::BridgeRamp(Axis::Horizontal)),
            '!' => Tile::new(terrain::PLAIN, SystemTag::BridgeRamp(Axis::Vertical)),
            _ => return None,
        };
        Some(tile)
    }
}

/// Actor living in a [`GridMap`]. Walks its queued moves through the same
/// [`Mover`] rules the search uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridActor {
    id: [ActorId; 1],
    motion: MotionState,
    path: VecDeque<Direction>,
    blocked_frames: u32,
    failed: bool,
}

impl GridActor {
    pub fn new(id: ActorId, motion: MotionState) -> Self {
        Self { id: [id], motion, path: VecDeque::new(), blocked_frames: 0, failed: false }
    }

    pub fn id(&self) -> ActorId {
        self.id[0]
    }

    /// Moves still waiting to be walked.
    pub fn queued(&self) -> usize {
        self.path.len()
    }

    pub fn blocked_frames(&self) -> u32 {
        self.blocked_frames
    }

    /// Whether the last request for this actor gave up.
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Mover for GridActor {
    fn motion(&self) -> MotionState {
        self.motion
    }

    fn set_motion(&mut self, motion: MotionState) {
        self.motion = motion;
    }

    fn ignored(&self) -> &[ActorId] {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMap {
    width: i32,
    height: i32,
    walkable: BitVec,
    terrain: Vec<TerrainTag>,
    system: Vec<SystemTag>,
    exits: Vec<u8>,
    events: BTreeSet<(i32, i32, i32)>,
    actors: BTreeMap<ActorId, GridActor>,
    stuck_after: u32,
}

impl GridMap {
    /// All-plain map.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(RouteError::InvalidMap(format!("dimensions {width}x{height}")));
        }
        let n = (width * height) as usize;
        Ok(Self {
            width,
            height,
            walkable: bitvec![1; n],
            terrain: vec![terrain::PLAIN; n],
            system: vec![SystemTag::None; n],
            exits: vec![ALL_DIRECTIONS; n],
            events: BTreeSet::new(),
            actors: BTreeMap::new(),
            stuck_after: DEFAULT_STUCK_AFTER,
        })
    }

    /// Builds a map from equal-width rows of [`Tile::from_glyph`] characters.
    /// Row 0 is the northern edge.
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count()) as i32;
        let mut map = Self::new(width, height)?;
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() as i32 != width {
                return Err(RouteError::InvalidMap(format!("row {y} is not {width} tiles wide")));
            }
            for (x, c) in row.chars().enumerate() {
                let tile = Tile::from_glyph(c)
                    .ok_or_else(|| RouteError::InvalidMap(format!("unknown glyph '{c}' at ({x}, {y})")))?;
                map.set_tile(x as i32, y as i32, tile)?;
            }
        }
        Ok(map)
    }

    pub fn from_map_file(file: &MapFile) -> Result<Self> {
        let mut map = Self::from_ascii(&file.rows[..])?;
        for rule in &file.exits {
            map.set_exits(rule.x, rule.y, decode_direction_mask(Some(&rule.allow)))?;
        }
        for &[x, y, z] in &file.events {
            map.add_event(x, y, z)?;
        }
        for spawn in &file.actors {
            map.spawn(spawn)?;
        }
        if let Some(n) = file.stuck_after {
            map.set_stuck_after(n);
        }
        Ok(map)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: MapFile = serde_json::from_str(json).map_err(|e| RouteError::InvalidMap(e.to_string()))?;
        Self::from_map_file(&file)
    }

    fn idx(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    fn check(&self, x: i32, y: i32) -> Result<usize> {
        if !self.in_bounds(x, y) {
            return Err(RouteError::InvalidMap(format!("({x}, {y}) is outside the map")));
        }
        Ok(self.idx(x, y))
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let i = self.idx(x, y);
        Some(Tile { terrain: self.terrain[i], system: self.system[i], walkable: self.walkable[i], exits: self.exits[i] })
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) -> Result<()> {
        let i = self.check(x, y)?;
        self.walkable.set(i, tile.walkable);
        self.terrain[i] = tile.terrain;
        self.system[i] = tile.system;
        self.exits[i] = tile.exits & ALL_DIRECTIONS;
        Ok(())
    }

    pub fn set_exits(&mut self, x: i32, y: i32, mask: u8) -> Result<()> {
        let i = self.check(x, y)?;
        self.exits[i] = mask & ALL_DIRECTIONS;
        Ok(())
    }

    /// Marks a tile as occupied by a static event at height `z`.
    pub fn add_event(&mut self, x: i32, y: i32, z: i32) -> Result<()> {
        self.check(x, y)?;
        self.events.insert((x, y, z));
        Ok(())
    }

    pub fn remove_event(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.events.remove(&(x, y, z))
    }

    pub fn set_stuck_after(&mut self, frames: u32) {
        self.stuck_after = frames.max(1);
    }

    fn spawn(&mut self, spawn: &ActorSpawn) -> Result<()> {
        self.check(spawn.x, spawn.y)?;
        if self.actors.contains_key(&spawn.id) {
            return Err(RouteError::InvalidMap(format!("actor {} spawned twice", spawn.id)));
        }
        let motion = MotionState { surfing: spawn.surfing, ..MotionState::at(spawn.x, spawn.y, spawn.z) };
        self.add_actor(spawn.id, motion);
        Ok(())
    }

    /// Places `id` at `motion`, replacing any actor with the same id.
    pub fn add_actor(&mut self, id: ActorId, motion: MotionState) {
        self.actors.insert(id, GridActor::new(id, motion));
    }

    /// Teleports an actor without touching its queued moves.
    pub fn set_motion(&mut self, id: ActorId, motion: MotionState) -> bool {
        match self.actors.get_mut(&id) {
            Some(a) => {
                a.motion = motion;
                true
            }
            None => false,
        }
    }

    pub fn remove_actor(&mut self, id: ActorId) -> bool {
        self.actors.remove(&id).is_some()
    }

    pub fn actor(&self, id: ActorId) -> Option<&GridActor> {
        self.actors.get(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &GridActor> {
        self.actors.values()
    }

    /// Every actor with queued moves attempts its next one. Actors move in id
    /// order and see the positions of those that already moved this frame.
    pub fn advance(&mut self) {
        let ids: Vec<ActorId> = self.actors.keys().copied().collect();
        for id in ids {
            let Some(mut actor) = self.actors.get(&id).cloned() else { continue };
            let Some(dir) = actor.path.pop_front() else { continue };
            if actor.step(&*self, dir) {
                actor.blocked_frames = 0;
            } else {
                actor.path.push_front(dir);
                actor.blocked_frames += 1;
            }
            self.actors.insert(id, actor);
        }
    }
}

impl TileMap for GridMap {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn terrain_tag(&self, x: i32, y: i32) -> TerrainTag {
        self.terrain[self.idx(x, y)]
    }

    fn system_tag(&self, x: i32, y: i32) -> SystemTag {
        self.system[self.idx(x, y)]
    }

    fn walkable(&self, x: i32, y: i32) -> bool {
        self.walkable[self.idx(x, y)]
    }

    fn passable(&self, x: i32, y: i32, dir: Direction) -> bool {
        let (dx, dy) = dir.offset();
        self.exits[self.idx(x, y)] & dir.bit() != 0 && self.walkable(x + dx, y + dy)
    }

    fn occupied(&self, x: i32, y: i32, z: i32, ignore: &[ActorId]) -> bool {
        self.events.contains(&(x, y, z))
            || self.actors.values().any(|a| {
                let m = a.motion;
                m.x == x && m.y == y && m.z == z && !ignore.contains(&a.id())
            })
    }
}

impl ActorHost for GridMap {
    fn actor_motion(&self, id: ActorId) -> Option<MotionState> {
        self.actors.get(&id).map(|a| a.motion)
    }

    fn is_stuck(&self, id: ActorId) -> bool {
        self.actors.get(&id).is_some_and(|a| a.blocked_frames >= self.stuck_after)
    }

    fn assign_path(&mut self, id: ActorId, moves: &[Direction]) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.path = moves.iter().copied().collect();
            a.blocked_frames = 0;
            a.failed = false;
        }
    }

    fn path_failed(&mut self, id: ActorId) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.path.clear();
            a.failed = true;
        }
    }
}

/// JSON map layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFile {
    pub rows: Vec<String>,
    #[serde(default)]
    pub actors: Vec<ActorSpawn>,
    #[serde(default)]
    pub exits: Vec<ExitRule>,
    /// Static occupied tiles as `[x, y, z]`.
    #[serde(default)]
    pub events: Vec<[i32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stuck_after: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpawn {
    pub id: ActorId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub surfing: bool,
}

/// Restricts the directions an actor may leave a tile in, e.g. `"north,east"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRule {
    pub x: i32,
    pub y: i32,
    pub allow: String,
}
