//! Traits the game world implements for the engine.

use crate::models::{ActorId, Direction, MotionState, SystemTag, TerrainTag};

/// Read-only tile queries. Coordinates outside `0..width` x `0..height` are
/// never passed to the per-tile methods except `in_bounds`.
pub trait TileMap {
    fn width(&self) -> i32;

    fn height(&self) -> i32;

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width() && y < self.height()
    }

    fn terrain_tag(&self, x: i32, y: i32) -> TerrainTag;

    fn system_tag(&self, x: i32, y: i32) -> SystemTag;

    /// Ground-level walkability of a tile, ignoring occupants.
    fn walkable(&self, x: i32, y: i32) -> bool;

    /// Whether a ground-level mover may leave `(x, y)` heading `dir`.
    /// The neighbour is guaranteed to be in bounds.
    fn passable(&self, x: i32, y: i32, dir: Direction) -> bool {
        let (dx, dy) = dir.offset();
        self.walkable(x + dx, y + dy)
    }

    /// Whether an event or actor other than those in `ignore` stands on the
    /// tile at height `z`.
    fn occupied(&self, x: i32, y: i32, z: i32, ignore: &[ActorId]) -> bool;
}

/// Actor bookkeeping the scheduler reads and notifies.
pub trait ActorHost: TileMap {
    fn actor_motion(&self, id: ActorId) -> Option<MotionState>;

    /// The movement executor's own blocked-step detection.
    fn is_stuck(&self, _id: ActorId) -> bool {
        false
    }

    fn assign_path(&mut self, id: ActorId, moves: &[Direction]);

    fn path_failed(&mut self, id: ActorId);
}
