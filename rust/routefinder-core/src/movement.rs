//! Step resolution shared by real actors and the search cursor.
//!
//! `resolve_step` is the only place passability is decided; anything that
//! moves goes through [`Mover::step`] so a path found by the search replays
//! identically on the actor that walks it.

use crate::models::{ActorId, Axis, Direction, MotionState, SystemTag};
use crate::world::TileMap;

/// Forced-movement chains (ice, rapids) longer than this are treated as loops.
pub const MAX_FORCED_CHAIN: usize = 64;

pub trait Mover {
    fn motion(&self) -> MotionState;

    fn set_motion(&mut self, motion: MotionState);

    /// Actors that never block this mover, normally just itself.
    fn ignored(&self) -> &[ActorId];

    fn step<M: TileMap + ?Sized>(&mut self, map: &M, dir: Direction) -> bool {
        match resolve_step(map, self.motion(), dir, self.ignored()) {
            Some(next) => {
                self.set_motion(next);
                true
            }
            None => false,
        }
    }

    fn can_step<M: TileMap + ?Sized>(&self, map: &M, dir: Direction) -> bool {
        resolve_step(map, self.motion(), dir, self.ignored()).is_some()
    }
}

/// Resolve one commanded step including any forced movement it triggers.
/// Returns the state the mover ends in, or `None` when the step is refused.
pub fn resolve_step<M: TileMap + ?Sized>(
    map: &M,
    from: MotionState,
    dir: Direction,
    ignore: &[ActorId],
) -> Option<MotionState> {
    let mut state = single_step(map, from, dir, ignore)?;
    let mut heading = dir;
    for _ in 0..MAX_FORCED_CHAIN {
        if state.on_bridge {
            return Some(state);
        }
        match map.system_tag(state.x, state.y) {
            SystemTag::Ice if !state.surfing => match single_step(map, state, heading, ignore) {
                Some(next) => state = next,
                None => {
                    state.sliding = true;
                    return Some(state);
                }
            },
            SystemTag::Rapid(push) => {
                heading = push;
                match single_step(map, state, push, ignore) {
                    Some(next) => state = next,
                    None => return Some(state),
                }
            }
            _ => return Some(state),
        }
    }
    None
}

fn single_step<M: TileMap + ?Sized>(
    map: &M,
    from: MotionState,
    dir: Direction,
    ignore: &[ActorId],
) -> Option<MotionState> {
    // States restored from records may lie off the map.
    if !map.in_bounds(from.x, from.y) {
        return None;
    }
    let (dx, dy) = dir.offset();
    let mut next = from;
    next.sliding = false;

    if from.on_bridge {
        match map.system_tag(from.x, from.y) {
            SystemTag::Bridge(axis) | SystemTag::BridgeRamp(axis) if !axis.allows(dir) => return None,
            _ => {}
        }
    }

    let (mut tx, mut ty) = (from.x + dx, from.y + dy);
    if !map.in_bounds(tx, ty) {
        return None;
    }
    if !from.on_bridge && !map.passable(from.x, from.y, dir) {
        return None;
    }

    let mut landing = map.system_tag(tx, ty);
    if !from.on_bridge {
        match landing {
            SystemTag::Ledge(down) => {
                if down != dir || from.surfing {
                    return None;
                }
                tx += dx;
                ty += dy;
                if !map.in_bounds(tx, ty) || !map.walkable(tx, ty) {
                    return None;
                }
                landing = map.system_tag(tx, ty);
                if matches!(landing, SystemTag::Ledge(_)) {
                    return None;
                }
            }
            SystemTag::Slope(offset) if dir.axis() == Axis::Horizontal => {
                ty += offset;
                if !map.in_bounds(tx, ty) || !map.walkable(tx, ty) {
                    return None;
                }
                landing = map.system_tag(tx, ty);
            }
            _ => {}
        }
    }

    if from.on_bridge {
        match landing {
            SystemTag::Bridge(_) | SystemTag::BridgeRamp(_) => {}
            _ => {
                if !map.walkable(tx, ty) {
                    return None;
                }
                next.on_bridge = false;
                next.z -= 1;
            }
        }
    } else if let SystemTag::BridgeRamp(axis) = landing {
        if axis.allows(dir) {
            next.on_bridge = true;
            next.z += 1;
        }
    }

    let water = landing == SystemTag::Water && !next.on_bridge;
    if water && !from.surfing {
        return None;
    }
    if !water {
        next.surfing = false;
    }

    next.x = tx;
    next.y = ty;
    if map.occupied(tx, ty, next.z, ignore) {
        return None;
    }
    Some(next)
}
