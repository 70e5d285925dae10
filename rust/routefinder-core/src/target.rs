//! Goal tests for a request.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::models::{chebyshev, manhattan, ActorId};
use crate::storage::TargetRecord;
use crate::world::ActorHost;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    North,
    East,
    South,
    West,
}

/// Caller-supplied goal description, turned into a [`Target`] by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetSpec {
    Coords {
        x: i32,
        y: i32,
        #[serde(default)]
        z: i32,
        #[serde(default)]
        radius: u32,
    },
    Character {
        actor: ActorId,
        #[serde(default)]
        radius: u32,
    },
    CharacterReject {
        actor: ActorId,
        distance: u32,
    },
    Border {
        side: Side,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Coords { x: i32, y: i32, z: i32, radius: u32 },
    Character { actor: ActorId, radius: u32, threshold: u32, last_seen: (i32, i32, i32) },
    CharacterReject { actor: ActorId, distance: u32, threshold: u32, last_seen: (i32, i32, i32) },
    Border { side: Side, width: i32, height: i32 },
}

/// The followed character occupies its own tile, so a follower can at best
/// stand next to it.
fn follow_radius(radius: u32) -> u32 {
    radius.max(1)
}

impl Target {
    /// Validates `spec` against the world. `threshold` is the move distance
    /// that invalidates a path to a tracked character.
    pub fn build<H: ActorHost + ?Sized>(spec: &TargetSpec, host: &H, requester: ActorId, threshold: u32) -> Result<Self> {
        let tracked = |actor: ActorId| -> Result<(i32, i32, i32)> {
            if actor == requester {
                return Err(RouteError::InvalidTarget(format!("actor {actor} cannot target itself")));
            }
            host.actor_motion(actor)
                .map(|m| (m.x, m.y, m.z))
                .ok_or_else(|| RouteError::InvalidTarget(format!("tracked actor {actor} not found")))
        };
        match *spec {
            TargetSpec::Coords { x, y, z, radius } => {
                if !host.in_bounds(x, y) {
                    return Err(RouteError::InvalidTarget(format!("({x}, {y}) is outside the map")));
                }
                Ok(Target::Coords { x, y, z, radius })
            }
            TargetSpec::Character { actor, radius } => {
                let last_seen = tracked(actor)?;
                Ok(Target::Character { actor, radius, threshold, last_seen })
            }
            TargetSpec::CharacterReject { actor, distance } => {
                if distance == 0 {
                    return Err(RouteError::InvalidTarget("flee distance must be positive".into()));
                }
                let last_seen = tracked(actor)?;
                Ok(Target::CharacterReject { actor, distance, threshold, last_seen })
            }
            TargetSpec::Border { side } => {
                let (width, height) = (host.width(), host.height());
                if width <= 0 || height <= 0 {
                    return Err(RouteError::InvalidTarget("map has no border".into()));
                }
                Ok(Target::Border { side, width, height })
            }
        }
    }

    pub fn reached(&self, x: i32, y: i32, z: i32) -> bool {
        match *self {
            Target::Coords { x: tx, y: ty, z: tz, radius } => z == tz && manhattan(x, y, tx, ty) <= radius,
            Target::Character { radius, last_seen: (tx, ty, _), .. } => {
                manhattan(x, y, tx, ty) <= follow_radius(radius)
            }
            Target::CharacterReject { distance, last_seen: (tx, ty, _), .. } => manhattan(x, y, tx, ty) > distance,
            Target::Border { side, width, height } => match side {
                Side::North => y == 0,
                Side::South => y == height - 1,
                Side::West => x == 0,
                Side::East => x == width - 1,
            },
        }
    }

    /// Lower bound on the number of steps left, in tiles.
    pub fn heuristic(&self, x: i32, y: i32) -> u32 {
        match *self {
            Target::Coords { x: tx, y: ty, radius, .. } => chebyshev(x, y, tx, ty).saturating_sub(radius),
            Target::Character { radius, last_seen: (tx, ty, _), .. } => {
                chebyshev(x, y, tx, ty).saturating_sub(follow_radius(radius))
            }
            Target::CharacterReject { distance, last_seen: (tx, ty, _), .. } => {
                (distance + 1).saturating_sub(manhattan(x, y, tx, ty))
            }
            Target::Border { side, width, height } => {
                let d = match side {
                    Side::North => y,
                    Side::South => height - 1 - y,
                    Side::West => x,
                    Side::East => width - 1 - x,
                };
                d.max(0) as u32
            }
        }
    }

    /// Whether the goal drifted far enough from where the current path was
    /// computed for that the path should be recomputed.
    pub fn moved_enough(&self, x: i32, y: i32) -> bool {
        match *self {
            Target::Coords { .. } | Target::Border { .. } => false,
            Target::Character { threshold, last_seen: (tx, ty, _), .. }
            | Target::CharacterReject { threshold, last_seen: (tx, ty, _), .. } => chebyshev(x, y, tx, ty) >= threshold,
        }
    }

    pub fn tracked_actor(&self) -> Option<ActorId> {
        match *self {
            Target::Character { actor, .. } | Target::CharacterReject { actor, .. } => Some(actor),
            _ => None,
        }
    }

    /// Re-reads the tracked actor's position. Returns false when it is gone.
    pub fn refresh<H: ActorHost + ?Sized>(&mut self, host: &H) -> bool {
        match self {
            Target::Character { actor, last_seen, .. } | Target::CharacterReject { actor, last_seen, .. } => {
                match host.actor_motion(*actor) {
                    Some(m) => {
                        *last_seen = (m.x, m.y, m.z);
                        true
                    }
                    None => false,
                }
            }
            _ => true,
        }
    }

    pub fn to_storage(&self) -> TargetRecord {
        match *self {
            Target::Coords { x, y, z, radius } => TargetRecord::Coords { x, y, z, radius },
            Target::Character { actor, radius, threshold, last_seen: (x, y, z) } => {
                TargetRecord::Character { actor, radius, threshold, last_seen: [x, y, z] }
            }
            Target::CharacterReject { actor, distance, threshold, last_seen: (x, y, z) } => {
                TargetRecord::CharacterReject { actor, distance, threshold, last_seen: [x, y, z] }
            }
            Target::Border { side, width, height } => TargetRecord::Border { side, width, height },
        }
    }

    pub fn from_storage(record: &TargetRecord) -> Result<Self> {
        match *record {
            TargetRecord::Coords { x, y, z, radius } => Ok(Target::Coords { x, y, z, radius }),
            TargetRecord::Character { actor, radius, threshold, last_seen: [x, y, z] } => {
                if threshold == 0 {
                    return Err(RouteError::CorruptRecord("character target with zero threshold".into()));
                }
                Ok(Target::Character { actor, radius, threshold, last_seen: (x, y, z) })
            }
            TargetRecord::CharacterReject { actor, distance, threshold, last_seen: [x, y, z] } => {
                if distance == 0 || threshold == 0 {
                    return Err(RouteError::CorruptRecord("flee target with zero distance or threshold".into()));
                }
                Ok(Target::CharacterReject { actor, distance, threshold, last_seen: (x, y, z) })
            }
            TargetRecord::Border { side, width, height } => {
                if width <= 0 || height <= 0 {
                    return Err(RouteError::CorruptRecord(format!("border target on {width}x{height} map")));
                }
                Ok(Target::Border { side, width, height })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;
    use crate::models::MotionState;

    fn world() -> GridMap {
        let mut m = GridMap::from_ascii(&["......", "......", "......", "......"]).unwrap();
        m.add_actor(ActorId(1), MotionState::at(0, 0, 0));
        m.add_actor(ActorId(2), MotionState::at(3, 2, 0));
        m
    }

    #[test]
    fn coords_radius_is_manhattan() {
        let t = Target::build(&TargetSpec::Coords { x: 3, y: 2, z: 0, radius: 1 }, &world(), ActorId(1), 2).unwrap();
        assert!(t.reached(3, 2, 0));
        assert!(t.reached(4, 2, 0));
        assert!(!t.reached(4, 3, 0));
        assert!(!t.reached(3, 2, 1));
        assert!(!t.moved_enough(100, 100));
    }

    #[test]
    fn character_tracks_last_seen_position() {
        let mut w = world();
        let mut t = Target::build(&TargetSpec::Character { actor: ActorId(2), radius: 0 }, &w, ActorId(1), 2).unwrap();
        // A zero radius still means "next to it".
        assert!(t.reached(4, 2, 0));
        assert!(!t.reached(5, 2, 0));
        assert_eq!(t.heuristic(5, 2), 1);
        assert!(!t.moved_enough(4, 2));
        assert!(t.moved_enough(5, 2));

        w.set_motion(ActorId(2), MotionState::at(5, 3, 0));
        assert!(t.refresh(&w));
        assert!(t.reached(5, 2, 0));
        assert!(!t.reached(4, 2, 0));
    }

    #[test]
    fn reject_is_reached_beyond_distance() {
        let t = Target::build(&TargetSpec::CharacterReject { actor: ActorId(2), distance: 3 }, &world(), ActorId(1), 2)
            .unwrap();
        assert!(!t.reached(3, 2, 0));
        assert!(!t.reached(0, 2, 0));
        assert!(t.reached(0, 1, 0));
        assert_eq!(t.heuristic(3, 2), 4);
    }

    #[test]
    fn border_checks_named_edge() {
        let w = world();
        let east = Target::build(&TargetSpec::Border { side: Side::East }, &w, ActorId(1), 2).unwrap();
        assert!(east.reached(5, 1, 0));
        assert!(!east.reached(4, 1, 0));
        assert_eq!(east.heuristic(2, 0), 3);
        let north = Target::build(&TargetSpec::Border { side: Side::North }, &w, ActorId(1), 2).unwrap();
        assert!(north.reached(3, 0, 0));
        assert_eq!(north.heuristic(3, 3), 3);
    }

    #[test]
    fn construction_rejects_bad_specs() {
        let w = world();
        let missing = Target::build(&TargetSpec::Character { actor: ActorId(7), radius: 0 }, &w, ActorId(1), 2);
        assert!(matches!(missing, Err(RouteError::InvalidTarget(_))));
        let itself = Target::build(&TargetSpec::Character { actor: ActorId(1), radius: 0 }, &w, ActorId(1), 2);
        assert!(matches!(itself, Err(RouteError::InvalidTarget(_))));
        let outside = Target::build(&TargetSpec::Coords { x: 9, y: 0, z: 0, radius: 0 }, &w, ActorId(1), 2);
        assert!(matches!(outside, Err(RouteError::InvalidTarget(_))));
        let zero = Target::build(&TargetSpec::CharacterReject { actor: ActorId(2), distance: 0 }, &w, ActorId(1), 2);
        assert!(matches!(zero, Err(RouteError::InvalidTarget(_))));
    }

    #[test]
    fn refresh_fails_when_tracked_actor_vanishes() {
        let mut w = world();
        let mut t = Target::build(&TargetSpec::Character { actor: ActorId(2), radius: 1 }, &w, ActorId(1), 2).unwrap();
        w.remove_actor(ActorId(2));
        assert!(!t.refresh(&w));
    }

    #[test]
    fn storage_round_trip_preserves_last_seen() {
        let t = Target::CharacterReject { actor: ActorId(4), distance: 5, threshold: 2, last_seen: (1, 2, 0) };
        let back = Target::from_storage(&t.to_storage()).unwrap();
        assert_eq!(back, t);
        let bad = TargetRecord::Border { side: Side::West, width: 0, height: 4 };
        assert!(Target::from_storage(&bad).is_err());
    }

    #[test]
    fn spec_deserializes_from_tagged_json() {
        let spec: TargetSpec = serde_json::from_str(r#"{"kind":"coords","x":5,"y":5}"#).unwrap();
        assert_eq!(spec, TargetSpec::Coords { x: 5, y: 5, z: 0, radius: 0 });
        let spec: TargetSpec = serde_json::from_str(r#"{"kind":"border","side":"west"}"#).unwrap();
        assert_eq!(spec, TargetSpec::Border { side: Side::West });
    }
}
