//! Persisted layout of the scheduler. Field names are part of the save format.

use serde::{Deserialize, Serialize};

use crate::models::{ActorId, Direction, MotionState, Tries};
use crate::request::RequestState;
use crate::target::Side;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRecord {
    pub version: u32,
    /// Requests in creation order.
    pub requests: Vec<RequestRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub actor: ActorId,
    pub target: TargetRecord,
    pub profile: String,
    pub tries: Tries,
    pub state: RequestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SessionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchRecord>,
    #[serde(default)]
    pub retry_in: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRecord {
    Coords { x: i32, y: i32, z: i32, radius: u32 },
    Character { actor: ActorId, radius: u32, threshold: u32, last_seen: [i32; 3] },
    CharacterReject { actor: ActorId, distance: u32, threshold: u32, last_seen: [i32; 3] },
    Border { side: Side, width: i32, height: i32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub nodes: Vec<NodeRecord>,
    /// Open entries as `[f, seq, node]`.
    pub frontier: Vec<(u32, u64, u32)>,
    /// Closed keys as `[x, y, z, state_bits]`.
    pub closed: Vec<(i32, i32, i32, u8)>,
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<(u32, u8)>,
    pub expansions: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub motion: MotionState,
    pub g: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub motion: MotionState,
    pub index: usize,
    pub idle_frames: u32,
    pub last_actor_tile: [i32; 3],
}
