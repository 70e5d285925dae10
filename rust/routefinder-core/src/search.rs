//! Budgeted, resumable A* over movement-cursor successors.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::budget::Allowance;
use crate::cost::TagCostProfile;
use crate::cursor::Cursor;
use crate::error::{Result, RouteError};
use crate::models::{ActorId, Direction, MotionState};
use crate::movement::Mover;
use crate::storage::{NodeRecord, SessionRecord};
use crate::target::Target;
use crate::world::TileMap;

pub type NodeId = u32;

/// Closed-set identity: position plus movement flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub bits: u8,
}

impl NodeKey {
    pub fn of(m: &MotionState) -> Self {
        Self { x: m.x, y: m.y, z: m.z, bits: m.state_bits() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub motion: MotionState,
    pub g: u32,
    pub h: u32,
    pub direction: Option<Direction>,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn f(&self) -> u32 {
        self.g.saturating_add(self.h)
    }
}

// Field order gives the priority: lowest f, then oldest insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenKey {
    f: u32,
    seq: u64,
    node: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    node: NodeId,
    next_dir: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    /// Goal reached; moves from the start node.
    Found(Vec<Direction>),
    /// Frontier empty without satisfying the target.
    Exhausted,
    /// Budget ran out; call `run` again next frame.
    Suspended,
}

/// One search attempt. Owns the node arena and the open/closed sets.
#[derive(Clone, Debug)]
pub struct Session {
    nodes: Vec<Node>,
    open: BTreeSet<OpenKey>,
    open_index: FxHashMap<NodeKey, OpenKey>,
    closed: FxHashSet<NodeKey>,
    seq: u64,
    pending: Option<Pending>,
    expansions: u64,
}

impl Session {
    pub fn start(origin: MotionState, target: &Target, profile: &TagCostProfile) -> Self {
        let mut session = Self {
            nodes: Vec::new(),
            open: BTreeSet::new(),
            open_index: FxHashMap::default(),
            closed: FxHashSet::default(),
            seq: 0,
            pending: None,
            expansions: 0,
        };
        let h = target.heuristic(origin.x, origin.y).saturating_mul(profile.min_cost());
        session.push(Node { motion: origin, g: 0, h, direction: None, parent: None });
        session
    }

    pub fn origin(&self) -> MotionState {
        self.nodes[0].motion
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    pub fn frontier_len(&self) -> usize {
        self.open.len()
    }

    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_closed(&self, m: &MotionState) -> bool {
        self.closed.contains(&NodeKey::of(m))
    }

    pub fn is_open(&self, m: &MotionState) -> bool {
        self.open_index.contains_key(&NodeKey::of(m))
    }

    /// Expands nodes until the target is reached, the frontier empties or the
    /// allowance runs dry. Each attempted direction costs one unit.
    pub fn run<M: TileMap + ?Sized>(
        &mut self,
        map: &M,
        target: &Target,
        profile: &TagCostProfile,
        ignore: &[ActorId],
        budget: &mut Allowance<'_>,
    ) -> SearchStatus {
        loop {
            if budget.exhausted() {
                return SearchStatus::Suspended;
            }
            let Pending { node, next_dir } = match self.pending.take() {
                Some(p) => p,
                None => {
                    let Some(entry) = self.open.pop_first() else {
                        return SearchStatus::Exhausted;
                    };
                    let n = &self.nodes[entry.node as usize];
                    let key = NodeKey::of(&n.motion);
                    self.open_index.remove(&key);
                    self.closed.insert(key);
                    if target.reached(n.motion.x, n.motion.y, n.motion.z) {
                        return SearchStatus::Found(self.reconstruct(entry.node));
                    }
                    Pending { node: entry.node, next_dir: 0 }
                }
            };
            for i in next_dir..Direction::ORDER.len() as u8 {
                if !budget.try_expand() {
                    self.pending = Some(Pending { node, next_dir: i });
                    return SearchStatus::Suspended;
                }
                self.expansions += 1;
                self.expand(map, target, profile, ignore, node, Direction::ORDER[i as usize]);
            }
        }
    }

    fn expand<M: TileMap + ?Sized>(
        &mut self,
        map: &M,
        target: &Target,
        profile: &TagCostProfile,
        ignore: &[ActorId],
        parent: NodeId,
        dir: Direction,
    ) {
        let from = &self.nodes[parent as usize];
        let parent_g = from.g;
        let mut cursor = Cursor::new(from.motion, ignore);
        if !cursor.step(map, dir) {
            return;
        }
        let next = cursor.motion();
        let key = NodeKey::of(&next);
        if self.closed.contains(&key) {
            return;
        }
        let g = parent_g.saturating_add(profile.cost(map.terrain_tag(next.x, next.y)));

        if let Some(entry) = self.open_index.get(&key).copied() {
            if g >= self.nodes[entry.node as usize].g {
                return;
            }
            self.open.remove(&entry);
            let node = &mut self.nodes[entry.node as usize];
            node.g = g;
            node.parent = Some(parent);
            node.direction = Some(dir);
            let f = node.f();
            self.seq += 1;
            let entry = OpenKey { f, seq: self.seq, node: entry.node };
            self.open.insert(entry);
            self.open_index.insert(key, entry);
            return;
        }

        let h = target.heuristic(next.x, next.y).saturating_mul(profile.min_cost());
        self.push(Node { motion: next, g, h, direction: Some(dir), parent: Some(parent) });
    }

    fn push(&mut self, node: Node) {
        let id = self.nodes.len() as NodeId;
        let key = NodeKey::of(&node.motion);
        self.seq += 1;
        let entry = OpenKey { f: node.f(), seq: self.seq, node: id };
        self.nodes.push(node);
        self.open.insert(entry);
        self.open_index.insert(key, entry);
    }

    fn reconstruct(&self, goal: NodeId) -> Vec<Direction> {
        let mut moves = Vec::new();
        let mut cur = Some(goal);
        while let Some(id) = cur {
            let node = &self.nodes[id as usize];
            if let Some(dir) = node.direction {
                moves.push(dir);
            }
            cur = node.parent;
        }
        moves.reverse();
        moves
    }

    pub fn to_record(&self) -> SessionRecord {
        let nodes = self
            .nodes
            .iter()
            .map(|n| NodeRecord { motion: n.motion, g: n.g, h: n.h, direction: n.direction, parent: n.parent })
            .collect();
        let frontier = self.open.iter().map(|k| (k.f, k.seq, k.node)).collect();
        let mut closed: Vec<(i32, i32, i32, u8)> = self.closed.iter().map(|k| (k.x, k.y, k.z, k.bits)).collect();
        closed.sort_unstable();
        SessionRecord {
            nodes,
            frontier,
            closed,
            seq: self.seq,
            pending: self.pending.map(|p| (p.node, p.next_dir)),
            expansions: self.expansions,
        }
    }

    pub fn from_record(record: &SessionRecord) -> Result<Self> {
        let len = record.nodes.len();
        if len == 0 {
            return Err(RouteError::CorruptRecord("search without nodes".into()));
        }
        let in_arena = |id: NodeId| (id as usize) < len;
        let mut nodes = Vec::with_capacity(len);
        for (i, n) in record.nodes.iter().enumerate() {
            if n.parent.is_some_and(|p| !in_arena(p) || p as usize >= i) {
                return Err(RouteError::CorruptRecord(format!("node {i} has invalid parent {:?}", n.parent)));
            }
            nodes.push(Node { motion: n.motion, g: n.g, h: n.h, direction: n.direction, parent: n.parent });
        }
        let closed: FxHashSet<NodeKey> =
            record.closed.iter().map(|&(x, y, z, bits)| NodeKey { x, y, z, bits }).collect();
        let mut open = BTreeSet::new();
        let mut open_index = FxHashMap::default();
        for &(f, seq, node) in &record.frontier {
            if !in_arena(node) {
                return Err(RouteError::CorruptRecord(format!("frontier references node {node}")));
            }
            let key = NodeKey::of(&nodes[node as usize].motion);
            if closed.contains(&key) {
                return Err(RouteError::CorruptRecord(format!("node {node} is both open and closed")));
            }
            let entry = OpenKey { f, seq, node };
            open.insert(entry);
            open_index.insert(key, entry);
        }
        let pending = match record.pending {
            Some((node, next_dir)) if in_arena(node) && (next_dir as usize) < Direction::ORDER.len() => {
                Some(Pending { node, next_dir })
            }
            Some(p) => return Err(RouteError::CorruptRecord(format!("invalid pending expansion {p:?}"))),
            None => None,
        };
        Ok(Self { nodes, open, open_index, closed, seq: record.seq, pending, expansions: record.expansions })
    }
}
