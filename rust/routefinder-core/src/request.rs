//! One actor's route request: search, publish, watch, retry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::budget::Allowance;
use crate::cost::{ProfileRegistry, TagCostProfile};
use crate::cursor::Cursor;
use crate::error::{Result, RouteError};
use crate::models::{ActorId, Direction, MotionState, Tries};
use crate::movement::Mover;
use crate::options::EngineOptions;
use crate::search::{SearchStatus, Session};
use crate::storage::{RequestRecord, WatchRecord};
use crate::target::Target;
use crate::world::{ActorHost, TileMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Reached,
    NoPath,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Searching,
    Watching,
    Waiting,
    Reload,
    Finished(Outcome),
}

impl RequestState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RequestState::Finished(_))
    }
}

type Tile = (i32, i32, i32);

fn tile_of(m: &MotionState) -> Tile {
    (m.x, m.y, m.z)
}

/// Progress of the actor along the published moves.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Watch {
    /// Expected state of the actor after `index` moves.
    motion: MotionState,
    index: usize,
    idle_frames: u32,
    last_actor_tile: Tile,
}

#[derive(Clone, Debug)]
pub struct Request {
    actor: ActorId,
    target: Target,
    profile: Arc<TagCostProfile>,
    tries: Tries,
    state: RequestState,
    /// Actors this request's cursors never collide with: the requester.
    ignore: Vec<ActorId>,
    session: Option<Session>,
    moves: Vec<Direction>,
    watch: Option<Watch>,
    retry_in: u32,
}

impl Request {
    pub fn new(actor: ActorId, target: Target, profile: Arc<TagCostProfile>, tries: Tries) -> Self {
        let ignore = vec![actor];
        Self {
            actor,
            target,
            profile,
            tries,
            state: RequestState::Searching,
            ignore,
            session: None,
            moves: Vec::new(),
            watch: None,
            retry_in: 0,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn tries(&self) -> Tries {
        self.tries
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn profile(&self) -> &TagCostProfile {
        &self.profile
    }

    /// Moves handed to the actor, empty unless watching.
    pub fn moves(&self) -> &[Direction] {
        &self.moves
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Successor expansions spent by the current search attempt.
    pub fn expansions(&self) -> u64 {
        self.session.as_ref().map_or(0, Session::expansions)
    }

    /// Advances the state machine by one step.
    pub fn update<H: ActorHost + ?Sized>(
        &mut self,
        host: &mut H,
        options: &EngineOptions,
        budget: &mut Allowance<'_>,
    ) -> RequestState {
        match self.state {
            RequestState::Searching => self.search(host, options, budget),
            RequestState::Watching => self.watch(&*host, options),
            RequestState::Waiting => {
                self.retry_in = self.retry_in.saturating_sub(1);
                if self.retry_in == 0 {
                    self.enter(RequestState::Searching);
                }
            }
            RequestState::Reload => self.reload(options, budget),
            RequestState::Finished(_) => {}
        }
        self.state
    }

    fn search<H: ActorHost + ?Sized>(&mut self, host: &mut H, options: &EngineOptions, budget: &mut Allowance<'_>) {
        if self.session.is_none() {
            let Some(origin) = host.actor_motion(self.actor) else {
                return self.finish(Outcome::NoPath);
            };
            if !self.target.refresh(&*host) {
                debug!(actor = %self.actor, "tracked actor gone");
                return self.finish(Outcome::NoPath);
            }
            self.session = Some(Session::start(origin, &self.target, &self.profile));
        }
        let Some(session) = self.session.as_mut() else { return };

        match session.run(&*host, &self.target, &self.profile, &self.ignore, budget) {
            SearchStatus::Suspended => {}
            SearchStatus::Found(moves) => {
                let origin = session.origin();
                let expanded = session.expansions();
                self.session = None;
                self.publish(host, origin, moves, expanded);
            }
            SearchStatus::Exhausted => {
                let expanded = session.expansions();
                self.session = None;
                self.tries.consume();
                debug!(actor = %self.actor, expanded, tries = ?self.tries, "search_exhausted");
                if self.tries.remain() {
                    self.retry_in = options.retry_delay_frames;
                    self.enter(RequestState::Waiting);
                } else {
                    self.finish(Outcome::NoPath);
                }
            }
        }
    }

    fn publish<H: ActorHost + ?Sized>(&mut self, host: &mut H, origin: MotionState, mut moves: Vec<Direction>, expanded: u64) {
        let Some(current) = host.actor_motion(self.actor) else {
            return self.finish(Outcome::NoPath);
        };
        if let Some(tracked) = self.target.tracked_actor() {
            match host.actor_motion(tracked) {
                None => return self.finish(Outcome::NoPath),
                Some(m) if self.target.moved_enough(m.x, m.y) => return self.obstruct("target moved"),
                Some(_) => {}
            }
        }
        // The actor may still be walking an older path; keep whatever part of
        // the new one it has not covered yet.
        let Some(walked) = walked_prefix(&*host, origin, current, &moves, &self.ignore) else {
            return self.obstruct("stale path");
        };
        moves.drain(..walked);
        if Cursor::new(current, &self.ignore).replay(&*host, &moves).is_err() {
            return self.obstruct("stale path");
        }
        if moves.is_empty() {
            return self.finish(Outcome::Reached);
        }
        if !self.target.refresh(&*host) {
            return self.finish(Outcome::NoPath);
        }
        host.assign_path(self.actor, &moves);
        info!(actor = %self.actor, expanded, path_len = moves.len(), "path published");
        self.watch = Some(Watch { motion: current, index: 0, idle_frames: 0, last_actor_tile: tile_of(&current) });
        self.moves = moves;
        self.enter(RequestState::Watching);
    }

    fn watch<H: ActorHost + ?Sized>(&mut self, host: &H, options: &EngineOptions) {
        let Some(actor) = host.actor_motion(self.actor) else {
            return self.finish(Outcome::NoPath);
        };
        if let Some(tracked) = self.target.tracked_actor() {
            match host.actor_motion(tracked) {
                None => return self.finish(Outcome::NoPath),
                Some(m) if self.target.moved_enough(m.x, m.y) => return self.obstruct("target moved"),
                Some(_) => {}
            }
        }
        let Some(watch) = self.watch.as_mut() else {
            return self.obstruct("lost watch state");
        };

        let tile = tile_of(&actor);
        if tile == watch.last_actor_tile {
            watch.idle_frames += 1;
        } else {
            watch.idle_frames = 0;
            watch.last_actor_tile = tile;
        }

        if tile != tile_of(&watch.motion) {
            let Some(&next) = self.moves.get(watch.index) else {
                return self.obstruct("displaced");
            };
            let mut cursor = Cursor::new(watch.motion, &self.ignore);
            if !cursor.step(host, next) || tile_of(&cursor.motion()) != tile {
                return self.obstruct("displaced");
            }
            watch.motion = actor;
            watch.index += 1;
        }

        if watch.index >= self.moves.len() {
            return self.finish(Outcome::Reached);
        }

        let end = (watch.index + options.lookahead_steps as usize).min(self.moves.len());
        if Cursor::new(watch.motion, &self.ignore).replay(host, &self.moves[watch.index..end]).is_err() {
            return self.obstruct("blocked ahead");
        }

        if host.is_stuck(self.actor) || watch.idle_frames >= options.stuck_frames {
            self.obstruct("stuck");
        }
    }

    fn reload(&mut self, options: &EngineOptions, budget: &mut Allowance<'_>) {
        if self.tries.remain() && !budget.charge_fixed(options.reload_cost) {
            debug!(actor = %self.actor, "reload deferred");
            return;
        }
        self.session = None;
        self.moves.clear();
        self.watch = None;
        if self.tries.remain() {
            self.enter(RequestState::Searching);
        } else {
            self.finish(Outcome::NoPath);
        }
    }

    fn obstruct(&mut self, reason: &'static str) {
        self.tries.consume();
        debug!(actor = %self.actor, reason, tries = ?self.tries, "path obstructed");
        self.enter(RequestState::Reload);
    }

    fn finish(&mut self, outcome: Outcome) {
        self.session = None;
        self.watch = None;
        info!(actor = %self.actor, ?outcome, "request finished");
        self.state = RequestState::Finished(outcome);
    }

    fn enter(&mut self, state: RequestState) {
        debug!(actor = %self.actor, from = ?self.state, to = ?state, "request state");
        self.state = state;
    }

    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            actor: self.actor,
            target: self.target.to_storage(),
            profile: self.profile.name().to_string(),
            tries: self.tries,
            state: self.state,
            search: self.session.as_ref().map(Session::to_record),
            moves: self.moves.clone(),
            watch: self.watch.as_ref().map(|w| WatchRecord {
                motion: w.motion,
                index: w.index,
                idle_frames: w.idle_frames,
                last_actor_tile: [w.last_actor_tile.0, w.last_actor_tile.1, w.last_actor_tile.2],
            }),
            retry_in: self.retry_in,
        }
    }

    pub fn from_record(record: &RequestRecord, profiles: &ProfileRegistry) -> Result<Self> {
        let profile = profiles.get(&record.profile)?;
        let target = Target::from_storage(&record.target)?;
        let session = record.search.as_ref().map(Session::from_record).transpose()?;
        let watch = record.watch.as_ref().map(|w| {
            let [x, y, z] = w.last_actor_tile;
            Watch { motion: w.motion, index: w.index, idle_frames: w.idle_frames, last_actor_tile: (x, y, z) }
        });
        match (&record.state, &watch) {
            (RequestState::Watching, None) => {
                return Err(RouteError::CorruptRecord(format!("actor {} is watching without a cursor", record.actor)));
            }
            (RequestState::Watching, Some(w)) if w.index >= record.moves.len() => {
                return Err(RouteError::CorruptRecord(format!("actor {} watch index out of range", record.actor)));
            }
            _ => {}
        }
        let ignore = vec![record.actor];
        Ok(Self {
            actor: record.actor,
            target,
            profile,
            tries: record.tries,
            state: record.state,
            ignore,
            session,
            moves: record.moves.clone(),
            watch,
            retry_in: record.retry_in,
        })
    }
}


/// Number of leading `moves` that take `origin` to `current`, or `None` when
/// `current` is not on the path.
fn walked_prefix<M: TileMap + ?Sized>(
    map: &M,
    origin: MotionState,
    current: MotionState,
    moves: &[Direction],
    ignore: &[ActorId],
) -> Option<usize> {
    let mut cursor = Cursor::new(origin, ignore);
    if cursor.motion() == current {
        return Some(0);
    }
    for (i, &dir) in moves.iter().enumerate() {
        if !cursor.step(map, dir) {
            return None;
        }
        if cursor.motion() == current {
            return Some(i + 1);
        }
    }
    None
}
