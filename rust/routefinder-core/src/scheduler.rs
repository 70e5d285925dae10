//! Owns every live request and splits the per-frame operation budget.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::budget::FrameBudget;
use crate::cost::ProfileRegistry;
use crate::error::{Result, RouteError};
use crate::models::{ActorId, Tries};
use crate::options::EngineOptions;
use crate::request::{Outcome, Request, RequestState};
use crate::storage::{SchedulerRecord, FORMAT_VERSION};
use crate::target::{Target, TargetSpec};
use crate::world::ActorHost;

/// What happened during one [`Scheduler::tick`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Successor expansions spent across all requests.
    pub expansions: u32,
    /// Budget units consumed, expansions and reload charges together.
    pub spent: u32,
    /// Requests that finished this frame, in creation order.
    pub finished: Vec<(ActorId, Outcome)>,
}

#[derive(Debug)]
pub struct Scheduler {
    requests: IndexMap<ActorId, Request>,
    profiles: ProfileRegistry,
    options: EngineOptions,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { requests: IndexMap::new(), profiles: ProfileRegistry::default(), options: EngineOptions::default() }
    }
}

impl Scheduler {
    pub fn new(options: EngineOptions) -> Result<Self> {
        Self::with_profiles(options, ProfileRegistry::default())
    }

    pub fn with_profiles(options: EngineOptions, profiles: ProfileRegistry) -> Result<Self> {
        options.validate()?;
        Ok(Self { requests: IndexMap::new(), profiles, options })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut ProfileRegistry {
        &mut self.profiles
    }

    /// Starts a route request for `actor`, replacing any request it already
    /// has. Nothing changes when an argument is rejected.
    pub fn add_request<H: ActorHost + ?Sized>(
        &mut self,
        host: &H,
        actor: ActorId,
        spec: &TargetSpec,
        tries: Tries,
        profile: &str,
    ) -> Result<()> {
        if host.actor_motion(actor).is_none() {
            return Err(RouteError::UnknownActor(actor));
        }
        if tries == Tries::Finite(0) {
            return Err(RouteError::InvalidTries);
        }
        let profile = self.profiles.get(profile)?;
        let target = Target::build(spec, host, actor, self.options.move_threshold)?;

        let replaced = self.requests.shift_remove(&actor).is_some();
        debug!(actor = %actor, ?tries, profile = profile.name(), replaced, "request added");
        self.requests.insert(actor, Request::new(actor, target, profile, tries));
        Ok(())
    }

    pub fn remove_request(&mut self, actor: ActorId) -> bool {
        self.requests.shift_remove(&actor).is_some()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn set_operation_budget(&mut self, n: u32) -> Result<()> {
        if n == 0 {
            return Err(RouteError::InvalidBudget("operation_budget"));
        }
        self.options.operation_budget = n;
        Ok(())
    }

    pub fn set_request_cap(&mut self, n: u32) -> Result<()> {
        if n == 0 {
            return Err(RouteError::InvalidBudget("request_cap"));
        }
        self.options.request_cap = n;
        Ok(())
    }

    /// Runs one frame: every request gets one state update, in creation
    /// order, drawing on a budget shared by the whole frame.
    pub fn tick<H: ActorHost + ?Sized>(&mut self, host: &mut H) -> TickReport {
        let mut frame = FrameBudget::new(self.options.operation_budget);
        let mut finished = Vec::new();
        for request in self.requests.values_mut() {
            let mut allowance = frame.allowance(self.options.request_cap);
            if let RequestState::Finished(outcome) = request.update(host, &self.options, &mut allowance) {
                finished.push((request.actor(), outcome));
            }
        }
        for (actor, outcome) in &finished {
            self.requests.shift_remove(actor);
            if *outcome == Outcome::NoPath && host.actor_motion(*actor).is_some() {
                host.path_failed(*actor);
            }
        }
        TickReport { expansions: frame.expansions(), spent: frame.spent(), finished }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.requests.contains_key(&actor)
    }

    pub fn request(&self, actor: ActorId) -> Option<&Request> {
        self.requests.get(&actor)
    }

    pub fn state_of(&self, actor: ActorId) -> Option<RequestState> {
        self.requests.get(&actor).map(Request::state)
    }

    pub fn tries_of(&self, actor: ActorId) -> Option<Tries> {
        self.requests.get(&actor).map(Request::tries)
    }

    pub fn expansions_of(&self, actor: ActorId) -> Option<u64> {
        self.requests.get(&actor).map(Request::expansions)
    }

    /// Actors with a live request, in creation order.
    pub fn actors(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.requests.keys().copied()
    }

    pub fn save(&self) -> SchedulerRecord {
        SchedulerRecord { version: FORMAT_VERSION, requests: self.requests.values().map(Request::to_record).collect() }
    }

    /// Replaces every live request with the saved ones. On error the
    /// scheduler is left untouched.
    pub fn load(&mut self, record: &SchedulerRecord) -> Result<()> {
        if record.version != FORMAT_VERSION {
            warn!(version = record.version, expected = FORMAT_VERSION, "rejected scheduler record");
            return Err(RouteError::CorruptRecord(format!("unsupported format version {}", record.version)));
        }
        let mut requests = IndexMap::with_capacity(record.requests.len());
        for r in &record.requests {
            let request = Request::from_record(r, &self.profiles).inspect_err(|e| {
                warn!(actor = %r.actor, error = %e, "rejected request record");
            })?;
            if requests.insert(r.actor, request).is_some() {
                return Err(RouteError::CorruptRecord(format!("duplicate request for actor {}", r.actor)));
            }
        }
        self.requests = requests;
        Ok(())
    }
}
