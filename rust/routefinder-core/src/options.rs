use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};

pub const DEFAULT_OPERATION_BUDGET: u32 = 150;
pub const DEFAULT_REQUEST_CAP: u32 = 50;
pub const DEFAULT_RELOAD_COST: u32 = 10;
pub const DEFAULT_RETRY_DELAY_FRAMES: u32 = 60;
pub const DEFAULT_STUCK_FRAMES: u32 = 120;
pub const DEFAULT_MOVE_THRESHOLD: u32 = 2;
pub const DEFAULT_LOOKAHEAD_STEPS: u32 = 1;

/// Scheduler tuning. The frame-related values are tuning knobs, not
/// correctness properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Successor expansions allowed per frame across all requests.
    pub operation_budget: u32,
    /// Successor expansions one request may spend per frame.
    pub request_cap: u32,
    /// Budget charged when a request restarts its search.
    pub reload_cost: u32,
    /// Frames to back off after a failed search before retrying.
    pub retry_delay_frames: u32,
    /// Frames without displacement after which a walking actor counts as stuck.
    pub stuck_frames: u32,
    /// Tiles a tracked character must move before the path is recomputed.
    pub move_threshold: u32,
    /// Upcoming path steps checked for obstacles each frame while watching.
    pub lookahead_steps: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            operation_budget: DEFAULT_OPERATION_BUDGET,
            request_cap: DEFAULT_REQUEST_CAP,
            reload_cost: DEFAULT_RELOAD_COST,
            retry_delay_frames: DEFAULT_RETRY_DELAY_FRAMES,
            stuck_frames: DEFAULT_STUCK_FRAMES,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            lookahead_steps: DEFAULT_LOOKAHEAD_STEPS,
        }
    }
}

impl EngineOptions {
    /// Load options from environment variables. Missing/invalid values fall back to defaults.
    ///
    /// Variables:
    /// - ROUTEFINDER_OPERATION_BUDGET: positive integer
    /// - ROUTEFINDER_REQUEST_CAP: positive integer
    /// - ROUTEFINDER_RELOAD_COST: integer
    /// - ROUTEFINDER_RETRY_DELAY_FRAMES: integer
    /// - ROUTEFINDER_STUCK_FRAMES: positive integer
    /// - ROUTEFINDER_MOVE_THRESHOLD: positive integer
    /// - ROUTEFINDER_LOOKAHEAD_STEPS: integer
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = env_u32("ROUTEFINDER_OPERATION_BUDGET").filter(|n| *n > 0) { cfg.operation_budget = n; }
        if let Some(n) = env_u32("ROUTEFINDER_REQUEST_CAP").filter(|n| *n > 0) { cfg.request_cap = n; }
        if let Some(n) = env_u32("ROUTEFINDER_RELOAD_COST") { cfg.reload_cost = n; }
        if let Some(n) = env_u32("ROUTEFINDER_RETRY_DELAY_FRAMES") { cfg.retry_delay_frames = n; }
        if let Some(n) = env_u32("ROUTEFINDER_STUCK_FRAMES").filter(|n| *n > 0) { cfg.stuck_frames = n; }
        if let Some(n) = env_u32("ROUTEFINDER_MOVE_THRESHOLD").filter(|n| *n > 0) { cfg.move_threshold = n; }
        if let Some(n) = env_u32("ROUTEFINDER_LOOKAHEAD_STEPS") { cfg.lookahead_steps = n; }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.operation_budget == 0 {
            return Err(RouteError::InvalidBudget("operation_budget"));
        }
        if self.request_cap == 0 {
            return Err(RouteError::InvalidBudget("request_cap"));
        }
        if self.stuck_frames == 0 {
            return Err(RouteError::InvalidBudget("stuck_frames"));
        }
        if self.move_threshold == 0 {
            return Err(RouteError::InvalidBudget("move_threshold"));
        }
        Ok(())
    }
}

fn env_u32(name: &str) -> Option<u32> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u32>().ok())
}
