use serde::Serialize;
use tracing::{debug, info};

use routefinder_core::{ActorId, GridMap, Outcome, Scheduler};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u32,
    pub expansions: u64,
    pub finished: Vec<(ActorId, Outcome)>,
    /// Requests still live when the run stopped.
    pub pending: Vec<ActorId>,
}

/// Ticks the scheduler and walks the map for up to `ticks` frames, stopping
/// early once no request is left.
pub fn run(scheduler: &mut Scheduler, map: &mut GridMap, ticks: u32) -> RunSummary {
    let mut summary = RunSummary::default();
    for frame in 0..ticks {
        if scheduler.is_empty() {
            break;
        }
        let report = scheduler.tick(map);
        debug!(frame, expansions = report.expansions, spent = report.spent, live = scheduler.len(), "tick");
        for (actor, outcome) in &report.finished {
            info!(frame, actor = %actor, ?outcome, "request done");
        }
        summary.ticks += 1;
        summary.expansions += u64::from(report.expansions);
        summary.finished.extend(report.finished);
        map.advance();
    }
    summary.pending = scheduler.actors().collect();
    summary
}
