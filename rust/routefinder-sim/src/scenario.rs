//! Scenario files: engine tuning, extra cost profiles and the requests to
//! schedule at frame 0.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use routefinder_core::cost::DEFAULT_PROFILE;
use routefinder_core::{
    ActorHost, ActorId, EngineOptions, ProfileRegistry, Scheduler, TagCostProfile, TargetSpec, Tries,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Overrides for the environment-derived options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EngineOptions>,
    #[serde(default)]
    pub profiles: Vec<TagCostProfile>,
    #[serde(default)]
    pub requests: Vec<RequestEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestEntry {
    pub actor: ActorId,
    pub target: TargetSpec,
    /// Omitted means unlimited.
    #[serde(default)]
    pub tries: Option<u32>,
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("invalid scenario {:?}", path))
    }

    pub fn engine_options(&self) -> EngineOptions {
        self.options.clone().unwrap_or_else(EngineOptions::from_env)
    }

    /// Scheduler with this scenario's options and profiles, without requests.
    pub fn scheduler(&self) -> Result<Scheduler> {
        let mut profiles = ProfileRegistry::default();
        for p in &self.profiles {
            profiles.register(p.clone()).with_context(|| format!("profile {:?}", p.name()))?;
        }
        Ok(Scheduler::with_profiles(self.engine_options(), profiles)?)
    }

    pub fn schedule<H: ActorHost + ?Sized>(&self, scheduler: &mut Scheduler, host: &H) -> Result<()> {
        for r in &self.requests {
            let tries = r.tries.map_or(Tries::Unlimited, Tries::Finite);
            scheduler
                .add_request(host, r.actor, &r.target, tries, &r.profile)
                .with_context(|| format!("request for actor {}", r.actor))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routefinder_core::GridMap;

    #[test]
    fn parses_minimal_scenario() {
        let s: Scenario = serde_json::from_str(
            r#"{"requests": [{"actor": 1, "target": {"kind": "coords", "x": 2, "y": 0}}]}"#,
        )
        .unwrap();
        assert_eq!(s.requests[0].profile, "default");
        assert_eq!(s.requests[0].tries, None);
    }

    #[test]
    fn schedule_reports_bad_requests() {
        let mut map = GridMap::from_ascii(&["..."]).unwrap();
        map.add_actor(ActorId(1), routefinder_core::MotionState::at(0, 0, 0));
        let s: Scenario = serde_json::from_str(
            r#"{
                "options": {"operation_budget": 10},
                "profiles": [{"name": "mud", "default_cost": 3}],
                "requests": [
                    {"actor": 1, "target": {"kind": "coords", "x": 2, "y": 0}, "profile": "mud", "tries": 2},
                    {"actor": 9, "target": {"kind": "coords", "x": 1, "y": 0}}
                ]
            }"#,
        )
        .unwrap();
        let mut scheduler = s.scheduler().unwrap();
        assert_eq!(scheduler.options().operation_budget, 10);
        let err = s.schedule(&mut scheduler, &map).unwrap_err();
        assert!(format!("{err:#}").contains("unknown actor"));
        assert_eq!(scheduler.tries_of(ActorId(1)), Some(Tries::Finite(2)));
    }
}
