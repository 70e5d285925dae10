use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::models::{terrain, TerrainTag};

pub const DEFAULT_TAG_COST: u32 = 1;
pub const DEFAULT_PROFILE: &str = "default";

/// Traversal cost per terrain tag. Unlisted tags cost `default_cost`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCostProfile {
    name: String,
    #[serde(default = "default_tag_cost")]
    default_cost: u32,
    #[serde(default)]
    costs: BTreeMap<TerrainTag, u32>,
}

fn default_tag_cost() -> u32 {
    DEFAULT_TAG_COST
}

impl TagCostProfile {
    pub fn new(name: impl Into<String>, default_cost: u32) -> Result<Self> {
        let profile = Self { name: name.into(), default_cost, costs: BTreeMap::new() };
        profile.validate()?;
        Ok(profile)
    }

    /// Builder-style override for a single tag.
    pub fn with_cost(mut self, tag: TerrainTag, cost: u32) -> Result<Self> {
        if cost == 0 {
            return Err(RouteError::InvalidProfile(format!("{}: tag {} has zero cost", self.name, tag)));
        }
        self.costs.insert(tag, cost);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RouteError::InvalidProfile("empty profile name".into()));
        }
        if self.default_cost == 0 {
            return Err(RouteError::InvalidProfile(format!("{}: default cost is zero", self.name)));
        }
        if let Some((tag, _)) = self.costs.iter().find(|(_, c)| **c == 0) {
            return Err(RouteError::InvalidProfile(format!("{}: tag {} has zero cost", self.name, tag)));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_cost(&self) -> u32 {
        self.default_cost
    }

    pub fn cost(&self, tag: TerrainTag) -> u32 {
        self.costs.get(&tag).copied().unwrap_or(self.default_cost)
    }

    /// Smallest step cost this profile can charge; scales the heuristic.
    pub fn min_cost(&self) -> u32 {
        self.costs.values().copied().fold(self.default_cost, u32::min)
    }

    pub fn default_preset() -> Self {
        Self { name: DEFAULT_PROFILE.into(), default_cost: DEFAULT_TAG_COST, costs: BTreeMap::new() }
    }

    /// Wandering creatures: stay out of tall grass and deep sand.
    pub fn wild_preset() -> Self {
        let costs = BTreeMap::from([(terrain::TALL_GRASS, 8), (terrain::DEEP_SAND, 6), (terrain::GRASS, 2)]);
        Self { name: "wild".into(), default_cost: DEFAULT_TAG_COST, costs }
    }

    /// Townsfolk: prefer roads, mildly avoid grass.
    pub fn road_preset() -> Self {
        let costs = BTreeMap::from([(terrain::ROAD, 1), (terrain::GRASS, 2), (terrain::TALL_GRASS, 3)]);
        Self { name: "road".into(), default_cost: 2, costs }
    }
}

/// Named cost profiles a request may select.
#[derive(Clone, Debug)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<TagCostProfile>>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for p in [TagCostProfile::default_preset(), TagCostProfile::wild_preset(), TagCostProfile::road_preset()] {
            registry.profiles.insert(p.name.clone(), Arc::new(p));
        }
        registry
    }
}

impl ProfileRegistry {
    pub fn empty() -> Self {
        Self { profiles: HashMap::new() }
    }

    /// Adds or replaces a profile under its own name.
    pub fn register(&mut self, profile: TagCostProfile) -> Result<()> {
        profile.validate()?;
        self.profiles.insert(profile.name.clone(), Arc::new(profile));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<TagCostProfile>> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| RouteError::UnknownProfile(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Registers every profile of a JSON array. Nothing is registered on error.
    pub fn register_json(&mut self, json: &str) -> Result<usize> {
        let parsed: Vec<TagCostProfile> =
            serde_json::from_str(json).map_err(|e| RouteError::InvalidProfile(e.to_string()))?;
        for p in &parsed {
            p.validate()?;
        }
        let n = parsed.len();
        for p in parsed {
            self.profiles.insert(p.name.clone(), Arc::new(p));
        }
        Ok(n)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
