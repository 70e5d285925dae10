use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use routefinder_core::{GridMap, MapFile};

pub fn load_map_json(path: &Path) -> Result<GridMap> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let file: MapFile = serde_json::from_str(&text).with_context(|| format!("invalid map file {:?}", path))?;
    let map = GridMap::from_map_file(&file).with_context(|| format!("invalid map in {:?}", path))?;
    Ok(map)
}
