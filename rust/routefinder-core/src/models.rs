//! Shared value types: directions, actor ids, motion snapshots and tile tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Terrain classification id of a tile. Drives traversal cost only.
pub type TerrainTag = u8;

/// Well-known terrain tag ids used by the built-in cost profiles.
pub mod terrain {
    use super::TerrainTag;

    pub const PLAIN: TerrainTag = 0;
    pub const GRASS: TerrainTag = 1;
    pub const TALL_GRASS: TerrainTag = 2;
    pub const SAND: TerrainTag = 3;
    pub const DEEP_SAND: TerrainTag = 4;
    pub const WATER: TerrainTag = 5;
    pub const ICE: TerrainTag = 6;
    pub const ROAD: TerrainTag = 7;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cardinal step direction. Screen coordinates: north decreases `y`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Deterministic successor order used by the search.
    pub const ORDER: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub const fn bit(self) -> u8 {
        match self {
            Direction::North => 1 << 0,
            Direction::East => 1 << 1,
            Direction::South => 1 << 2,
            Direction::West => 1 << 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }

    pub const fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::Vertical,
            Direction::East | Direction::West => Axis::Horizontal,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "n" | "up" => Ok(Direction::North),
            "east" | "e" | "right" => Ok(Direction::East),
            "south" | "s" | "down" => Ok(Direction::South),
            "west" | "w" | "left" => Ok(Direction::West),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// Bit mask with every direction allowed.
pub const ALL_DIRECTIONS: u8 = 0b1111;

/// Decode a comma-separated list of direction tokens (case-insensitive) or a
/// decimal mask. Unknown tokens are ignored; empty input yields 0.
pub fn decode_direction_mask(s: Option<&str>) -> u8 {
    let Some(raw) = s else { return 0; };
    let stripped = raw.trim();
    if stripped.is_empty() {
        return 0;
    }
    if let Ok(n) = stripped.parse::<u8>() {
        return n & ALL_DIRECTIONS;
    }
    stripped
        .split(',')
        .filter_map(|part| part.parse::<Direction>().ok())
        .fold(0, |mask, dir| mask | dir.bit())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn allows(self, dir: Direction) -> bool {
        dir.axis() == self
    }
}

/// Per-tile movement behaviour, independent of the terrain cost tag.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemTag {
    #[default]
    None,
    /// Requires surfing to enter.
    Water,
    /// Keeps the mover sliding in its heading until blocked.
    Ice,
    /// Conveyor pushing the mover in the given direction.
    Rapid(Direction),
    /// One-way ledge: stepping onto it in its direction jumps one extra tile.
    Ledge(Direction),
    /// Stair tile: entering it horizontally shifts the landing row.
    Slope(i32),
    /// Bridge deck spanning the given axis.
    Bridge(Axis),
    /// Bridge end: entering it along the axis climbs onto the deck.
    BridgeRamp(Axis),
}

impl FromStr for SystemTag {
    type Err = String;

    /// Parses `none`, `water`, `ice`, `rapid:<dir>`, `ledge:<dir>`,
    /// `slope:<dy>`, `bridge:<axis>` and `ramp:<axis>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let (kind, arg) = match raw.split_once(':') {
            Some((k, a)) => (k.trim(), Some(a.trim())),
            None => (raw.as_str(), None),
        };
        let axis = |a: Option<&str>| match a {
            Some("horizontal") | Some("h") => Ok(Axis::Horizontal),
            Some("vertical") | Some("v") => Ok(Axis::Vertical),
            other => Err(format!("bad axis {other:?} in '{s}'")),
        };
        let dir = |a: Option<&str>| {
            a.ok_or_else(|| format!("missing direction in '{s}'"))
                .and_then(|d| d.parse::<Direction>())
        };
        match kind {
            "" | "none" => Ok(SystemTag::None),
            "water" => Ok(SystemTag::Water),
            "ice" => Ok(SystemTag::Ice),
            "rapid" => dir(arg).map(SystemTag::Rapid),
            "ledge" => dir(arg).map(SystemTag::Ledge),
            "slope" => arg
                .and_then(|a| a.parse::<i32>().ok())
                .map(SystemTag::Slope)
                .ok_or_else(|| format!("bad slope offset in '{s}'")),
            "bridge" => axis(arg).map(SystemTag::Bridge),
            "ramp" => axis(arg).map(SystemTag::BridgeRamp),
            other => Err(format!("unknown system tag '{other}'")),
        }
    }
}

/// Position plus the movement flags that change how the next step resolves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionState {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub on_bridge: bool,
    #[serde(default)]
    pub sliding: bool,
    #[serde(default)]
    pub surfing: bool,
}

impl MotionState {
    pub const fn at(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, on_bridge: false, sliding: false, surfing: false }
    }

    pub const fn surfing_at(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, on_bridge: false, sliding: false, surfing: true }
    }

    pub fn state_bits(&self) -> u8 {
        (self.on_bridge as u8) | ((self.sliding as u8) << 1) | ((self.surfing as u8) << 2)
    }

    pub fn same_tile(&self, other: &MotionState) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }
}

/// Retry allowance of a request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tries {
    Finite(u32),
    Unlimited,
}

impl Tries {
    pub fn remain(&self) -> bool {
        match self {
            Tries::Finite(n) => *n > 0,
            Tries::Unlimited => true,
        }
    }

    pub fn consume(&mut self) {
        if let Tries::Finite(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

pub fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> u32 {
    ax.abs_diff(bx) + ay.abs_diff(by)
}

pub fn chebyshev(ax: i32, ay: i32, bx: i32, by: i32) -> u32 {
    ax.abs_diff(bx).max(ay.abs_diff(by))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_clockwise_from_north() {
        let names: Vec<&str> = Direction::ORDER.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["north", "east", "south", "west"]);
    }

    #[test]
    fn decode_mask_from_tokens_or_decimal() {
        assert_eq!(decode_direction_mask(Some("north, west")), Direction::North.bit() | Direction::West.bit());
        assert_eq!(decode_direction_mask(Some("5")), Direction::North.bit() | Direction::South.bit());
        // Unknown tokens ignored
        assert_eq!(decode_direction_mask(Some("east,sideways")), Direction::East.bit());
        assert_eq!(decode_direction_mask(Some("   ")), 0);
        assert_eq!(decode_direction_mask(None), 0);
    }

    #[test]
    fn system_tag_parses_arguments() {
        assert_eq!("ice".parse::<SystemTag>().unwrap(), SystemTag::Ice);
        assert_eq!("rapid:east".parse::<SystemTag>().unwrap(), SystemTag::Rapid(Direction::East));
        assert_eq!("ledge: S".parse::<SystemTag>().unwrap(), SystemTag::Ledge(Direction::South));
        assert_eq!("slope:-1".parse::<SystemTag>().unwrap(), SystemTag::Slope(-1));
        assert_eq!("ramp:v".parse::<SystemTag>().unwrap(), SystemTag::BridgeRamp(Axis::Vertical));
        assert!("rapid".parse::<SystemTag>().is_err());
        assert!("lava".parse::<SystemTag>().is_err());
    }

    #[test]
    fn tries_only_decrement_when_finite() {
        let mut t = Tries::Finite(1);
        assert!(t.remain());
        t.consume();
        assert_eq!(t, Tries::Finite(0));
        assert!(!t.remain());
        t.consume();
        assert_eq!(t, Tries::Finite(0));

        let mut u = Tries::Unlimited;
        u.consume();
        assert_eq!(u, Tries::Unlimited);
        assert!(u.remain());
    }

    #[test]
    fn state_bits_are_distinct() {
        let mut m = MotionState::at(0, 0, 0);
        assert_eq!(m.state_bits(), 0);
        m.surfing = true;
        m.on_bridge = true;
        assert_eq!(m.state_bits(), 0b101);
    }
}
