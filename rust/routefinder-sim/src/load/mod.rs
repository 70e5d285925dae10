pub mod json;
pub mod sqlite;

pub use json::load_map_json;
pub use sqlite::{load_map, open_read_only};
