pub mod budget;
pub mod cost;
pub mod cursor;
pub mod error;
pub mod grid;
pub mod models;
pub mod movement;
pub mod options;
pub mod request;
pub mod scheduler;
pub mod search;
pub mod storage;
pub mod target;
pub mod world;

pub use cost::{ProfileRegistry, TagCostProfile};
pub use error::{Result, RouteError};
pub use grid::{GridActor, GridMap, MapFile};
pub use models::{ActorId, Direction, MotionState, SystemTag, Tries};
pub use options::EngineOptions;
pub use request::{Outcome, RequestState};
pub use scheduler::{Scheduler, TickReport};
pub use storage::SchedulerRecord;
pub use target::{Side, TargetSpec};
pub use world::{ActorHost, TileMap};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
