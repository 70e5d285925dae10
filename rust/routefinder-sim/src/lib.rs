pub mod driver;
pub mod load;
pub mod scenario;

pub use driver::{run, RunSummary};
pub use scenario::Scenario;
