use thiserror::Error;

use crate::models::ActorId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("unknown tag profile: {0}")]
    UnknownProfile(String),
    #[error("invalid tag profile: {0}")]
    InvalidProfile(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("tries must be at least 1")]
    InvalidTries,
    #[error("{0} must be positive")]
    InvalidBudget(&'static str),
    #[error("invalid map: {0}")]
    InvalidMap(String),
    #[error("corrupt request record: {0}")]
    CorruptRecord(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;
