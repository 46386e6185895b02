use thiserror::Error;

use crate::core::types::{EntityId, Tick};

/// Fatal error taxonomy for the combat core.
///
/// Action validation failures are values (`ActionValidation`), never
/// errors; everything here terminates the simulation with provenance.
#[derive(Error, Debug)]
pub enum GrimError {
    #[error("timeline drained at tick {0} while the battle is still running")]
    EmptyTimeline(Tick),

    #[error("dead unit {0:?} surfaced from the timeline; a cancel call is missing")]
    DeadUnitOnTimeline(EntityId),

    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("scenario rejected: {0}")]
    ScenarioLoad(String),

    #[error("event recursion limit exceeded at depth {0}")]
    EventRecursionLimit(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GrimError>;
