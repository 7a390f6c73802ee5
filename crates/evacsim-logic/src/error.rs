//! Crate-wide error type.
//!
//! Only configuration problems are reported here. Numerical degeneracies
//! inside a run (coincident agents, exploding forces) are not checked per
//! step; they surface as non-finite values in the trajectory.

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A wall segment whose endpoints coincide.
    #[error("wall #{index} has zero length")]
    DegenerateWall { index: usize },

    /// Room description that violates the geometry contract.
    #[error("invalid room: {0}")]
    InvalidRoom(String),

    /// The spawn zone cannot hold the requested population.
    #[error(
        "too many people: agents need {required:.2} area units but the spawn zone allows {available:.2}; \
         change the size of the room/spawn zone or the number of people"
    )]
    SpawnAreaTooSmall { required: f64, available: f64 },

    /// Rejection sampling could not place an agent.
    #[error("could not place agent #{agent} after {attempts} attempts")]
    SpawnFailed { agent: usize, attempts: usize },

    /// Malformed JSON configuration.
    #[error(transparent)]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
