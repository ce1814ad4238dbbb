//! Error types for capplan

use thiserror::Error;

use crate::types::RegionId;

/// capplan result type
pub type Result<T> = std::result::Result<T, CapacityError>;

/// Errors that abort a planning run before an outcome can be reported.
///
/// An infeasible model is *not* an error: it is one of the solver outcomes
/// and is returned through the normal result path.
#[derive(Error, Debug)]
pub enum CapacityError {
    /// Invalid planner constants or region inputs
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two regions share a name; names are the variable identity keys
    #[error("Duplicate region name: {0}")]
    DuplicateRegion(RegionId),

    /// Referenced region does not exist in the scenario
    #[error("Region {0} not found")]
    RegionNotFound(RegionId),

    /// The requested solver backend is not compiled into this build
    #[error("Solver unavailable: {0}")]
    SolverUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CapacityError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a solver-unavailable error
    pub fn solver_unavailable(msg: impl Into<String>) -> Self {
        Self::SolverUnavailable(msg.into())
    }
}
