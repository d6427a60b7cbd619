//! Error types for the workload registry.

use thiserror::Error;

use crate::types::Phase;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur during registry operations.
///
/// Every failed mutation leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("workload already exists: {0}")]
    AlreadyExists(String),

    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("registry is at capacity ({max} workloads)")]
    CapacityExceeded { max: usize },

    #[error("illegal phase transition for {id}: {from} -> {to}")]
    IllegalTransition { id: String, from: Phase, to: Phase },

    #[error("invariant violated for {id}: {reason}")]
    Invariant { id: String, reason: String },
}
