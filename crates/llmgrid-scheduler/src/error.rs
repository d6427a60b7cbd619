//! Scheduler error types.

use thiserror::Error;

use llmgrid_state::{Phase, RegistryError};

/// Errors that can occur during scheduling operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("workload {id} is {phase}, only pending workloads can be scheduled")]
    InvalidState { id: String, phase: Phase },

    #[error("placement rejected: {0}")]
    Rejected(String),

    #[error("registry error: {0}")]
    Registry(RegistryError),
}

impl From<RegistryError> for SchedulerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => SchedulerError::NotFound(id),
            other => SchedulerError::Registry(other),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
