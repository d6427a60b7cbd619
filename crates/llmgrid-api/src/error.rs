//! Control API error types.

use thiserror::Error;

use llmgrid_core::QuantityError;
use llmgrid_scheduler::SchedulerError;
use llmgrid_state::RegistryError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to API callers. Each carries a stable [`kind`](ApiError::kind).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid workload spec: {0}")]
    InvalidSpec(String),

    #[error("workload already exists: {0}")]
    AlreadyExists(String),

    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("workload limit reached: {0}")]
    CapacityExceeded(String),

    #[error("placement rejected: {0}")]
    Rejected(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidSpec(_) => "InvalidSpec",
            ApiError::AlreadyExists(_) => "AlreadyExists",
            ApiError::NotFound(_) => "NotFound",
            ApiError::InvalidState(_) => "InvalidState",
            ApiError::CapacityExceeded(_) => "CapacityExceeded",
            ApiError::Rejected(_) => "Rejected",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(id) => ApiError::AlreadyExists(id),
            RegistryError::NotFound(id) => ApiError::NotFound(id),
            e @ RegistryError::CapacityExceeded { .. } => ApiError::CapacityExceeded(e.to_string()),
            e @ RegistryError::IllegalTransition { .. } => ApiError::InvalidState(e.to_string()),
            e @ RegistryError::Invariant { .. } => ApiError::InvalidSpec(e.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NotFound(id) => ApiError::NotFound(id),
            e @ SchedulerError::InvalidState { .. } => ApiError::InvalidState(e.to_string()),
            SchedulerError::Rejected(reason) => ApiError::Rejected(reason),
            SchedulerError::Registry(e) => e.into(),
        }
    }
}

impl From<QuantityError> for ApiError {
    fn from(err: QuantityError) -> Self {
        ApiError::InvalidSpec(err.to_string())
    }
}
