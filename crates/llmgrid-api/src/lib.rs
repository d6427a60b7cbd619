//! llmgrid-api — control API for LLMGrid.
//!
//! [`ControlApi`] implements the operations; [`build_router`] binds them to
//! axum routes.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness and version |
//! | GET | `/status` | Uptime and workload count |
//! | GET | `/metrics` | Workload counts by phase |
//! | GET | `/metrics/prometheus` | Prometheus exposition |
//! | GET | `/workloads` | List all workloads |
//! | POST | `/workloads` | Create a workload |
//! | GET | `/workloads/{id}` | Get workload details |
//! | DELETE | `/workloads/{id}` | Delete a workload |
//! | POST | `/schedule` | Place a pending workload |

pub mod error;
pub mod handlers;
pub mod service;
pub mod spec;

use axum::Router;
use axum::routing::{get, post};

pub use error::{ApiError, ApiResult};
pub use service::{ControlApi, HealthReport, StatusReport};
pub use spec::{CreateWorkload, ResourceRequest};

/// Build the complete API router.
pub fn build_router(api: ControlApi) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/metrics", get(handlers::aggregate_metrics))
        .route("/metrics/prometheus", get(handlers::prometheus_metrics))
        .route(
            "/workloads",
            get(handlers::list_workloads).post(handlers::create_workload),
        )
        .route(
            "/workloads/{id}",
            get(handlers::get_workload).delete(handlers::delete_workload),
        )
        .route("/schedule", post(handlers::schedule))
        .with_state(api)
}
