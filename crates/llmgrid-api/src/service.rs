//! Transport-agnostic control operations.
//!
//! [`ControlApi`] owns handles to the registry and scheduler and implements
//! every operation the HTTP layer exposes. Handlers only translate between
//! HTTP and these calls.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use llmgrid_scheduler::{ScheduleOutcome, Scheduler};
use llmgrid_state::{Registry, RegistrySummary, ResourceSpec, Workload};

use crate::error::ApiResult;
use crate::spec::CreateWorkload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub orchestrator: String,
    pub workloads: usize,
    pub uptime_secs: u64,
    pub version: String,
    pub time: DateTime<Utc>,
}

/// Shared handle used by API handlers. Cheap to clone.
#[derive(Clone)]
pub struct ControlApi {
    registry: Registry,
    scheduler: Scheduler,
    defaults: ResourceSpec,
    started: Instant,
    version: String,
}

impl ControlApi {
    pub fn new(registry: Registry, scheduler: Scheduler, defaults: ResourceSpec) -> Self {
        Self {
            registry,
            scheduler,
            defaults,
            started: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Measure uptime from `started` instead of construction time.
    pub fn with_start_time(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ── Workloads ──────────────────────────────────────────────────

    pub fn create_workload(&self, spec: CreateWorkload) -> ApiResult<Workload> {
        let workload = spec.into_workload(&self.defaults, Utc::now())?;
        let stored = self.registry.put_new(workload)?;
        info!(
            workload = %stored.id,
            model = %stored.model_name,
            cpu = stored.resources.cpu,
            memory = stored.resources.memory,
            gpu = stored.resources.gpu_count,
            "workload created"
        );
        Ok(stored)
    }

    pub fn get_workload(&self, id: &str) -> ApiResult<Workload> {
        Ok(self.registry.get(id)?)
    }

    pub fn list_workloads(&self) -> Vec<Workload> {
        self.registry.list()
    }

    pub fn delete_workload(&self, id: &str) -> ApiResult<Workload> {
        let removed = self.registry.delete(id)?;
        info!(workload = %id, phase = %removed.status.phase, "workload deleted");
        Ok(removed)
    }

    pub fn schedule(&self, id: &str) -> ApiResult<ScheduleOutcome> {
        Ok(self.scheduler.schedule(id)?)
    }

    // ── Observability ──────────────────────────────────────────────

    pub fn aggregate_metrics(&self) -> RegistrySummary {
        self.registry.summary()
    }

    pub fn prometheus(&self) -> String {
        llmgrid_metrics::render_prometheus(&self.registry.list())
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            version: self.version.clone(),
            time: Utc::now(),
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            orchestrator: "running".to_string(),
            workloads: self.registry.len(),
            uptime_secs: self.started.elapsed().as_secs(),
            version: self.version.clone(),
            time: Utc::now(),
        }
    }
}
