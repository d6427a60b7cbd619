//! Create-workload request body and its admission into a [`Workload`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use llmgrid_core::QuantityValue;
use llmgrid_state::{ResourceSpec, Workload};

use crate::error::{ApiError, ApiResult};

/// Requested resources. Omitted fields take the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub cpu: Option<QuantityValue>,
    #[serde(default)]
    pub memory: Option<QuantityValue>,
    #[serde(default, alias = "gpu_count")]
    pub gpu: Option<i64>,
}

impl ResourceRequest {
    pub fn resolve(&self, defaults: &ResourceSpec) -> ApiResult<ResourceSpec> {
        let cpu = match &self.cpu {
            Some(q) => q.cpu_millis()?,
            None => defaults.cpu,
        };
        let memory = match &self.memory {
            Some(q) => q.memory_bytes()?,
            None => defaults.memory,
        };
        let gpu_count = match self.gpu {
            Some(n) => u32::try_from(n)
                .map_err(|_| ApiError::InvalidSpec(format!("gpu count out of range: {n}")))?,
            None => defaults.gpu_count,
        };
        Ok(ResourceSpec::new(cpu, memory, gpu_count))
    }
}

/// Body of `POST /workloads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateWorkload {
    pub id: Option<String>,
    pub name: String,
    pub model_name: String,
    pub model_type: String,
    pub resources: ResourceRequest,
    pub replicas: Option<i64>,
    pub labels: HashMap<String, String>,
}

impl CreateWorkload {
    /// Build the pending record admitted into the registry.
    pub fn into_workload(self, defaults: &ResourceSpec, now: DateTime<Utc>) -> ApiResult<Workload> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => generate_id(),
        };
        let replicas = match self.replicas {
            None => 1,
            Some(n) if n >= 1 => u32::try_from(n)
                .map_err(|_| ApiError::InvalidSpec(format!("replicas out of range: {n}")))?,
            Some(n) => {
                return Err(ApiError::InvalidSpec(format!(
                    "replicas must be at least 1, got {n}"
                )));
            }
        };
        let resources = self.resources.resolve(defaults)?;

        let mut workload = Workload::new(id, resources, now);
        workload.name = self.name;
        workload.model_name = self.model_name;
        workload.model_type = self.model_type;
        workload.labels = self.labels;
        workload.status.replicas = replicas;
        Ok(workload)
    }
}

/// A fresh `wl-<uuid>` identifier.
pub fn generate_id() -> String {
    format!("wl-{}", Uuid::new_v4())
}
