//! REST API handlers.
//!
//! Each handler calls into [`ControlApi`] and wraps the result in the
//! `{success, data, error}` envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::service::ControlApi;
use crate::spec::CreateWorkload;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        })
    }
}

fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::InvalidSpec(_) => StatusCode::BAD_REQUEST,
        ApiError::AlreadyExists(_) | ApiError::InvalidState(_) => StatusCode::CONFLICT,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            status_for(&self),
            Json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(self.to_string()),
                kind: Some(self.kind()),
            }),
        )
            .into_response()
    }
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidSpec(rejection.body_text())
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
pub async fn health(State(api): State<ControlApi>) -> impl IntoResponse {
    ApiResponse::ok(api.health())
}

/// GET /status
pub async fn status(State(api): State<ControlApi>) -> impl IntoResponse {
    ApiResponse::ok(api.status())
}

// ── Workloads ──────────────────────────────────────────────────

/// GET /workloads
pub async fn list_workloads(State(api): State<ControlApi>) -> impl IntoResponse {
    ApiResponse::ok(api.list_workloads())
}

/// GET /workloads/{id}
pub async fn get_workload(State(api): State<ControlApi>, Path(id): Path<String>) -> Response {
    match api.get_workload(&id) {
        Ok(w) => ApiResponse::ok(w).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /workloads
pub async fn create_workload(
    State(api): State<ControlApi>,
    body: Result<Json<CreateWorkload>, JsonRejection>,
) -> Response {
    let spec = match body {
        Ok(Json(spec)) => spec,
        Err(rejection) => return invalid_body(rejection).into_response(),
    };
    match api.create_workload(spec) {
        Ok(w) => (StatusCode::CREATED, ApiResponse::ok(w)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /workloads/{id}
pub async fn delete_workload(State(api): State<ControlApi>, Path(id): Path<String>) -> Response {
    match api.delete_workload(&id) {
        Ok(_) => ApiResponse::ok("deleted").into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Scheduling ─────────────────────────────────────────────────

/// Schedule request body.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(alias = "workloadId")]
    pub id: String,
}

/// POST /schedule
pub async fn schedule(
    State(api): State<ControlApi>,
    body: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return invalid_body(rejection).into_response(),
    };
    match api.schedule(&req.id) {
        Ok(outcome) => ApiResponse::ok(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Metrics ────────────────────────────────────────────────────

/// GET /metrics
pub async fn aggregate_metrics(State(api): State<ControlApi>) -> impl IntoResponse {
    ApiResponse::ok(api.aggregate_metrics())
}

/// GET /metrics/prometheus
pub async fn prometheus_metrics(State(api): State<ControlApi>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        api.prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use llmgrid_placement::{GpuFirst, StaticCluster};
    use llmgrid_scheduler::Scheduler;
    use llmgrid_state::{Registry, ResourceSpec};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::build_router;

    use super::*;

    fn test_api(max: usize, nodes: Option<Vec<(String, ResourceSpec)>>) -> ControlApi {
        let registry = Registry::new(max);
        let cluster = match nodes {
            Some(nodes) => StaticCluster::new(nodes),
            None => StaticCluster::synthetic(),
        };
        let scheduler = Scheduler::new(registry.clone(), Arc::new(cluster), Arc::new(GpuFirst));
        ControlApi::new(registry, scheduler, ResourceSpec::new(1000, 2 << 30, 0))
    }

    async fn call(api: &ControlApi, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = build_router(api.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_is_healthy() {
        let api = test_api(10, None);
        let (status, body) = call(&api, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
    }

    #[tokio::test]
    async fn create_returns_created_record() {
        let api = test_api(10, None);
        let (status, body) = call(
            &api,
            "POST",
            "/workloads",
            Some(json!({"id": "a", "model_name": "llama-7b", "resources": {"gpu": 1}})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["id"], "a");
        assert_eq!(body["data"]["status"]["phase"], "pending");
        assert_eq!(body["data"]["resources"]["gpu_count"], 1);
        assert_eq!(body["data"]["resources"]["cpu"], 1000);
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_spec() {
        let api = test_api(10, None);
        let req = Request::builder()
            .method("POST")
            .uri("/workloads")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = build_router(api).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "InvalidSpec");
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let api = test_api(10, None);
        call(&api, "POST", "/workloads", Some(json!({"id": "dup"}))).await;
        let (status, body) = call(&api, "POST", "/workloads", Some(json!({"id": "dup"}))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "AlreadyExists");
        assert_eq!(api.list_workloads().len(), 1);
    }

    #[tokio::test]
    async fn capacity_exceeded_is_unavailable() {
        let api = test_api(1, None);
        call(&api, "POST", "/workloads", Some(json!({"id": "x"}))).await;
        let (status, body) = call(&api, "POST", "/workloads", Some(json!({"id": "y"}))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "CapacityExceeded");
    }

    #[tokio::test]
    async fn get_and_delete_unknown_are_not_found() {
        let api = test_api(10, None);
        let (status, _) = call(&api, "GET", "/workloads/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = call(&api, "DELETE", "/workloads/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "NotFound");
    }

    #[tokio::test]
    async fn schedule_accepts_workload_id_alias() {
        let api = test_api(10, None);
        call(&api, "POST", "/workloads", Some(json!({"id": "a"}))).await;

        let (status, body) = call(&api, "POST", "/schedule", Some(json!({"workloadId": "a"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["node"], "node-1");
        assert_eq!(body["data"]["status"], "scheduled");

        let (status, body) = call(&api, "POST", "/schedule", Some(json!({"id": "a"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "InvalidState");
    }

    #[tokio::test]
    async fn rejected_placement_is_unprocessable() {
        let api = test_api(10, Some(vec![("cpu-only".into(), ResourceSpec::new(8000, 32 << 30, 0))]));
        call(&api, "POST", "/workloads", Some(json!({"id": "b", "resources": {"gpu": 1}}))).await;

        let (status, body) = call(&api, "POST", "/schedule", Some(json!({"id": "b"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "Rejected");
        assert!(body["error"].as_str().unwrap().contains("insufficient gpu"));
    }

    #[tokio::test]
    async fn aggregate_metrics_lists_every_phase() {
        let api = test_api(10, None);
        call(&api, "POST", "/workloads", Some(json!({"id": "a"}))).await;

        let (status, body) = call(&api, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        for phase in ["pending", "scheduled", "running", "failed", "completed"] {
            assert!(body["data"]["by_phase"].get(phase).is_some(), "{phase}");
        }
        assert_eq!(body["data"]["by_phase"]["pending"], 1);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let api = test_api(10, None);
        let req = Request::builder()
            .uri("/metrics/prometheus")
            .body(Body::empty())
            .unwrap();
        let resp = build_router(api).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
