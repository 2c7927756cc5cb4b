use super::coordinator::Coordinator;
use super::protocol::*;
use crate::error::AnalyzerError;
use crate::ledger::types::now_ms;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

/// Builds the coordinator's HTTP surface.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_REGISTER, post(handle_register_worker))
        .route(ENDPOINT_HEARTBEAT, post(handle_heartbeat))
        .route(ENDPOINT_REQUEST_ASSIGNMENT, post(handle_request_assignment))
        .route(ENDPOINT_SUBMIT_RESULTS, post(handle_submit_results))
        .route(ENDPOINT_JOB, post(handle_start_job))
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(ENDPOINT_REPORT, get(handle_report))
        .layer(Extension(coordinator))
}

fn rejected(err: AnalyzerError) -> (StatusCode, Json<AckResponse>) {
    (err.status_code(), Json(AckResponse::error(err.to_string())))
}

pub async fn handle_register_worker(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<WorkerRequest>,
) -> (StatusCode, Json<AckResponse>) {
    let worker_id = req.worker_id;

    match coordinator.register_worker(worker_id.clone(), now_ms()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AckResponse::ok(format!("Worker {} registered", worker_id))),
        ),
        Err(e) => {
            tracing::warn!("Registration of {} rejected: {}", worker_id, e);
            rejected(e)
        }
    }
}

pub async fn handle_heartbeat(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<WorkerRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match coordinator.heartbeat(&req.worker_id, now_ms()).await {
        Ok(()) => (StatusCode::OK, Json(AckResponse::ok("alive"))),
        Err(e) => rejected(e),
    }
}

pub async fn handle_request_assignment(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<WorkerRequest>,
) -> Result<Json<AssignmentResponse>, (StatusCode, Json<AckResponse>)> {
    coordinator
        .request_assignment(&req.worker_id, now_ms())
        .await
        .map(Json)
        .map_err(rejected)
}

pub async fn handle_submit_results(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<Json<SubmitResultResponse>, (StatusCode, Json<AckResponse>)> {
    tracing::debug!(
        "Received results for chunk {} from {}",
        req.chunk_id,
        req.worker_id
    );

    coordinator
        .submit_result(&req.worker_id, req.chunk_id, req.metrics)
        .await
        .map(Json)
        .map_err(rejected)
}

pub async fn handle_start_job(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<StartJobRequest>,
) -> Result<Json<StartJobResponse>, (StatusCode, Json<AckResponse>)> {
    coordinator
        .start_job(req.path, req.chunk_count)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to start job: {}", e);
            rejected(e)
        })
}

pub async fn handle_status(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<StatusResponse> {
    Json(coordinator.status().await)
}

pub async fn handle_report(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> (StatusCode, Json<ReportResponse>) {
    match coordinator.report().await {
        Ok(report) => (
            StatusCode::OK,
            Json(ReportResponse {
                report: Some(report),
                message: "complete".to_string(),
            }),
        ),
        Err(e) => (
            e.status_code(),
            Json(ReportResponse {
                report: None,
                message: e.to_string(),
            }),
        ),
    }
}
