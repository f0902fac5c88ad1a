//! SimJob API Handlers
//!
//! The per-entity operation surface. Every handler is bound to one entity's
//! [`Orchestrator`] through the router state; bodies are JSON and ids travel
//! in the body.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use simjob_core::domain::job::JobSnapshot;
use simjob_core::domain::record::ParameterRecord;
use simjob_core::dto::job::{JobRef, RunAccepted, RunJob};
use simjob_core::dto::record::{CreateRecord, RecordRef};
use simjob_core::dto::response::ApiResponse;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::service::{Download, Orchestrator};

// =============================================================================
// Parameter Record Endpoints
// =============================================================================

/// POST /{entity}/create
/// Create a parameter record
pub async fn create_record(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<CreateRecord>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<ParameterRecord>>> {
    let Json(req) = payload?;
    tracing::info!("Creating {} record: {:?}", orchestrator.key(), req.name);

    let record = orchestrator.create_record(req)?;
    Ok(Json(ApiResponse::success(record)))
}

/// POST /{entity}/delete_job
/// Delete a parameter record together with its jobs
pub async fn delete_record(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<RecordRef>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Json(req) = payload?;
    tracing::info!("Deleting {} record: {:?}", orchestrator.key(), req.record_id);

    orchestrator.delete_record(req).await?;
    Ok(Json(ApiResponse::ok("Record deleted")))
}

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /{entity}/run
/// Start a simulation job for a record
pub async fn run_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<RunJob>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<RunAccepted>>> {
    let Json(req) = payload?;
    tracing::info!("Running {} job for record: {:?}", orchestrator.key(), req.record_id);

    let job_id = orchestrator.run(req)?;
    Ok(Json(ApiResponse::success(RunAccepted { job_id })))
}

/// POST /{entity}/poll
/// Current state of a job
pub async fn poll_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<JobRef>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<JobSnapshot>>> {
    let Json(req) = payload?;
    let job_id = req.job_id()?;
    tracing::debug!("Polling {} job: {}", orchestrator.key(), job_id);

    let snapshot = orchestrator.poll(job_id)?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// POST /{entity}/download
/// The rendered report as `application/pdf`, or 202 while the job runs
pub async fn download_result(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<JobRef>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let job_id = req.job_id()?;
    tracing::debug!("Downloading {} report of job: {}", orchestrator.key(), job_id);

    let response = match orchestrator.download(job_id).await? {
        Download::Ready { content, .. } => {
            let disposition = format!(
                "attachment; filename=\"{}_{}.pdf\"",
                orchestrator.key(),
                job_id
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                content,
            )
                .into_response()
        }
        Download::Pending(status) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::<()>::info(format!(
                "Job {} is {}, report not ready yet",
                job_id, status
            ))),
        )
            .into_response(),
    };
    Ok(response)
}

/// POST /{entity}/delete_result
/// Delete a job's result directory and report
pub async fn delete_result(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<JobRef>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<JobSnapshot>>> {
    let Json(req) = payload?;
    tracing::info!("Deleting {} result: {:?}", orchestrator.key(), req.job_id);

    let snapshot = orchestrator.delete_result(req).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}
