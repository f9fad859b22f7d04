//! Job status polling and the PENDING-only cancellation protocol.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use tracing::info;

use glaskugel_core::model::Job;
use glaskugel_store::CancelOutcome;

use super::{internal_error, not_found, ApiResult, ErrorResponse};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

// ── Types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    pub message: String,
}

/// Clamp a requested page size into `1..=MAX_LIST_LIMIT`.
fn effective_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

// ── Handlers ─────────────────────────────────────────────────

/// Status of one asynchronous forecast job.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    params(("job_id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job status record", body = Job),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    let job = state
        .jobs
        .get(job_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Job not found."))?;

    Ok(Json(job))
}

/// Most recent jobs, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    params(("limit" = Option<i64>, Query, description = "Number of jobs to return (default 20, max 100)")),
    responses(
        (status = 200, description = "Recent jobs ordered by creation time descending", body = Vec<Job>)
    )
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = state
        .jobs
        .list_recent(effective_limit(query.limit))
        .await
        .map_err(internal_error)?;

    Ok(Json(jobs))
}

/// Cancel a job that is still PENDING.
///
/// Uses the same conditional update as the worker's claim, so cancellation
/// and claiming are mutually exclusive: whichever commits first wins.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job_id}/cancel",
    tag = "Jobs",
    params(("job_id" = Uuid, Path, description = "Job ID to cancel")),
    responses(
        (status = 200, description = "Job cancelled", body = CancelResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 409, description = "Job is no longer PENDING", body = ErrorResponse)
    )
)]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    match state.jobs.cancel(job_id).await.map_err(internal_error)? {
        CancelOutcome::Cancelled => {
            info!("Job {} cancelled", job_id);
            Ok(Json(CancelResponse {
                message: "Job cancelled successfully.".to_string(),
            }))
        }
        CancelOutcome::NotFound => Err(not_found("Job not found.")),
        CancelOutcome::Conflict { status } => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!(
                    "Job is not in a cancellable state. Current status: {}",
                    status
                ),
            }),
        )),
    }
}
