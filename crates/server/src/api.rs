//! HTTP handlers and shared response helpers.

use axum::Json;
use serde::Serialize;

pub mod doc;
pub mod forecasts;
pub mod health;
pub mod jobs;

pub use forecasts::{get_forecast, get_forecast_history};
pub use health::health;
pub use jobs::{cancel_job, get_job, list_jobs};

// ── Error plumbing ────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiResult<T> = Result<T, (axum::http::StatusCode, Json<ErrorResponse>)>;

pub(crate) fn internal_error(
    e: impl std::fmt::Display,
) -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

pub(crate) fn not_found(msg: impl Into<String>) -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(ErrorResponse { error: msg.into() }),
    )
}
