//! Cache-aside forecast read path and historical forecast lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use tracing::info;

use glaskugel_core::model::{ForecastPoint, Granularity, JobRequest};

use super::{bad_request, internal_error, ApiResult, ErrorResponse};
use crate::state::AppState;

// ── Types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub forecast_horizon: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ForecastEntry {
    pub forecast_date: NaiveDate,
    pub predicted_sales: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl From<ForecastPoint> for ForecastEntry {
    fn from(p: ForecastPoint) -> Self {
        ForecastEntry {
            forecast_date: p.forecast_date,
            predicted_sales: p.predicted_sales,
            lower_bound: p.lower_bound,
            upper_bound: p.upper_bound,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ForecastResponse {
    pub category_id: String,
    pub forecast: Vec<ForecastEntry>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobAccepted {
    pub message: String,
    pub job_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HistoricalForecast {
    pub model_version_id: i64,
    pub forecasts: Vec<ForecastEntry>,
}

// ── Handlers ─────────────────────────────────────────────────

/// Serve a forecast from the cache, or enqueue an async generation job for
/// the shortfall.
///
/// Full cache hit returns exactly `period` points ascending by date. A miss
/// or partial hit enqueues one PENDING job with `count = period - cached`
/// and answers 202 with the job id.
#[utoipa::path(
    get,
    path = "/api/v1/forecasts/{category_id}",
    tag = "Forecasting",
    params(
        ("category_id" = String, Path, description = "Category ID (e.g., CAT_01)"),
        ("forecast_horizon" = String, Query, description = "daily, monthly, or yearly"),
        ("period" = i64, Query, description = "Number of periods to forecast (> 0)")
    ),
    responses(
        (status = 200, description = "Forecast served from cache", body = ForecastResponse),
        (status = 202, description = "Asynchronous generation job created", body = JobAccepted),
        (status = 400, description = "Invalid period or forecast_horizon", body = ErrorResponse)
    )
)]
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<Response> {
    // Validate before any store access.
    let period: i64 = query
        .period
        .as_deref()
        .and_then(|p| p.parse().ok())
        .filter(|p| *p > 0)
        .ok_or_else(|| bad_request("Invalid 'period' parameter."))?;

    let granularity: Granularity = query
        .forecast_horizon
        .as_deref()
        .and_then(|h| h.parse().ok())
        .ok_or_else(|| bad_request("Invalid 'forecast_horizon'."))?;

    let mut points = state
        .forecasts
        .read_range(&category_id, granularity, period)
        .await
        .map_err(internal_error)?;

    if points.len() as i64 >= period {
        info!(
            "Full cache hit for category {}: returning {} points",
            category_id, period
        );
        points.truncate(period as usize);
        let response = ForecastResponse {
            category_id,
            forecast: points.into_iter().map(Into::into).collect(),
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    let shortfall = period - points.len() as i64;
    let request = JobRequest {
        granularity,
        count: shortfall,
    };
    let job = state
        .jobs
        .enqueue(&category_id, &request)
        .await
        .map_err(internal_error)?;

    info!(
        "Cache miss for category {} ({} of {} cached): created job {}",
        category_id,
        points.len(),
        period,
        job.job_id
    );

    let accepted = JobAccepted {
        message: "Forecast not available in cache. An asynchronous job has been created."
            .to_string(),
        job_id: job.job_id,
    };
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

/// Historical forecasts for a category within a date range, grouped by the
/// model version that generated them.
#[utoipa::path(
    get,
    path = "/api/v1/forecasts/{category_id}/history",
    tag = "Forecasting",
    params(
        ("category_id" = String, Path, description = "Category ID"),
        ("start_date" = String, Query, description = "Start date (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "End date (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Historical forecasts grouped by model version", body = Vec<HistoricalForecast>),
        (status = 400, description = "Invalid date parameters", body = ErrorResponse)
    )
)]
pub async fn get_forecast_history(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoricalForecast>>> {
    let start_date = parse_date(query.start_date.as_deref())
        .ok_or_else(|| bad_request("Invalid 'start_date' parameter."))?;
    let end_date = parse_date(query.end_date.as_deref())
        .ok_or_else(|| bad_request("Invalid 'end_date' parameter."))?;

    let rows = state
        .forecasts
        .read_history(&category_id, start_date, end_date)
        .await
        .map_err(internal_error)?;

    // Group by model version; BTreeMap keeps the output ordering stable.
    let mut grouped: BTreeMap<i64, Vec<ForecastEntry>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.model_version_id)
            .or_default()
            .push(row.into());
    }

    let response = grouped
        .into_iter()
        .map(|(model_version_id, forecasts)| HistoricalForecast {
            model_version_id,
            forecasts,
        })
        .collect();

    Ok(Json(response))
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?, "%Y-%m-%d").ok()
}
