//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/v1/forecasts/{category_id}", get(api::get_forecast))
        .route(
            "/api/v1/forecasts/{category_id}/history",
            get(api::get_forecast_history),
        )
        .route("/api/v1/jobs", get(api::list_jobs))
        .route("/api/v1/jobs/{job_id}", get(api::get_job))
        .route("/api/v1/jobs/{job_id}/cancel", post(api::cancel_job))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
