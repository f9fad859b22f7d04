//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "glaskugel API",
        version = "0.1.0",
        description = "Sales forecast gateway: serves cached forecasts and manages async generation jobs.",
    ),
    tags(
        (name = "Health", description = "Service liveness and database readiness"),
        (name = "Forecasting", description = "Cache-aside forecast reads and historical forecasts"),
        (name = "Jobs", description = "Async forecast job polling and cancellation"),
    ),
    paths(
        crate::api::health::health,
        crate::api::forecasts::get_forecast,
        crate::api::forecasts::get_forecast_history,
        crate::api::jobs::get_job,
        crate::api::jobs::list_jobs,
        crate::api::jobs::cancel_job,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::forecasts::ForecastEntry,
        crate::api::forecasts::ForecastResponse,
        crate::api::forecasts::JobAccepted,
        crate::api::forecasts::HistoricalForecast,
        crate::api::jobs::CancelResponse,
        glaskugel_core::model::Job,
        glaskugel_core::model::JobRequest,
        glaskugel_core::model::JobStatus,
        glaskugel_core::model::Granularity,
        glaskugel_core::model::ForecastPoint,
    ))
)]
pub struct ApiDoc;
