//! HTTP client for the downstream forecasting engine.
//!
//! The engine exposes one operation the worker cares about: generate `count`
//! additional forecast points for a category at a given granularity. The
//! call is the worker's main suspension point and is bounded by a request
//! timeout; a transport error or non-success response is reported as a typed
//! failure that the worker records on the job.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use glaskugel_core::config::GeneratorConfig;
use glaskugel_core::model::{ForecastPoint, Granularity};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// One point produced by the engine's generate-delta endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedPoint {
    pub model_version_id: i64,
    pub category_id: String,
    pub forecast_date: NaiveDate,
    pub predicted_sales: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub granularity: String,
}

impl From<GeneratedPoint> for ForecastPoint {
    fn from(p: GeneratedPoint) -> Self {
        ForecastPoint {
            model_version_id: p.model_version_id,
            category_id: p.category_id,
            forecast_date: p.forecast_date,
            predicted_sales: p.predicted_sales,
            lower_bound: p.lower_bound,
            upper_bound: p.upper_bound,
            granularity: p.granularity,
        }
    }
}

/// Downstream "generate additional forecast points" operation.
#[async_trait]
pub trait DeltaGenerator: Send + Sync {
    async fn generate_delta(
        &self,
        category_id: &str,
        granularity: Granularity,
        count: i64,
    ) -> Result<Vec<GeneratedPoint>, GeneratorError>;
}

/// reqwest-backed client for the forecasting engine.
pub struct HttpDeltaGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeltaGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DeltaGenerator for HttpDeltaGenerator {
    async fn generate_delta(
        &self,
        category_id: &str,
        granularity: Granularity,
        count: i64,
    ) -> Result<Vec<GeneratedPoint>, GeneratorError> {
        let url = format!(
            "{}/forecasts/{}/generate-delta?count={}&granularity={}",
            self.base_url, category_id, count, granularity
        );

        debug!("Generate-delta request to {}", url);

        let response = self.client.post(&url).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api { status, body });
        }

        let points: Vec<GeneratedPoint> = response.json().await?;
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_point_decodes_engine_payload() {
        let json = r#"{
            "model_version_id": 7,
            "category_id": "CAT_01",
            "forecast_date": "2025-06-14",
            "predicted_sales": 1234.5,
            "lower_bound": 1100.0,
            "upper_bound": 1370.25,
            "granularity": "daily"
        }"#;

        let point: GeneratedPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.model_version_id, 7);
        assert_eq!(
            point.forecast_date,
            NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
        );

        let cached: ForecastPoint = point.into();
        assert_eq!(cached.category_id, "CAT_01");
        assert_eq!(cached.granularity, "daily");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = GeneratorConfig {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        };
        let gen = HttpDeltaGenerator::new(&config).unwrap();
        assert_eq!(gen.base_url, "http://localhost:8000");
    }
}
