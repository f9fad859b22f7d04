//! Forecast cache store: ordered range reads and idempotent batch merges.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use glaskugel_core::model::{ForecastPoint, Granularity};

use crate::error::StoreError;

/// Read/write access to the forecast cache tables.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Up to `limit` cached points for a category/granularity, ascending by
    /// forecast date.
    async fn read_range(
        &self,
        category_id: &str,
        granularity: Granularity,
        limit: i64,
    ) -> Result<Vec<ForecastPoint>, StoreError>;

    /// Historical forecasts for a category within a date range, ordered by
    /// model version then date.
    async fn read_history(
        &self,
        category_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ForecastPoint>, StoreError>;

    /// Write a batch of points atomically. Points sharing a
    /// `(category_id, forecast_date, granularity)` key with an existing row
    /// replace it; re-merging the same batch is a no-op beyond the replace.
    /// Either every point is durable or none is.
    async fn merge_batch(&self, points: &[ForecastPoint]) -> Result<u64, StoreError>;

    /// Cheap connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// sqlx-backed implementation over the `live_forecasts` and
/// `historical_forecasts` tables.
pub struct PgForecastStore {
    pool: PgPool,
}

impl PgForecastStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastStore for PgForecastStore {
    async fn read_range(
        &self,
        category_id: &str,
        granularity: Granularity,
        limit: i64,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let rows = sqlx::query_as::<_, ForecastPoint>(
            "SELECT model_version_id, category_id, forecast_date, predicted_sales,
                    lower_bound, upper_bound, granularity
             FROM live_forecasts
             WHERE category_id = $1 AND granularity = $2
             ORDER BY forecast_date
             LIMIT $3",
        )
        .bind(category_id)
        .bind(granularity.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn read_history(
        &self,
        category_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let rows = sqlx::query_as::<_, ForecastPoint>(
            "SELECT model_version_id, category_id, forecast_date, predicted_sales,
                    lower_bound, upper_bound, granularity
             FROM historical_forecasts
             WHERE category_id = $1 AND forecast_date BETWEEN $2 AND $3
             ORDER BY model_version_id, forecast_date",
        )
        .bind(category_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn merge_batch(&self, points: &[ForecastPoint]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for point in points {
            let result = sqlx::query(
                "INSERT INTO live_forecasts
                     (model_version_id, category_id, forecast_date, predicted_sales,
                      lower_bound, upper_bound, granularity)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (category_id, forecast_date, granularity)
                 DO UPDATE SET
                     model_version_id = EXCLUDED.model_version_id,
                     predicted_sales = EXCLUDED.predicted_sales,
                     lower_bound = EXCLUDED.lower_bound,
                     upper_bound = EXCLUDED.upper_bound",
            )
            .bind(point.model_version_id)
            .bind(&point.category_id)
            .bind(point.forecast_date)
            .bind(point.predicted_sales)
            .bind(point.lower_bound)
            .bind(point.upper_bound)
            .bind(&point.granularity)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        debug!("Merged {} forecast points into cache", written);
        Ok(written)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
