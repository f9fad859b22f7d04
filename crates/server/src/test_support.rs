//! In-memory trait implementations backing the worker and router tests.
//!
//! `MemoryLedger` enforces the same conditional transitions as the SQL
//! ledger (claim and cancel both require PENDING, finalize requires
//! RUNNING), with a mutex standing in for the database's row locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Uuid;

use glaskugel_core::model::{
    ClaimedJob, ForecastPoint, Granularity, Job, JobRequest, JobStatus,
};
use glaskugel_generator::{DeltaGenerator, GeneratedPoint, GeneratorError};
use glaskugel_store::{CancelOutcome, ForecastStore, JobLedger, StoreError};

use crate::state::AppState;

// ── Fixtures ─────────────────────────────────────────────────

pub(crate) fn daily_point(category_id: &str, date: &str, value: f64) -> ForecastPoint {
    ForecastPoint {
        model_version_id: 1,
        category_id: category_id.to_string(),
        forecast_date: date.parse().unwrap(),
        predicted_sales: value,
        lower_bound: value * 0.9,
        upper_bound: value * 1.1,
        granularity: Granularity::Daily.as_str().to_string(),
    }
}

pub(crate) fn generated_point(category_id: &str, date: &str, value: f64) -> GeneratedPoint {
    GeneratedPoint {
        model_version_id: 1,
        category_id: category_id.to_string(),
        forecast_date: date.parse().unwrap(),
        predicted_sales: value,
        lower_bound: value * 0.9,
        upper_bound: value * 1.1,
        granularity: Granularity::Daily.as_str().to_string(),
    }
}

pub(crate) fn state_with(
    jobs: Arc<MemoryLedger>,
    forecasts: Arc<MemoryForecastStore>,
    generator: Arc<MockGenerator>,
) -> Arc<AppState> {
    Arc::new(AppState {
        forecasts,
        jobs,
        generator,
    })
}

// ── Job ledger ───────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MemoryLedger {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryLedger {
    pub(crate) fn job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.job_id == job_id)
            .cloned()
    }

    pub(crate) fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Insert a PENDING row with arbitrary request params, bypassing the
    /// typed enqueue path.
    pub(crate) fn insert_raw(&self, category_id: &str, params: serde_json::Value) -> Uuid {
        let job_id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.lock().unwrap().push(Job {
            job_id,
            category_id: category_id.to_string(),
            request_params: params,
            status: JobStatus::Pending.as_str().to_string(),
            error_message: None,
            created_at: now,
            updated_at: now,
        });
        job_id
    }

    fn finalize(&self, job_id: Uuid, status: JobStatus, error: Option<&str>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs
            .iter_mut()
            .find(|j| j.job_id == job_id && j.status == JobStatus::Running.as_str())
        {
            job.status = status.as_str().to_string();
            job.error_message = error.map(|e| e.to_string());
            job.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl JobLedger for MemoryLedger {
    async fn enqueue(&self, category_id: &str, request: &JobRequest) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            job_id: Uuid::new_v4(),
            category_id: category_id.to_string(),
            request_params: serde_json::to_value(request)?,
            status: JobStatus::Pending.as_str().to_string(),
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn claim_next(&self) -> Result<Option<ClaimedJob>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.status == JobStatus::Pending.as_str())
        else {
            return Ok(None);
        };
        job.status = JobStatus::Running.as_str().to_string();
        job.updated_at = Utc::now();
        Ok(Some(ClaimedJob {
            job_id: job.job_id,
            category_id: job.category_id.clone(),
            request_params: job.request_params.clone(),
        }))
    }

    async fn cancel(&self, job_id: Uuid) -> Result<CancelOutcome, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.iter_mut().find(|j| j.job_id == job_id) else {
            return Ok(CancelOutcome::NotFound);
        };
        if job.status == JobStatus::Pending.as_str() {
            job.status = JobStatus::Cancelled.as_str().to_string();
            job.updated_at = Utc::now();
            Ok(CancelOutcome::Cancelled)
        } else {
            Ok(CancelOutcome::Conflict {
                status: job.status.clone(),
            })
        }
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.finalize(job_id, JobStatus::Completed, None);
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), StoreError> {
        self.finalize(job_id, JobStatus::Failed, Some(error));
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.job(job_id))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.iter().rev().take(limit as usize).cloned().collect())
    }
}

// ── Forecast store ───────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MemoryForecastStore {
    live: Mutex<Vec<ForecastPoint>>,
    history: Mutex<Vec<ForecastPoint>>,
    fail_next_merge: AtomicBool,
}

impl MemoryForecastStore {
    pub(crate) fn seed_live(&self, points: Vec<ForecastPoint>) {
        self.live.lock().unwrap().extend(points);
    }

    pub(crate) fn seed_history(&self, points: Vec<ForecastPoint>) {
        self.history.lock().unwrap().extend(points);
    }

    pub(crate) fn fail_next_merge(&self) {
        self.fail_next_merge.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ForecastStore for MemoryForecastStore {
    async fn read_range(
        &self,
        category_id: &str,
        granularity: Granularity,
        limit: i64,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let mut points: Vec<ForecastPoint> = self
            .live
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.category_id == category_id && p.granularity == granularity.as_str())
            .cloned()
            .collect();
        points.sort_by_key(|p| p.forecast_date);
        points.truncate(limit as usize);
        Ok(points)
    }

    async fn read_history(
        &self,
        category_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let mut points: Vec<ForecastPoint> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.category_id == category_id
                    && p.forecast_date >= start_date
                    && p.forecast_date <= end_date
            })
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.model_version_id, p.forecast_date));
        Ok(points)
    }

    async fn merge_batch(&self, points: &[ForecastPoint]) -> Result<u64, StoreError> {
        if self.fail_next_merge.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let mut live = self.live.lock().unwrap();
        for point in points {
            match live.iter_mut().find(|p| {
                p.category_id == point.category_id
                    && p.forecast_date == point.forecast_date
                    && p.granularity == point.granularity
            }) {
                Some(existing) => *existing = point.clone(),
                None => live.push(point.clone()),
            }
        }
        Ok(points.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ── Generator ────────────────────────────────────────────────

pub(crate) struct MockGenerator {
    points: Vec<GeneratedPoint>,
    error: Option<String>,
    calls: Mutex<Vec<(String, Granularity, i64)>>,
}

impl MockGenerator {
    pub(crate) fn returning(points: Vec<GeneratedPoint>) -> Self {
        Self {
            points,
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            points: Vec::new(),
            error: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, Granularity, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeltaGenerator for MockGenerator {
    async fn generate_delta(
        &self,
        category_id: &str,
        granularity: Granularity,
        count: i64,
    ) -> Result<Vec<GeneratedPoint>, GeneratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((category_id.to_string(), granularity, count));
        match &self.error {
            Some(body) => Err(GeneratorError::Api {
                status: 500,
                body: body.clone(),
            }),
            None => Ok(self.points.clone()),
        }
    }
}
