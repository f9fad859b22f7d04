//! Durable job ledger with atomic claim and cancel.
//!
//! The claim uses `FOR UPDATE SKIP LOCKED` so that a row being examined by
//! one worker replica is invisible to competitors instead of blocking them.
//! Cancel uses the same `status = 'PENDING'` condition as the claim, which
//! makes the two mutually exclusive: whichever transaction commits first
//! wins, and the loser's update matches zero rows.

use async_trait::async_trait;
use sqlx::types::Uuid;
use sqlx::PgPool;
use tracing::warn;

use glaskugel_core::model::{ClaimedJob, Job, JobRequest, JobStatus};

use crate::error::StoreError;

/// Outcome of a conditional cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Job was PENDING and is now CANCELLED.
    Cancelled,
    /// No job with that id exists.
    NotFound,
    /// Job has already left PENDING; carries the current status.
    Conflict { status: String },
}

/// Ledger of async forecast jobs.
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Insert a new PENDING job and return the stored row.
    async fn enqueue(&self, category_id: &str, request: &JobRequest) -> Result<Job, StoreError>;

    /// Atomically take ownership of the oldest PENDING job, transitioning it
    /// to RUNNING. Returns `None` when no claimable job exists. At most one
    /// caller ever observes a given job here, even across processes.
    async fn claim_next(&self) -> Result<Option<ClaimedJob>, StoreError>;

    /// Transition a job PENDING → CANCELLED if and only if it is still
    /// PENDING; otherwise report why not.
    async fn cancel(&self, job_id: Uuid) -> Result<CancelOutcome, StoreError>;

    /// Finalize a RUNNING job as COMPLETED.
    async fn mark_completed(&self, job_id: Uuid) -> Result<(), StoreError>;

    /// Finalize a RUNNING job as FAILED with the failure detail.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Most recent jobs, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>, StoreError>;
}

/// sqlx-backed implementation over the `forecast_jobs` table.
pub struct PgJobLedger {
    pool: PgPool,
}

impl PgJobLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_COLUMNS: &str =
    "job_id, category_id, request_params, status, error_message, created_at, updated_at";

#[async_trait]
impl JobLedger for PgJobLedger {
    async fn enqueue(&self, category_id: &str, request: &JobRequest) -> Result<Job, StoreError> {
        let params = serde_json::to_value(request)?;

        let job = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO forecast_jobs (job_id, category_id, request_params, status)
             VALUES ($1, $2, $3, 'PENDING')
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(category_id)
        .bind(params)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    async fn claim_next(&self) -> Result<Option<ClaimedJob>, StoreError> {
        let claimed = sqlx::query_as::<_, ClaimedJob>(
            "UPDATE forecast_jobs
             SET status = 'RUNNING', updated_at = NOW()
             WHERE job_id = (
                 SELECT job_id FROM forecast_jobs
                 WHERE status = 'PENDING'
                 ORDER BY created_at
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING job_id, category_id, request_params",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed)
    }

    async fn cancel(&self, job_id: Uuid) -> Result<CancelOutcome, StoreError> {
        let result = sqlx::query(
            "UPDATE forecast_jobs
             SET status = 'CANCELLED', updated_at = NOW()
             WHERE job_id = $1 AND status = 'PENDING'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(CancelOutcome::Cancelled);
        }

        // Zero rows: either the job doesn't exist or it already left PENDING.
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM forecast_jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match status {
            None => Ok(CancelOutcome::NotFound),
            Some(status) => Ok(CancelOutcome::Conflict { status }),
        }
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE forecast_jobs
             SET status = 'COMPLETED', updated_at = NOW()
             WHERE job_id = $1 AND status = $2",
        )
        .bind(job_id)
        .bind(JobStatus::Running.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Job {} was not RUNNING when finalizing as COMPLETED", job_id);
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE forecast_jobs
             SET status = 'FAILED', error_message = $1, updated_at = NOW()
             WHERE job_id = $2 AND status = $3",
        )
        .bind(error)
        .bind(job_id)
        .bind(JobStatus::Running.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Job {} was not RUNNING when finalizing as FAILED", job_id);
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM forecast_jobs WHERE job_id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM forecast_jobs
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}
