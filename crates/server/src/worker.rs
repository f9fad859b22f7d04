//! Background worker loop.
//!
//! Each tick claims at most one PENDING job, asks the downstream generator
//! for the missing points, merges them into the forecast cache in a single
//! transaction, and finalizes the job. The claim is an atomic conditional
//! update with lock-skip, so any number of worker replicas can poll the same
//! ledger and each job gets exactly one owner. Once a job is RUNNING it is
//! processed without further coordination; a worker crash mid-run leaves it
//! RUNNING forever (the ledger has no lease or reclaim sweep).

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use glaskugel_core::model::{ClaimedJob, ForecastPoint, JobRequest};

use crate::state::AppState;

/// Poll the ledger forever. Processing is spawned per job so a slow
/// generator call never delays the next claim tick.
pub async fn run_worker_loop(state: Arc<AppState>, tick_interval_secs: u64) {
    info!(
        "Forecast job worker started (tick every {}s)",
        tick_interval_secs
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(tick_interval_secs));

    loop {
        ticker.tick().await;

        match state.jobs.claim_next().await {
            Ok(Some(job)) => {
                info!(
                    "Claimed job {} for category {}",
                    job.job_id, job.category_id
                );
                let state = state.clone();
                tokio::spawn(async move {
                    process_job(state, job).await;
                });
            }
            Ok(None) => {}
            // The job (if any) is still PENDING; a later tick retries it.
            Err(e) => warn!("Job claim failed: {}", e),
        }
    }
}

/// Run one claimed job to a terminal state.
async fn process_job(state: Arc<AppState>, job: ClaimedJob) {
    let request: JobRequest = match serde_json::from_value(job.request_params.clone()) {
        Ok(request) => request,
        Err(e) => {
            finalize_failed(&state, &job, &format!("invalid request parameters: {}", e)).await;
            return;
        }
    };

    let generated = match state
        .generator
        .generate_delta(&job.category_id, request.granularity, request.count)
        .await
    {
        Ok(points) => points,
        Err(e) => {
            finalize_failed(&state, &job, &e.to_string()).await;
            return;
        }
    };

    let points: Vec<ForecastPoint> = generated.into_iter().map(Into::into).collect();

    // All-or-nothing: a failed merge rolls back and the job ends FAILED with
    // no partial cache mutation.
    match state.forecasts.merge_batch(&points).await {
        Ok(written) => {
            if let Err(e) = state.jobs.mark_completed(job.job_id).await {
                error!("Failed to finalize job {} as COMPLETED: {}", job.job_id, e);
                return;
            }
            info!(
                "Job {} completed: merged {} forecast points",
                job.job_id, written
            );
        }
        Err(e) => {
            finalize_failed(&state, &job, &format!("cache merge failed: {}", e)).await;
        }
    }
}

async fn finalize_failed(state: &AppState, job: &ClaimedJob, message: &str) {
    warn!("Job {} failed: {}", job.job_id, message);
    if let Err(e) = state.jobs.mark_failed(job.job_id, message).await {
        // The job stays RUNNING; only a human or a future sweep can recover it.
        error!("Failed to finalize job {} as FAILED: {}", job.job_id, e);
    }
}
