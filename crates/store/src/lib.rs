//! PostgreSQL repositories for the forecast cache and the async job ledger.
//!
//! All cross-process coordination lives here: the claim and cancel operations
//! are atomic conditional updates, and the cache merge is a single
//! transaction. Callers never take in-process locks.

pub mod error;
pub mod forecasts;
pub mod jobs;

pub use error::StoreError;
pub use forecasts::{ForecastStore, PgForecastStore};
pub use jobs::{CancelOutcome, JobLedger, PgJobLedger};
