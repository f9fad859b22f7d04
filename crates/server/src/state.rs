use std::sync::Arc;

use glaskugel_generator::DeltaGenerator;
use glaskugel_store::{ForecastStore, JobLedger};

/// Shared handles for request handlers and the worker loop. Repositories are
/// constructed once at startup and passed in explicitly; there is no ambient
/// database handle.
pub struct AppState {
    pub forecasts: Arc<dyn ForecastStore>,
    pub jobs: Arc<dyn JobLedger>,
    pub generator: Arc<dyn DeltaGenerator>,
}
