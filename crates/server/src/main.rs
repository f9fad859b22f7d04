mod api;
mod db;
mod router;
mod state;
#[cfg(test)]
mod test_support;
mod worker;

use std::sync::Arc;

use tracing::info;

use glaskugel_generator::HttpDeltaGenerator;
use glaskugel_store::{PgForecastStore, PgJobLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    glaskugel_core::config::load_dotenv();
    let config = glaskugel_core::Config::from_env();

    let pool = db::init_pg_pool(&config.postgres).await?;

    let state = Arc::new(state::AppState {
        forecasts: Arc::new(PgForecastStore::new(pool.clone())),
        jobs: Arc::new(PgJobLedger::new(pool)),
        generator: Arc::new(HttpDeltaGenerator::new(&config.generator)?),
    });

    // Worker loop: claims one job per tick. More replicas of this process can
    // run the same loop against the same ledger.
    let worker_state = state.clone();
    let tick = config.worker.tick_interval_secs;
    tokio::spawn(async move {
        worker::run_worker_loop(worker_state, tick).await;
    });

    let app = router::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Forecast gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
