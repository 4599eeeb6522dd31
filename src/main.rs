//! News ingestion service — binary entrypoint.
//! Loads config, starts the periodic scheduler and serves the admin routes.

use news_ingest::api::{self, AppState};
use news_ingest::ingest::config::load_config_default;
use news_ingest::metrics::Metrics;
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    news_ingest::init_tracing();

    let cfg = load_config_default()?;
    tracing::info!(
        providers = cfg.providers.len(),
        interval_secs = cfg.scheduler.interval_secs,
        "ingest config loaded"
    );

    // Recorder must exist before the scheduler describes its metrics.
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let scheduler = news_ingest::build_default_scheduler(&cfg)?;
    let handle = scheduler.clone().start();
    let state = AppState::new(scheduler).with_handle(handle);

    let mut router = api::router(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
