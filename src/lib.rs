// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod ingest;
pub mod metrics;
pub mod notify;

pub use crate::api::router;
pub use crate::ingest::{IngestionScheduler, SchedulerHandle, TickReport, Trigger};

use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::ingest::config::IngestConfig;
use crate::ingest::store::{ArticleStore, MemoryArticleStore};
use crate::notify::{Broadcaster, BroadcasterMux};

/// Install the tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
/// Safe to call more than once (later calls are no-ops).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_ingest=info,ingest=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Scheduler wired with the in-memory store and env-driven broadcasters.
pub fn build_default_scheduler(cfg: &IngestConfig) -> anyhow::Result<Arc<IngestionScheduler>> {
    let store: Arc<dyn ArticleStore> = Arc::new(MemoryArticleStore::default());
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(BroadcasterMux::from_env());
    Ok(Arc::new(IngestionScheduler::from_config(cfg, store, broadcaster)?))
}
