// src/api.rs
//! Administrative HTTP surface: health, manual run, status.
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::scheduler::{IngestionScheduler, StatusSnapshot, TickReport, Trigger};
use crate::ingest::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<IngestionScheduler>,
    /// Keeps the periodic loop alive for as long as the router lives.
    pub handle: Option<Arc<SchedulerHandle>>,
}

impl AppState {
    pub fn new(scheduler: Arc<IngestionScheduler>) -> Self {
        Self {
            scheduler,
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: SchedulerHandle) -> Self {
        self.handle = Some(Arc::new(handle));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/admin/ingest/run", post(run_now))
        .route("/admin/ingest/status", get(status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn run_now(State(state): State<AppState>) -> Json<TickReport> {
    Json(state.scheduler.run_tick(Trigger::Manual).await)
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.scheduler.status().await)
}
