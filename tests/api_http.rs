// tests/api_http.rs
//
// HTTP-level tests for the admin Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /admin/ingest/run
// - GET /admin/ingest/status

use async_trait::async_trait;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

use news_ingest::api::{self, AppState};
use news_ingest::ingest::config::{IngestConfig, ProviderConfig, ProviderKind, SchedulerConfig};
use news_ingest::ingest::error::IngestError;
use news_ingest::ingest::providers::{AdapterTable, DynAdapter, FetchParams, ProviderAdapter};
use news_ingest::ingest::store::MemoryArticleStore;
use news_ingest::ingest::types::{Category, RawRecord};
use news_ingest::notify::LogBroadcaster;
use news_ingest::IngestionScheduler;

const BODY_LIMIT: usize = 1024 * 1024;

struct OneArticle;

#[async_trait]
impl ProviderAdapter for OneArticle {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawRecord>, IngestError> {
        Ok(vec![RawRecord {
            title: Some("Central bank keeps rates unchanged".into()),
            description: Some("Policy makers held borrowing costs steady.".into()),
            url: Some("https://wire.test/rates".into()),
            ..Default::default()
        }])
    }

    fn name(&self) -> &str {
        "wire"
    }
}

fn test_state() -> AppState {
    let mut p = ProviderConfig::new("wire", ProviderKind::Rss, vec![Category::Business]);
    p.base_url = Some("http://wire.invalid/rss".into());
    let cfg = IngestConfig {
        scheduler: SchedulerConfig {
            task_delay_ms: 0,
            ..Default::default()
        },
        dedup: Default::default(),
        transform: Default::default(),
        providers: vec![p],
    };
    let mut adapters = AdapterTable::new();
    adapters.insert("wire".into(), Arc::new(OneArticle) as DynAdapter);
    let sched = IngestionScheduler::new(
        &cfg,
        adapters,
        Arc::new(MemoryArticleStore::default()),
        Arc::new(LogBroadcaster),
    )
    .expect("scheduler");
    AppState::new(Arc::new(sched))
}

async fn body_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app: Router = api::router(test_state());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn manual_run_returns_tick_report() {
    let app = api::router(test_state());

    let req = Request::builder()
        .method("POST")
        .uri("/admin/ingest/run")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = body_json(resp).await;
    assert_eq!(v["trigger"], "manual");
    assert_eq!(v["budget_counted"], false);
    let tasks = v["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["provider"], "wire");
    assert_eq!(tasks[0]["category"], "business");
    assert_eq!(tasks[0]["admitted"], 1);
    assert!(tasks[0]["error"].is_null());
}

#[tokio::test]
async fn status_reflects_previous_run() {
    let state = test_state();
    let app = api::router(state.clone());

    let run = Request::builder()
        .method("POST")
        .uri("/admin/ingest/run")
        .body(Body::empty())
        .unwrap();
    let _ = app.clone().oneshot(run).await.unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/admin/ingest/status")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = body_json(resp).await;
    assert_eq!(v["articles_stored"], 1);
    assert_eq!(v["daily"]["total_admitted"], 1);
    assert_eq!(v["daily"]["by_provider"]["wire"], 1);
    assert_eq!(v["providers"][0]["provider"], "wire");
    // manual run: budget untouched
    assert_eq!(v["providers"][0]["counters"]["daily_count"], 0);
}

#[tokio::test]
async fn run_route_rejects_get() {
    let app = api::router(test_state());
    let req = Request::builder()
        .method("GET")
        .uri("/admin/ingest/run")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
