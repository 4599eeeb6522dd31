// tests/notify_webhook.rs
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use news_ingest::ingest::types::{ArticleCandidate, Category};
use news_ingest::notify::webhook::WebhookBroadcaster;
use news_ingest::notify::{Broadcaster, BroadcasterMux};

#[derive(Clone, Default)]
struct Hook {
    bodies: Arc<Mutex<Vec<Value>>>,
    hits: Arc<AtomicUsize>,
}

async fn spawn_hook(status: StatusCode) -> (SocketAddr, Hook) {
    let hook = Hook::default();
    let app = Router::new()
        .route(
            "/hook",
            post(move |State(h): State<Hook>, Json(body): Json<Value>| async move {
                h.hits.fetch_add(1, Ordering::SeqCst);
                h.bodies.lock().unwrap().push(body);
                status
            }),
        )
        .with_state(hook.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hook)
}

fn article(title: &str) -> ArticleCandidate {
    ArticleCandidate {
        title: title.into(),
        content: title.into(),
        summary: String::new(),
        source_url: format!("https://wire.test/{}", title.len()),
        image_url: String::new(),
        author: String::new(),
        category: Category::Business,
        published_at: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        provider: "wire".into(),
    }
}

#[tokio::test]
async fn posts_digest_of_admitted_batch() {
    let (addr, hook) = spawn_hook(StatusCode::OK).await;
    let wh = WebhookBroadcaster::new(format!("http://{addr}/hook"));

    wh.notify_admitted(&[article("Stocks climb"), article("Oil slides again")])
        .await
        .unwrap();

    let bodies = hook.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let b = &bodies[0];
    assert_eq!(b["event"], "articles_admitted");
    assert_eq!(b["count"], 2);
    assert_eq!(b["articles"][0]["title"], "Stocks climb");
    assert_eq!(b["articles"][0]["category"], "business");
    assert_eq!(b["articles"][1]["provider"], "wire");
    assert_eq!(b["articles"][1]["published_at"], "2025-03-10T12:00:00+00:00");
}

#[tokio::test]
async fn empty_batch_sends_nothing() {
    let (addr, hook) = spawn_hook(StatusCode::OK).await;
    let wh = WebhookBroadcaster::new(format!("http://{addr}/hook"));
    wh.notify_admitted(&[]).await.unwrap();
    assert_eq!(hook.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_error_is_retried_then_reported() {
    let (addr, hook) = spawn_hook(StatusCode::INTERNAL_SERVER_ERROR).await;
    let wh = WebhookBroadcaster::new(format!("http://{addr}/hook")).with_retries(2);

    let err = wh.notify_admitted(&[article("Stocks climb")]).await.unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
    assert_eq!(hook.hits.load(Ordering::SeqCst), 2);
}

struct Counting(Arc<AtomicUsize>);

#[async_trait]
impl Broadcaster for Counting {
    async fn notify_admitted(&self, _articles: &[ArticleCandidate]) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn mux_keeps_going_past_a_failing_sink() {
    let (addr, _hook) = spawn_hook(StatusCode::BAD_GATEWAY).await;
    let failing = WebhookBroadcaster::new(format!("http://{addr}/hook")).with_retries(1);
    let seen = Arc::new(AtomicUsize::new(0));
    let sinks: Vec<Arc<dyn Broadcaster>> = vec![Arc::new(failing), Arc::new(Counting(seen.clone()))];
    let mux = BroadcasterMux::new(sinks);
    assert_eq!(mux.len(), 2);

    let err = mux.notify_admitted(&[article("Stocks climb")]).await.unwrap_err();
    assert!(err.to_string().contains("webhook"), "{err}");
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
