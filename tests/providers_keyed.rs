// tests/providers_keyed.rs
//
// NewsData, GNews and Alpha Vantage against a loopback axum server: the key
// travels as an `apikey` query param, error envelopes and non-2xx replies
// come back as provider errors.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use news_ingest::ingest::config::{ProviderConfig, ProviderKind};
use news_ingest::ingest::error::ErrorKind;
use news_ingest::ingest::providers::{build_adapter, FetchParams, ProviderAdapter as _};
use news_ingest::ingest::types::Category;

const GOOD_KEY: &str = "k1";
/// Key that makes every route answer with a plain-text 5xx.
const BROKEN_KEY: &str = "boom";

type Seen = Arc<Mutex<Vec<(&'static str, HashMap<String, String>)>>>;

fn key(q: &HashMap<String, String>) -> &str {
    q.get("apikey").map(String::as_str).unwrap_or("")
}

fn upstream_down() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response()
}

async fn newsdata_latest(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> Response {
    seen.lock().unwrap().push(("/latest", q.clone()));
    match key(&q) {
        GOOD_KEY => Json(json!({
            "status": "success",
            "totalResults": 1,
            "results": [{
                "title": "Chipmaker unveils faster AI processor",
                "link": "https://nd.test/1",
                "description": "A new accelerator.",
                "content": null,
                "pubDate": "2025-03-10 12:00:00",
                "image_url": null,
                "creator": [""],
                "category": ["technology"],
                "keywords": null
            }]
        }))
        .into_response(),
        BROKEN_KEY => upstream_down(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "error",
                "results": {"message": "API key is invalid", "code": "Unauthorized"}
            })),
        )
            .into_response(),
    }
}

fn gnews_reply(q: &HashMap<String, String>) -> Response {
    match key(q) {
        GOOD_KEY => Json(json!({
            "totalArticles": 1,
            "articles": [{
                "title": "Lakers clinch playoff berth in overtime",
                "description": "A late three sealed it.",
                "content": "Full recap.",
                "url": "https://gn.test/1",
                "image": "https://gn.test/1.jpg",
                "publishedAt": "2025-03-10T12:00:00Z",
                "source": {"name": "Courtside", "url": "https://courtside.test"}
            }]
        }))
        .into_response(),
        BROKEN_KEY => upstream_down(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"errors": ["You did not provide a valid API key."]})),
        )
            .into_response(),
    }
}

async fn gnews_top(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> Response {
    seen.lock().unwrap().push(("/top-headlines", q.clone()));
    gnews_reply(&q)
}

async fn gnews_search(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> Response {
    seen.lock().unwrap().push(("/search", q.clone()));
    gnews_reply(&q)
}

async fn alphavantage_query(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> Response {
    seen.lock().unwrap().push(("/query", q.clone()));
    match key(&q) {
        GOOD_KEY => Json(json!({
            "items": "1",
            "feed": [{
                "title": "Earnings beat lifts shares",
                "url": "https://av.test/1",
                "time_published": "20250310T143000",
                "authors": [],
                "summary": "Profit up.",
                "banner_image": "",
                "source": "Benzinga",
                "topics": [{"topic": "Earnings", "relevance_score": "0.9"}]
            }]
        }))
        .into_response(),
        BROKEN_KEY => (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response(),
        // Alpha Vantage reports bad keys with a 200
        _ => Json(json!({"Error Message": "the parameter apikey is invalid or missing"})).into_response(),
    }
}

async fn spawn_server() -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/latest", get(newsdata_latest))
        .route("/top-headlines", get(gnews_top))
        .route("/search", get(gnews_search))
        .route("/query", get(alphavantage_query))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn provider(addr: SocketAddr, kind: ProviderKind, api_key: &str) -> ProviderConfig {
    let mut p = ProviderConfig::new("keyed", kind, vec![Category::Business]);
    p.base_url = Some(format!("http://{addr}/"));
    p.api_key = Some(api_key.into());
    p.page_size = 5;
    p
}

fn params(category: Category, query: Option<&str>) -> FetchParams {
    FetchParams {
        category,
        query: query.map(str::to_string),
    }
}

fn last_request(seen: &Seen) -> (&'static str, HashMap<String, String>) {
    seen.lock().unwrap().last().cloned().expect("server saw a request")
}

// ---------- newsdata ----------

#[tokio::test]
async fn newsdata_sends_apikey_param() {
    let (addr, seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::NewsData, GOOD_KEY)).unwrap();

    let recs = adapter.fetch(&params(Category::Technology, None)).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].title.as_deref(), Some("Chipmaker unveils faster AI processor"));
    assert_eq!(recs[0].author, None, "blank creator is dropped");
    assert!(recs[0].published_at.is_some());

    let (path, q) = last_request(&seen);
    assert_eq!(path, "/latest");
    assert_eq!(q.get("apikey").map(String::as_str), Some(GOOD_KEY));
    assert_eq!(q.get("category").map(String::as_str), Some("technology"));
    assert_eq!(q.get("size").map(String::as_str), Some("5"));
}

#[tokio::test]
async fn newsdata_error_envelope_carries_message() {
    let (addr, _seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::NewsData, "wrong")).unwrap();

    let err = adapter.fetch(&params(Category::Business, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("API key is invalid"), "{err}");
}

#[tokio::test]
async fn newsdata_server_error_is_provider_error() {
    let (addr, _seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::NewsData, BROKEN_KEY)).unwrap();

    let err = adapter.fetch(&params(Category::Business, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("500"), "{err}");
}

// ---------- gnews ----------

#[tokio::test]
async fn gnews_browses_top_headlines_by_topic() {
    let (addr, seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::GNews, GOOD_KEY)).unwrap();

    let recs = adapter.fetch(&params(Category::Sports, None)).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].author.as_deref(), Some("Courtside"));

    let (path, q) = last_request(&seen);
    assert_eq!(path, "/top-headlines");
    assert_eq!(q.get("apikey").map(String::as_str), Some(GOOD_KEY));
    assert_eq!(q.get("category").map(String::as_str), Some("sports"));
    assert_eq!(q.get("max").map(String::as_str), Some("5"));
    assert!(!q.contains_key("q"));
}

#[tokio::test]
async fn gnews_searches_when_topic_is_not_native() {
    let (addr, seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::GNews, GOOD_KEY)).unwrap();

    adapter.fetch(&params(Category::Crypto, None)).await.unwrap();
    let (path, q) = last_request(&seen);
    assert_eq!(path, "/search");
    assert_eq!(q.get("q").map(String::as_str), Some("crypto"));
    assert_eq!(q.get("apikey").map(String::as_str), Some(GOOD_KEY));

    adapter
        .fetch(&params(Category::Business, Some("tariffs")))
        .await
        .unwrap();
    let (path, q) = last_request(&seen);
    assert_eq!(path, "/search");
    assert_eq!(q.get("q").map(String::as_str), Some("tariffs"));
}

#[tokio::test]
async fn gnews_errors_and_server_failures_are_provider_errors() {
    let (addr, _seen) = spawn_server().await;

    let bad_key = build_adapter(&provider(addr, ProviderKind::GNews, "wrong")).unwrap();
    let err = bad_key.fetch(&params(Category::World, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("valid API key"), "{err}");

    let down = build_adapter(&provider(addr, ProviderKind::GNews, BROKEN_KEY)).unwrap();
    let err = down.fetch(&params(Category::World, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("500"), "{err}");
}

// ---------- alpha vantage ----------

#[tokio::test]
async fn alphavantage_sends_apikey_and_function() {
    let (addr, seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::AlphaVantage, GOOD_KEY)).unwrap();

    let recs = adapter
        .fetch(&params(Category::Business, Some("AAPL,MSFT")))
        .await
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].author.as_deref(), Some("Benzinga"));

    let (path, q) = last_request(&seen);
    assert_eq!(path, "/query");
    assert_eq!(q.get("apikey").map(String::as_str), Some(GOOD_KEY));
    assert_eq!(q.get("function").map(String::as_str), Some("NEWS_SENTIMENT"));
    assert_eq!(q.get("topics").map(String::as_str), Some("financial_markets"));
    assert_eq!(q.get("tickers").map(String::as_str), Some("AAPL,MSFT"));
    assert_eq!(q.get("limit").map(String::as_str), Some("5"));
}

#[tokio::test]
async fn alphavantage_error_message_on_200_is_provider_error() {
    let (addr, _seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::AlphaVantage, "wrong")).unwrap();

    let err = adapter.fetch(&params(Category::Business, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("apikey is invalid"), "{err}");
}

#[tokio::test]
async fn alphavantage_server_error_is_provider_error() {
    let (addr, _seen) = spawn_server().await;
    let adapter = build_adapter(&provider(addr, ProviderKind::AlphaVantage, BROKEN_KEY)).unwrap();

    let err = adapter.fetch(&params(Category::Business, None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert!(err.to_string().contains("503"), "{err}");
}
