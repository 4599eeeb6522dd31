// src/ingest/providers/alphavantage.rs
//! Alpha Vantage `NEWS_SENTIMENT`. Financial news; throttling and errors arrive
//! as HTTP 200 with an `Information` / `Note` / `Error Message` field.
use async_trait::async_trait;
use serde::Deserialize;

use super::{non_empty, parse_naive_utc, Endpoint, FetchParams, ProviderAdapter};
use crate::ingest::error::IngestError;
use crate::ingest::types::{Category, RawRecord};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(default)]
    feed: Option<Vec<Item>>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    url: Option<String>,
    time_published: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    summary: Option<String>,
    banner_image: Option<String>,
    source: Option<String>,
    #[serde(default)]
    topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    topic: String,
}

fn native_topic(c: Category) -> Option<&'static str> {
    match c {
        Category::Business => Some("financial_markets"),
        Category::Technology => Some("technology"),
        Category::Crypto => Some("blockchain"),
        Category::Health => Some("life_sciences"),
        _ => None,
    }
}

pub struct AlphaVantageAdapter {
    ep: Endpoint,
}

impl AlphaVantageAdapter {
    pub fn new(ep: Endpoint) -> Self {
        Self { ep }
    }

    async fn fetch_page(&self, params: &FetchParams, page_size: u32) -> Result<Vec<RawRecord>, IngestError> {
        let mut query = self.ep.base_query();
        query.push(("function".into(), "NEWS_SENTIMENT".into()));
        query.push(("apikey".into(), self.ep.api_key.clone()));
        query.push(("limit".into(), page_size.to_string()));
        query.push(("sort".into(), "LATEST".into()));
        if let Some(topic) = native_topic(params.category) {
            query.push(("topics".into(), topic.into()));
        }
        // task subtype is a ticker list here (e.g. "AAPL,MSFT")
        if let Some(tickers) = &params.query {
            query.push(("tickers".into(), tickers.clone()));
        }

        let req = self
            .ep
            .client
            .get(format!("{}/query", self.ep.base_url))
            .query(&query);
        let reply = self.ep.send(req).await?;
        if !reply.is_success() {
            return Err(reply.status_error(&self.ep.name));
        }
        parse_envelope(&self.ep.name, &reply.body)
    }
}

#[async_trait]
impl ProviderAdapter for AlphaVantageAdapter {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawRecord>, IngestError> {
        self.ep
            .with_timeout_fallback(|ps| self.fetch_page(params, ps))
            .await
    }

    fn name(&self) -> &str {
        &self.ep.name
    }
}

pub(crate) fn parse_envelope(provider: &str, body: &str) -> Result<Vec<RawRecord>, IngestError> {
    let env: Envelope = serde_json::from_str(body).map_err(|e| IngestError::decode(provider, e))?;
    if let Some(msg) = env.error_message.or(env.note).or(env.information) {
        return Err(IngestError::api(provider, msg));
    }
    let feed = env
        .feed
        .ok_or_else(|| IngestError::decode(provider, "missing feed"))?;
    Ok(feed
        .into_iter()
        .map(|it| RawRecord {
            title: non_empty(it.title),
            description: non_empty(it.summary),
            content: None,
            url: non_empty(it.url),
            image_url: non_empty(it.banner_image),
            author: non_empty(it.authors.into_iter().next()).or_else(|| non_empty(it.source)),
            published_at: it
                .time_published
                .as_deref()
                .and_then(|t| parse_naive_utc(t, "%Y%m%dT%H%M%S")),
            tags: it.topics.into_iter().map(|t| t.topic).collect(),
        })
        .collect())
}
