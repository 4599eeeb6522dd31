// src/ingest/providers/newsdata.rs
//! NewsData.io `latest`. Key as `apikey` query param; success status is "success".
//! On failure `results` is an object carrying the message, not an array.
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{non_empty, parse_naive_utc, Endpoint, FetchParams, ProviderAdapter};
use crate::ingest::error::IngestError;
use crate::ingest::types::{Category, RawRecord};

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: Value,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    creator: Option<Vec<String>>,
    #[serde(default)]
    category: Option<Vec<String>>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

fn native_category(c: Category) -> Option<&'static str> {
    match c {
        Category::Business => Some("business"),
        Category::Technology => Some("technology"),
        Category::Politics => Some("politics"),
        Category::Science => Some("science"),
        Category::Health => Some("health"),
        Category::Sports => Some("sports"),
        Category::Entertainment => Some("entertainment"),
        Category::World => Some("world"),
        Category::General => Some("top"),
        Category::Crypto => None,
    }
}

pub struct NewsDataAdapter {
    ep: Endpoint,
}

impl NewsDataAdapter {
    pub fn new(ep: Endpoint) -> Self {
        Self { ep }
    }

    async fn fetch_page(&self, params: &FetchParams, page_size: u32) -> Result<Vec<RawRecord>, IngestError> {
        let mut query = self.ep.base_query();
        query.push(("apikey".into(), self.ep.api_key.clone()));
        query.push(("size".into(), page_size.to_string()));
        if let Some(cat) = native_category(params.category) {
            query.push(("category".into(), cat.into()));
        }
        match &params.query {
            Some(q) => query.push(("q".into(), q.clone())),
            None if native_category(params.category).is_none() => {
                query.push(("q".into(), params.category.as_str().into()))
            }
            None => {}
        }

        let req = self
            .ep
            .client
            .get(format!("{}/latest", self.ep.base_url))
            .query(&query);
        let reply = self.ep.send(req).await?;
        parse_envelope(&self.ep.name, &reply.body).map_err(|e| match e {
            IngestError::Decode { .. } if !reply.is_success() => reply.status_error(&self.ep.name),
            other => other,
        })
    }
}

#[async_trait]
impl ProviderAdapter for NewsDataAdapter {
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
    if !env.status.eq_ignore_ascii_case("success") {
        let msg = env
            .results
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(IngestError::api(provider, msg));
    }
    let items: Vec<Item> = match env.results {
        Value::Null => Vec::new(),
        v => serde_json::from_value(v).map_err(|e| IngestError::decode(provider, e))?,
    };
    Ok(items
        .into_iter()
        .map(|it| {
            let mut tags = it.category.unwrap_or_default();
            tags.extend(it.keywords.unwrap_or_default());
            RawRecord {
                title: non_empty(it.title),
                description: non_empty(it.description),
                content: non_empty(it.content),
                url: non_empty(it.link),
                image_url: non_empty(it.image_url),
                author: non_empty(it.creator.and_then(|c| c.into_iter().next())),
                published_at: it
                    .pub_date
                    .as_deref()
                    .and_then(|d| parse_naive_utc(d, "%Y-%m-%d %H:%M:%S")),
                tags,
            }
        })
        .collect())
}
