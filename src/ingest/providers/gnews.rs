// src/ingest/providers/gnews.rs
//! GNews v4. Browses `top-headlines` by topic, switches to `search` when the
//! task carries a query. No status field: failures come back as `errors`.
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{non_empty, parse_rfc3339, Endpoint, FetchParams, ProviderAdapter};
use crate::ingest::error::IngestError;
use crate::ingest::types::{Category, RawRecord};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Option<Value>,
    #[serde(default)]
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

fn native_topic(c: Category) -> Option<&'static str> {
    match c {
        Category::Business => Some("business"),
        Category::Technology => Some("technology"),
        Category::Science => Some("science"),
        Category::Health => Some("health"),
        Category::Sports => Some("sports"),
        Category::Entertainment => Some("entertainment"),
        Category::World => Some("world"),
        Category::General => Some("general"),
        Category::Crypto | Category::Politics => None,
    }
}

pub struct GNewsAdapter {
    ep: Endpoint,
}

impl GNewsAdapter {
    pub fn new(ep: Endpoint) -> Self {
        Self { ep }
    }

    async fn fetch_page(&self, params: &FetchParams, page_size: u32) -> Result<Vec<RawRecord>, IngestError> {
        let mut query = self.ep.base_query();
        query.push(("apikey".into(), self.ep.api_key.clone()));
        query.push(("max".into(), page_size.to_string()));

        let search = params
            .query
            .clone()
            .or_else(|| native_topic(params.category).is_none().then(|| params.category.to_string()));
        let path = match search {
            Some(q) => {
                query.push(("q".into(), q));
                "search"
            }
            None => {
                query.push((
                    "category".into(),
                    native_topic(params.category).unwrap_or("general").into(),
                ));
                "top-headlines"
            }
        };

        let req = self
            .ep
            .client
            .get(format!("{}/{path}", self.ep.base_url))
            .query(&query);
        let reply = self.ep.send(req).await?;
        let out = parse_envelope(&self.ep.name, &reply.body);
        match out {
            Ok(v) if !reply.is_success() && v.is_empty() => Err(reply.status_error(&self.ep.name)),
            Err(IngestError::Decode { .. }) if !reply.is_success() => Err(reply.status_error(&self.ep.name)),
            other => other,
        }
    }
}

#[async_trait]
impl ProviderAdapter for GNewsAdapter {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawRecord>, IngestError> {
        self.ep
            .with_timeout_fallback(|ps| self.fetch_page(params, ps))
            .await
    }

    fn name(&self) -> &str {
        &self.ep.name
    }
}

fn errors_to_message(v: &Value) -> String {
    match v {
        Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .values()
            .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

pub(crate) fn parse_envelope(provider: &str, body: &str) -> Result<Vec<RawRecord>, IngestError> {
    let env: Envelope = serde_json::from_str(body).map_err(|e| IngestError::decode(provider, e))?;
    if let Some(errs) = env.errors.as_ref().filter(|e| !e.is_null()) {
        return Err(IngestError::api(provider, errors_to_message(errs)));
    }
    let Some(articles) = env.articles else {
        return Err(IngestError::decode(provider, "missing articles"));
    };
    Ok(articles
        .into_iter()
        .map(|a| RawRecord {
            title: non_empty(a.title),
            description: non_empty(a.description),
            content: non_empty(a.content),
            url: non_empty(a.url),
            image_url: non_empty(a.image),
            author: a.source.and_then(|s| non_empty(s.name)),
            published_at: a.published_at.as_deref().and_then(parse_rfc3339),
            tags: Vec::new(),
        })
        .collect())
}
