// src/ingest/providers/newsapi.rs
//! NewsAPI.org `top-headlines`. Key travels in the `X-Api-Key` header.
use async_trait::async_trait;
use serde::Deserialize;

use super::{non_empty, parse_rfc3339, Endpoint, FetchParams, ProviderAdapter};
use crate::ingest::error::IngestError;
use crate::ingest::types::{Category, RawRecord};

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    source: Option<Source>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

/// Categories the endpoint understands natively; others go through `q`.
fn native_category(c: Category) -> Option<&'static str> {
    match c {
        Category::Business => Some("business"),
        Category::Technology => Some("technology"),
        Category::Science => Some("science"),
        Category::Health => Some("health"),
        Category::Sports => Some("sports"),
        Category::Entertainment => Some("entertainment"),
        Category::General => Some("general"),
        Category::Crypto | Category::Politics | Category::World => None,
    }
}

pub struct NewsApiAdapter {
    ep: Endpoint,
}

impl NewsApiAdapter {
    pub fn new(ep: Endpoint) -> Self {
        Self { ep }
    }

    async fn fetch_page(&self, params: &FetchParams, page_size: u32) -> Result<Vec<RawRecord>, IngestError> {
        let mut query = self.ep.base_query();
        query.push(("pageSize".into(), page_size.to_string()));
        match (native_category(params.category), &params.query) {
            (_, Some(q)) => query.push(("q".into(), q.clone())),
            (Some(cat), None) => query.push(("category".into(), cat.into())),
            (None, None) => query.push(("q".into(), params.category.as_str().into())),
        }
        if !query.iter().any(|(k, _)| k == "country" || k == "sources" || k == "q") {
            query.push(("country".into(), "us".into()));
        }

        let req = self
            .ep
            .client
            .get(format!("{}/top-headlines", self.ep.base_url))
            .header("X-Api-Key", &self.ep.api_key)
            .query(&query);
        let reply = self.ep.send(req).await?;
        parse_envelope(&self.ep.name, &reply.body).map_err(|e| match e {
            IngestError::Decode { .. } if !reply.is_success() => reply.status_error(&self.ep.name),
            other => other,
        })
    }
}

#[async_trait]
impl ProviderAdapter for NewsApiAdapter {
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
    if !env.status.eq_ignore_ascii_case("ok") {
        return Err(IngestError::api(
            provider,
            format!(
                "{}: {}",
                env.code.unwrap_or_else(|| "unknown".into()),
                env.message.unwrap_or_else(|| "no message".into())
            ),
        ));
    }
    Ok(env
        .articles
        .into_iter()
        .map(|a| RawRecord {
            title: non_empty(a.title),
            description: non_empty(a.description),
            content: non_empty(a.content),
            url: non_empty(a.url),
            image_url: non_empty(a.url_to_image),
            author: non_empty(a.author).or_else(|| a.source.and_then(|s| non_empty(s.name))),
            published_at: a.published_at.as_deref().and_then(parse_rfc3339),
            tags: Vec::new(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_yields_records() {
        let body = r#"{"status":"ok","totalResults":1,"articles":[
            {"source":{"id":null,"name":"Reuters"},"author":null,"title":"Stocks climb",
             "description":"Wall St up","url":"https://x.test/1","urlToImage":null,
             "publishedAt":"2025-03-10T12:00:00Z","content":null}]}"#;
        let v = parse_envelope("newsapi", body).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].title.as_deref(), Some("Stocks climb"));
        assert_eq!(v[0].author.as_deref(), Some("Reuters"));
        assert!(v[0].published_at.is_some());
        assert!(v[0].image_url.is_none());
    }

    #[test]
    fn error_envelope_is_api_error() {
        let body = r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#;
        let err = parse_envelope("newsapi", body).unwrap_err();
        assert!(matches!(err, IngestError::ProviderApi { .. }));
        assert!(err.to_string().contains("rateLimited"));
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(
            parse_envelope("newsapi", "<html>"),
            Err(IngestError::Decode { .. })
        ));
    }
}
