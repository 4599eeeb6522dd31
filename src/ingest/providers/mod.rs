// src/ingest/providers/mod.rs
//! Provider adapters: one per external news API, all behind [`ProviderAdapter`].
//!
//! Adapters own their transport quirks (auth placement, envelope shape,
//! paging). They never retry on their own except for the one-shot smaller-page
//! attempt after a timeout when `fallback_page_size` is configured.

pub mod alphavantage;
pub mod gnews;
pub mod newsapi;
pub mod newsdata;
pub mod rss;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::histogram;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ingest::config::{ProviderConfig, ProviderKind};
use crate::ingest::error::IngestError;
use crate::ingest::types::{Category, RawRecord};

/// What a single task asks a provider for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub category: Category,
    pub query: Option<String>,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawRecord>, IngestError>;
    fn name(&self) -> &str;
}

pub type DynAdapter = Arc<dyn ProviderAdapter>;

/// Provider name -> adapter. Built once at startup.
pub type AdapterTable = HashMap<String, DynAdapter>;

/// Build the adapter for one provider config.
pub fn build_adapter(cfg: &ProviderConfig) -> anyhow::Result<DynAdapter> {
    let ep = Endpoint::from_config(cfg)?;
    Ok(match cfg.kind {
        ProviderKind::NewsApi => Arc::new(newsapi::NewsApiAdapter::new(ep)),
        ProviderKind::NewsData => Arc::new(newsdata::NewsDataAdapter::new(ep)),
        ProviderKind::GNews => Arc::new(gnews::GNewsAdapter::new(ep)),
        ProviderKind::AlphaVantage => Arc::new(alphavantage::AlphaVantageAdapter::new(ep)),
        ProviderKind::Rss => Arc::new(rss::RssAdapter::new(ep)),
    })
}

pub fn build_adapter_table(cfgs: &[ProviderConfig]) -> anyhow::Result<AdapterTable> {
    cfgs.iter()
        .map(|c| Ok((c.name.clone(), build_adapter(c)?)))
        .collect()
}

/// Transport settings shared by every HTTP adapter.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub params: BTreeMap<String, String>,
    pub timeout: Duration,
    pub page_size: u32,
    pub fallback_page_size: Option<u32>,
    pub client: reqwest::Client,
}

impl Endpoint {
    pub fn from_config(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let base_url = cfg
            .base_url()
            .ok_or_else(|| anyhow::anyhow!("provider '{}' has no base_url", cfg.name))?
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .user_agent(concat!("news-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            name: cfg.name.clone(),
            base_url,
            api_key: cfg.credential().to_string(),
            params: cfg.params.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            page_size: cfg.page_size.max(1),
            fallback_page_size: cfg.fallback_page_size,
            client,
        })
    }

    /// Default query params as owned pairs, ready to extend.
    pub(crate) fn base_query(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Send the request with this endpoint's timeout, returning status + body.
    pub(crate) async fn send(&self, req: reqwest::RequestBuilder) -> Result<HttpReply, IngestError> {
        let t0 = Instant::now();
        let resp = req
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| self.map_err(e))?;
        histogram!("ingest_fetch_ms", "provider" => self.name.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(HttpReply { status, body })
    }

    fn map_err(&self, e: reqwest::Error) -> IngestError {
        if e.is_timeout() {
            IngestError::Timeout {
                provider: self.name.clone(),
                secs: self.timeout.as_secs(),
            }
        } else {
            IngestError::transport(&self.name, e)
        }
    }

    /// Run `call` with the normal page size; on timeout make exactly one more
    /// attempt with the smaller fallback page size, if one is configured.
    pub(crate) async fn with_timeout_fallback<F, Fut>(&self, mut call: F) -> Result<Vec<RawRecord>, IngestError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<RawRecord>, IngestError>>,
    {
        match call(self.page_size).await {
            Err(IngestError::Timeout { .. })
                if self.fallback_page_size.is_some_and(|fb| fb < self.page_size) =>
            {
                let fb = self.fallback_page_size.unwrap_or(self.page_size);
                tracing::warn!(
                    target: "ingest",
                    provider = %self.name,
                    page_size = self.page_size,
                    fallback = fb,
                    "provider timed out; retrying once with smaller page"
                );
                call(fb).await
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error for a non-2xx reply whose body carried no recognisable envelope.
    pub fn status_error(&self, provider: &str) -> IngestError {
        IngestError::api(provider, format!("HTTP {}", self.status))
    }
}

pub(crate) fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Naive timestamp in `fmt`, interpreted as UTC.
pub(crate) fn parse_naive_utc(s: &str, fmt: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), fmt)
        .ok()
        .map(|n| n.and_utc())
}

pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
