// src/notify/webhook.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Broadcaster;
use crate::ingest::types::{ArticleCandidate, Category};

pub const ENV_WEBHOOK_URL: &str = "NEWS_WEBHOOK_URL";

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 30_000;

/// Delay before retry number `attempt + 1`: doubles from 500ms, capped at 30s.
fn backoff(attempt: u8) -> Duration {
    let ms = 1u64
        .checked_shl(u32::from(attempt.saturating_sub(1)))
        .map_or(BACKOFF_CAP_MS, |f| BACKOFF_BASE_MS.saturating_mul(f))
        .min(BACKOFF_CAP_MS);
    Duration::from_millis(ms)
}

/// POSTs a compact JSON digest of each admitted batch to a webhook.
#[derive(Clone)]
pub struct WebhookBroadcaster {
    url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookBroadcaster {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_WEBHOOK_URL)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[derive(Debug, Serialize)]
struct Digest<'a> {
    event: &'static str,
    count: usize,
    articles: Vec<DigestItem<'a>>,
}

#[derive(Debug, Serialize)]
struct DigestItem<'a> {
    title: &'a str,
    url: &'a str,
    category: Category,
    provider: &'a str,
    published_at: String,
}

impl<'a> Digest<'a> {
    fn of(articles: &'a [ArticleCandidate]) -> Self {
        Self {
            event: "articles_admitted",
            count: articles.len(),
            articles: articles
                .iter()
                .map(|a| DigestItem {
                    title: &a.title,
                    url: &a.source_url,
                    category: a.category,
                    provider: &a.provider,
                    published_at: a.published_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Broadcaster for WebhookBroadcaster {
    async fn notify_admitted(&self, articles: &[ArticleCandidate]) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }
        let payload = Digest::of(articles);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(backoff(attempt)).await;
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
