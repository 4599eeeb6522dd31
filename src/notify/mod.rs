// src/notify/mod.rs
//! Broadcast of newly admitted articles. Fire-and-forget: failures are logged
//! by the caller and never affect ingestion.

pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::ingest::types::ArticleCandidate;

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn notify_admitted(&self, articles: &[ArticleCandidate]) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Writes one log line per admitted batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBroadcaster;

#[async_trait]
impl Broadcaster for LogBroadcaster {
    async fn notify_admitted(&self, articles: &[ArticleCandidate]) -> Result<()> {
        for a in articles {
            tracing::info!(
                target: "broadcast",
                provider = %a.provider,
                category = %a.category,
                title = %a.title,
                "article admitted"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Fans a batch out to every configured sink; one sink failing does not stop the rest.
#[derive(Clone, Default)]
pub struct BroadcasterMux {
    sinks: Vec<Arc<dyn Broadcaster>>,
}

impl BroadcasterMux {
    pub fn new(sinks: Vec<Arc<dyn Broadcaster>>) -> Self {
        Self { sinks }
    }

    /// Log sink always; webhook sink when `NEWS_WEBHOOK_URL` is set.
    pub fn from_env() -> Self {
        let mut sinks: Vec<Arc<dyn Broadcaster>> = vec![Arc::new(LogBroadcaster)];
        if let Some(wh) = webhook::WebhookBroadcaster::from_env() {
            sinks.push(Arc::new(wh));
        }
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Broadcaster for BroadcasterMux {
    async fn notify_admitted(&self, articles: &[ArticleCandidate]) -> Result<()> {
        let mut failed = Vec::new();
        for s in &self.sinks {
            if let Err(e) = s.notify_admitted(articles).await {
                tracing::warn!(target: "broadcast", sink = s.name(), error = ?e, "broadcast failed");
                failed.push(s.name());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("broadcast failed for: {}", failed.join(", "))
        }
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
