// src/ingest/store.rs
//! Storage collaborator: the only three operations the ingestion core needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::ingest::error::IngestError;
use crate::ingest::types::{ArticleCandidate, ArticleSummary};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create(&self, article: &ArticleCandidate) -> Result<(), IngestError>;
    /// Articles created at or after `since`, newest last.
    async fn find_recent(&self, since: DateTime<Utc>) -> Result<Vec<ArticleSummary>, IngestError>;
    async fn count(&self) -> Result<usize, IngestError>;
}

#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub article: ArticleCandidate,
    pub created_at: DateTime<Utc>,
}

/// In-process store with a hard capacity; oldest entries are evicted first.
#[derive(Debug)]
pub struct MemoryArticleStore {
    inner: Mutex<VecDeque<StoredArticle>>,
    cap: usize,
}

impl MemoryArticleStore {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 100_000);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap.min(1024))),
            cap,
        }
    }

    /// Insert with an explicit creation time (seeding, tests).
    pub fn insert_at(&self, article: ArticleCandidate, created_at: DateTime<Utc>) {
        let mut v = self.inner.lock().expect("article store mutex poisoned");
        v.push_back(StoredArticle {
            article,
            created_at,
        });
        while v.len() > self.cap {
            v.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<StoredArticle> {
        let v = self.inner.lock().expect("article store mutex poisoned");
        v.iter().cloned().collect()
    }
}

impl Default for MemoryArticleStore {
    fn default() -> Self {
        Self::with_capacity(10_000)
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create(&self, article: &ArticleCandidate) -> Result<(), IngestError> {
        self.insert_at(article.clone(), Utc::now());
        Ok(())
    }

    async fn find_recent(&self, since: DateTime<Utc>) -> Result<Vec<ArticleSummary>, IngestError> {
        let v = self.inner.lock().expect("article store mutex poisoned");
        Ok(v.iter()
            .filter(|s| s.created_at >= since)
            .map(|s| ArticleSummary::of(&s.article, s.created_at))
            .collect())
    }

    async fn count(&self) -> Result<usize, IngestError> {
        Ok(self.inner.lock().expect("article store mutex poisoned").len())
    }
}
