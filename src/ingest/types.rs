// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed category taxonomy. Declaration order is the tie-break order used by
/// the categorizer, so do not reorder casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Business,
    Technology,
    Crypto,
    Politics,
    Science,
    Health,
    Sports,
    Entertainment,
    World,
    General,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Business,
        Category::Technology,
        Category::Crypto,
        Category::Politics,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::World,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Crypto => "crypto",
            Category::Politics => "politics",
            Category::Science => "science",
            Category::Health => "health",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::World => "world",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == t)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// One planned (provider, category) unit of work for a scheduling tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchTask {
    pub provider: String,
    pub category: Category,
    /// Free-text query for providers that search rather than browse.
    pub subtype: Option<String>,
    pub priority: i32,
}

/// Provider-native record, already decoded out of the provider's envelope but
/// not yet normalized. Every field is optional because providers disagree on
/// what they send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Provider-supplied category hints / tags / topics.
    pub tags: Vec<String>,
}

/// Canonical normalized article flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub source_url: String,
    pub image_url: String,
    pub author: String,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub provider: String,
}

/// Projection of a stored article used for duplicate comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub summary: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

impl ArticleSummary {
    pub fn of(article: &ArticleCandidate, created_at: DateTime<Utc>) -> Self {
        Self {
            title: article.title.clone(),
            summary: article.summary.clone(),
            source_url: article.source_url.clone(),
            created_at,
        }
    }
}
