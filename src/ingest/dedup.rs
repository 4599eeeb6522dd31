// src/ingest/dedup.rs
//! Three-tier duplicate detection against the recent window of stored articles:
//! exact title (case-insensitive), exact URL, then fuzzy similarity
//! (Levenshtein ratio on titles, keyword Jaccard on title + summary).

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::ingest::config::DedupConfig;
use crate::ingest::store::ArticleStore;
use crate::ingest::types::{ArticleCandidate, ArticleSummary};

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "day", "get", "has", "him", "his", "how", "its", "may",
        "new", "now", "old", "see", "two", "who", "did", "she", "use", "way", "says", "said",
        "this", "that", "with", "from", "have", "they", "will", "would", "there", "their",
        "what", "about", "which", "when", "were", "been", "into", "than", "then", "them",
        "these", "those", "some", "more", "most", "over", "also", "after", "before", "just",
        "only", "very", "again", "while", "where", "being", "other", "could", "should",
    ]
    .into_iter()
    .collect()
});

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "score", rename_all = "snake_case")]
pub enum DuplicateReason {
    ExactTitle,
    ExactUrl,
    SimilarTitle(f64),
    SimilarContent(f64),
}

/// Levenshtein similarity ratio `(maxLen - distance) / maxLen` on lower-cased input.
/// Two empty strings are identical (1.0).
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let dist = strsim::levenshtein(&a, &b);
    (max_len - dist.min(max_len)) as f64 / max_len as f64
}

/// Lower-case, strip punctuation, split on whitespace, drop short tokens and stop words.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// `|A ∩ B| / |A ∪ B|`; empty sets carry no evidence and score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn content_keywords(title: &str, summary: &str) -> HashSet<String> {
    extract_keywords(&format!("{title} {summary}"))
}

pub struct DuplicateDetector {
    cfg: DedupConfig,
    store: Arc<dyn ArticleStore>,
}

impl DuplicateDetector {
    pub fn new(cfg: DedupConfig, store: Arc<dyn ArticleStore>) -> Self {
        Self { cfg, store }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.cfg
    }

    pub async fn is_duplicate(&self, candidate: &ArticleCandidate) -> bool {
        self.find_duplicate(candidate, Utc::now()).await.is_some()
    }

    /// Query the recent window and run the tiers. Storage failures fail open.
    pub async fn find_duplicate(
        &self,
        candidate: &ArticleCandidate,
        now: DateTime<Utc>,
    ) -> Option<DuplicateReason> {
        let widest = self.cfg.exact_window_hours.max(self.cfg.fuzzy_window_hours);
        let since = now - Duration::hours(widest);
        let recent = match self.store.find_recent(since).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "dedup lookup failed; admitting candidate");
                counter!("ingest_dedup_fail_open_total").increment(1);
                return None;
            }
        };
        self.check(candidate, &recent, now)
    }

    /// Pure tier evaluation over an already fetched window.
    pub fn check(
        &self,
        candidate: &ArticleCandidate,
        recent: &[ArticleSummary],
        now: DateTime<Utc>,
    ) -> Option<DuplicateReason> {
        let title = candidate.title.trim();
        if title.is_empty() {
            return None;
        }
        let exact_since = now - Duration::hours(self.cfg.exact_window_hours);
        let fuzzy_since = now - Duration::hours(self.cfg.fuzzy_window_hours);

        let exact: Vec<&ArticleSummary> =
            recent.iter().filter(|a| a.created_at >= exact_since).collect();

        let title_lc = title.to_lowercase();
        if exact
            .iter()
            .any(|a| a.title.trim().to_lowercase() == title_lc)
        {
            return Some(DuplicateReason::ExactTitle);
        }

        let url = candidate.source_url.trim();
        if !url.is_empty() && exact.iter().any(|a| a.source_url == url) {
            return Some(DuplicateReason::ExactUrl);
        }

        let cand_kw = content_keywords(title, &candidate.summary);
        for a in recent.iter().filter(|a| a.created_at >= fuzzy_since) {
            let ts = title_similarity(title, &a.title);
            if ts > self.cfg.title_threshold {
                return Some(DuplicateReason::SimilarTitle(ts));
            }
            let cs = jaccard(&cand_kw, &content_keywords(&a.title, &a.summary));
            if cs > self.cfg.content_threshold {
                return Some(DuplicateReason::SimilarContent(cs));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_ratio_basics() {
        assert_eq!(title_similarity("", ""), 1.0);
        assert_eq!(title_similarity("Same", "same"), 1.0);
        assert_eq!(title_similarity("abc", ""), 0.0);
        let s = title_similarity(
            "Fed Raises Interest Rates Again",
            "Federal Reserve Raises Interest Rates Again",
        );
        // distance 12 over 43 chars
        assert!((s - 31.0 / 43.0).abs() < 1e-9, "{s}");
    }

    #[test]
    fn keywords_drop_stop_words_short_tokens_and_punctuation() {
        let kw = extract_keywords("The U.S. economy, it says, is growing -- again!");
        let mut v: Vec<_> = kw.into_iter().collect();
        v.sort();
        assert_eq!(v, vec!["economy", "growing"]);
    }

    #[test]
    fn jaccard_of_empty_sets_is_zero() {
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
        let a = extract_keywords("apple banana cherry");
        let b = extract_keywords("banana cherry durian");
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
    }
}
