// src/ingest/transform.rs
use chrono::{DateTime, Utc};

use crate::ingest::categorize::Categorizer;
use crate::ingest::config::TransformConfig;
use crate::ingest::error::IngestError;
use crate::ingest::normalize_text;
use crate::ingest::types::{ArticleCandidate, RawRecord};

/// Titles some providers emit for withdrawn items.
const REMOVED_SENTINELS: &[&str] = &["[removed]", "removed"];
const NO_IMAGE_SENTINELS: &[&str] = &["none", "null", "n/a"];
const SUMMARY_CAP: usize = 500;

/// Turns provider-native records into canonical candidates.
#[derive(Debug, Clone)]
pub struct ArticleTransformer {
    categorizer: Categorizer,
    default_image_url: String,
}

impl ArticleTransformer {
    pub fn new(cfg: &TransformConfig) -> Self {
        Self {
            categorizer: Categorizer::new(),
            default_image_url: cfg.default_image_url.clone(),
        }
    }

    pub fn transform(&self, raw: &RawRecord, provider: &str) -> Result<ArticleCandidate, IngestError> {
        self.transform_at(raw, provider, Utc::now())
    }

    /// `now` stands in for a missing publish time.
    pub fn transform_at(
        &self,
        raw: &RawRecord,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<ArticleCandidate, IngestError> {
        let title = raw.title.as_deref().map(normalize_text).unwrap_or_default();
        if title.is_empty() {
            return Err(IngestError::Transform(format!("{provider}: record without title")));
        }
        if REMOVED_SENTINELS
            .iter()
            .any(|s| title.eq_ignore_ascii_case(s))
        {
            return Err(IngestError::Transform(format!("{provider}: removed record")));
        }

        let description = raw
            .description
            .as_deref()
            .map(normalize_text)
            .filter(|d| !d.is_empty());
        let url = raw
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_default()
            .to_string();

        let summary = match &description {
            Some(d) => d.clone(),
            None => raw
                .content
                .as_deref()
                .map(normalize_text)
                .map(|c| c.chars().take(SUMMARY_CAP).collect())
                .unwrap_or_default(),
        };

        let mut parts = vec![title.clone()];
        if let Some(d) = &description {
            if !d.eq_ignore_ascii_case(&title) {
                parts.push(d.clone());
            }
        }
        if !url.is_empty() {
            parts.push(format!("Source: {url}"));
        }
        let content = parts.join("\n\n");

        let mut hint_text = format!("{title} {summary}");
        for t in &raw.tags {
            hint_text.push(' ');
            hint_text.push_str(t);
        }
        let category = self.categorizer.categorize(&hint_text);

        Ok(ArticleCandidate {
            title,
            content,
            summary,
            source_url: url,
            image_url: self.image_or_default(raw.image_url.as_deref()),
            author: raw
                .author
                .as_deref()
                .map(normalize_text)
                .unwrap_or_default(),
            category,
            published_at: raw.published_at.unwrap_or(now),
            provider: provider.to_string(),
        })
    }

    fn image_or_default(&self, image: Option<&str>) -> String {
        match image.map(str::trim) {
            Some(i) if !i.is_empty() && !NO_IMAGE_SENTINELS.iter().any(|s| i.eq_ignore_ascii_case(s)) => {
                i.to_string()
            }
            _ => self.default_image_url.clone(),
        }
    }
}
