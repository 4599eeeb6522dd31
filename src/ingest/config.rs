// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Category;

pub const ENV_CONFIG_PATH: &str = "INGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/ingest.toml";
pub const DEFAULT_IMAGE_URL: &str = "https://placehold.co/600x400?text=News";

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    /// Pause between consecutive tasks of one tick.
    pub task_delay_ms: u64,
    pub run_on_start: bool,
    /// When false, manual "run now" does not count against provider budgets.
    pub manual_runs_consume_budget: bool,
    /// Offset of the local clock used for time-of-day windows and budget calendars.
    pub utc_offset_hours: i32,
    pub max_errors_kept: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1800,
            task_delay_ms: 2000,
            run_on_start: true,
            manual_runs_consume_budget: false,
            utc_offset_hours: 0,
            max_errors_kept: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Levenshtein title similarity above which a candidate is a duplicate.
    pub title_threshold: f64,
    /// Keyword Jaccard similarity above which a candidate is a duplicate.
    pub content_threshold: f64,
    pub exact_window_hours: i64,
    pub fuzzy_window_hours: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_threshold: 0.70,
            content_threshold: 0.80,
            exact_window_hours: 24,
            fuzzy_window_hours: 24 * 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub default_image_url: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_image_url: DEFAULT_IMAGE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    NewsApi,
    NewsData,
    GNews,
    AlphaVantage,
    Rss,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::NewsApi => Some("https://newsapi.org/v2"),
            ProviderKind::NewsData => Some("https://newsdata.io/api/1"),
            ProviderKind::GNews => Some("https://gnews.io/api/v4"),
            ProviderKind::AlphaVantage => Some("https://www.alphavantage.co"),
            ProviderKind::Rss => None,
        }
    }

    pub fn needs_credential(&self) -> bool {
        !matches!(self, ProviderKind::Rss)
    }

    pub fn default_window(&self) -> FetchWindow {
        match self {
            ProviderKind::AlphaVantage => FetchWindow::BusinessHours,
            ProviderKind::GNews => FetchWindow::EvenHours,
            _ => FetchWindow::Always,
        }
    }
}

/// Time-of-day gate applied by the planner on top of the rate budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchWindow {
    Always,
    /// Mon–Fri, 09:00–17:00 local.
    BusinessHours,
    /// Every other hour (even local hours).
    EvenHours,
}

/// Call budget per calendar unit. `None` means unbounded for that unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct RateBudget {
    pub per_day: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_month: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Name of an env var holding the key; resolved at load time.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub budget: RateBudget,
    #[serde(default)]
    pub priority: i32,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub window: Option<FetchWindow>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub fallback_page_size: Option<u32>,
    /// category name -> free-text query used as the task subtype.
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    20
}

impl ProviderConfig {
    /// Minimal config for a provider kind; handy for tests and tools.
    pub fn new(name: &str, kind: ProviderKind, categories: Vec<Category>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base_url: None,
            api_key: None,
            api_key_env: None,
            params: BTreeMap::new(),
            budget: RateBudget::default(),
            priority: 0,
            categories,
            window: None,
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            fallback_page_size: None,
            queries: BTreeMap::new(),
        }
    }

    pub fn effective_window(&self) -> FetchWindow {
        self.window.unwrap_or_else(|| self.kind.default_window())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .or_else(|| self.kind.default_base_url())
    }

    pub fn query_for(&self, category: Category) -> Option<String> {
        self.queries.get(category.as_str()).cloned()
    }

    pub fn credential(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    fn resolve_credential(&mut self) -> Result<()> {
        if self.api_key.is_none() {
            if let Some(var) = &self.api_key_env {
                self.api_key = std::env::var(var).ok();
            }
        }
        if self.kind.needs_credential() && self.credential().trim().is_empty() {
            bail!(
                "provider '{}' needs an api key (set api_key or env {})",
                self.name,
                self.api_key_env.as_deref().unwrap_or("<api_key_env>")
            );
        }
        Ok(())
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("no providers configured");
        }
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be > 0");
        }
        if !(-23..=23).contains(&self.scheduler.utc_offset_hours) {
            bail!(
                "scheduler.utc_offset_hours must be within -23..=23, got {}",
                self.scheduler.utc_offset_hours
            );
        }
        for (label, v) in [
            ("dedup.title_threshold", self.dedup.title_threshold),
            ("dedup.content_threshold", self.dedup.content_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("{label} must be within 0..=1, got {v}");
            }
        }
        let mut names = HashSet::new();
        for p in &self.providers {
            if p.name.trim().is_empty() {
                bail!("provider with empty name");
            }
            if !names.insert(p.name.as_str()) {
                bail!("duplicate provider name '{}'", p.name);
            }
            if p.categories.is_empty() {
                bail!("provider '{}' has no categories", p.name);
            }
            if p.base_url().is_none() {
                bail!("provider '{}' needs base_url", p.name);
            }
        }
        Ok(())
    }
}

/// Parse + resolve credentials + validate.
pub fn parse_config(s: &str) -> Result<IngestConfig> {
    let mut cfg: IngestConfig = toml::from_str(s).context("parsing ingest config toml")?;
    for p in cfg.providers.iter_mut() {
        p.resolve_credential()?;
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config_from(path: &Path) -> Result<IngestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ingest config from {}", path.display()))?;
    parse_config(&content)
}

/// Load config using env var + fallback:
/// 1) $INGEST_CONFIG_PATH
/// 2) config/ingest.toml
pub fn load_config_default() -> Result<IngestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return load_config_from(&default);
    }
    Err(anyhow!(
        "no ingest config found (set {ENV_CONFIG_PATH} or create {DEFAULT_CONFIG_PATH})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[providers]]
name = "feed"
kind = "rss"
base_url = "https://example.test/rss"
categories = ["world"]
"#;

    #[test]
    fn defaults_fill_in() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.scheduler.interval_secs, 1800);
        assert!(!cfg.scheduler.manual_runs_consume_budget);
        assert_eq!(cfg.dedup.fuzzy_window_hours, 168);
        assert_eq!(cfg.providers[0].timeout_secs, 10);
        assert_eq!(cfg.providers[0].effective_window(), FetchWindow::Always);
        assert_eq!(cfg.providers[0].budget, RateBudget::default());
    }

    #[test]
    fn keyed_provider_without_key_is_rejected() {
        let s = r#"
[[providers]]
name = "newsapi"
kind = "newsapi"
categories = ["business"]
"#;
        let err = parse_config(s).unwrap_err().to_string();
        assert!(err.contains("needs an api key"), "{err}");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let s = format!("{MINIMAL}\n{MINIMAL}");
        let err = parse_config(&s).unwrap_err().to_string();
        assert!(err.contains("duplicate provider"), "{err}");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let s = format!("[dedup]\ntitle_threshold = 1.5\n{MINIMAL}");
        assert!(parse_config(&s).is_err());
    }

    #[test]
    fn kind_defaults_apply() {
        let s = r#"
[[providers]]
name = "av"
kind = "alphavantage"
api_key = "k"
categories = ["business"]
"#;
        let cfg = parse_config(s).unwrap();
        let p = &cfg.providers[0];
        assert_eq!(p.effective_window(), FetchWindow::BusinessHours);
        assert_eq!(p.base_url(), Some("https://www.alphavantage.co"));
    }
}
