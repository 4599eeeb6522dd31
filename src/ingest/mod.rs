// src/ingest/mod.rs
pub mod budget;
pub mod categorize;
pub mod config;
pub mod dedup;
pub mod error;
pub mod planner;
pub mod providers;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod transform;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use scheduler::{IngestionScheduler, SchedulerHandle, TickReport, Trigger};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_fetch_total", "Provider calls that returned a payload.");
        describe_counter!("ingest_admitted_total", "Articles admitted to storage.");
        describe_counter!(
            "ingest_duplicates_total",
            "Candidates rejected as duplicates."
        );
        describe_counter!(
            "ingest_transform_rejected_total",
            "Raw records discarded by the transformer."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Task failures (transport, api, storage)."
        );
        describe_counter!(
            "ingest_dedup_fail_open_total",
            "Duplicate checks skipped because the store query failed."
        );
        describe_histogram!("ingest_fetch_ms", "Provider round-trip in milliseconds.");
        describe_gauge!("ingest_last_tick_ts", "Unix ts when the last tick finished.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, trim stray punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Drop trailing separators left by truncating providers ("...", " -", ",")
    loop {
        let t = out.trim_end_matches([',', '-', '|', ';', '…']).trim_end();
        let t = t.strip_suffix("...").unwrap_or(t).trim_end();
        if t.len() == out.len() {
            break;
        }
        out = t.to_string();
    }

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}
