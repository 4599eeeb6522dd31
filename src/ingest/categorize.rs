// src/ingest/categorize.rs
//! Keyword-weighted category scorer.
//!
//! Each keyword hit is a whole-word match on lower-cased text. Keywords longer
//! than five characters weigh 2, shorter ones 1. Highest total wins; ties go to
//! the category declared first; an all-zero score falls back to `General`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::Category;

const TABLE: &[(Category, &[&str])] = &[
    (
        Category::Business,
        &[
            "market", "markets", "stock", "stocks", "shares", "earnings", "revenue", "profit",
            "economy", "inflation", "interest rate", "fed", "bank", "investor", "merger",
            "acquisition", "ipo", "nasdaq", "dow", "trade", "tariff", "gdp",
        ],
    ),
    (
        Category::Technology,
        &[
            "tech", "software", "hardware", "ai", "artificial intelligence", "startup",
            "apple", "google", "microsoft", "chip", "semiconductor", "smartphone", "app",
            "cyber", "cloud", "robot", "developer",
        ],
    ),
    (
        Category::Crypto,
        &[
            "bitcoin", "btc", "ethereum", "eth", "crypto", "cryptocurrency", "blockchain",
            "wallet", "exchange", "token", "defi", "nft", "stablecoin", "altcoin", "mining",
        ],
    ),
    (
        Category::Politics,
        &[
            "election", "senate", "congress", "president", "parliament", "minister", "vote",
            "campaign", "policy", "democrat", "republican", "government", "bill", "law",
        ],
    ),
    (
        Category::Science,
        &[
            "science", "research", "study", "scientists", "space", "nasa", "physics",
            "climate", "species", "telescope", "discovery",
        ],
    ),
    (
        Category::Health,
        &[
            "health", "medical", "vaccine", "virus", "disease", "hospital", "doctor", "cancer",
            "drug", "fda", "patients", "covid",
        ],
    ),
    (
        Category::Sports,
        &[
            "football", "soccer", "basketball", "tennis", "olympics", "match", "league",
            "tournament", "coach", "championship", "nba", "nfl", "goal",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "movie", "film", "music", "celebrity", "album", "hollywood", "netflix", "actor",
            "actress", "concert", "series", "box office",
        ],
    ),
    (
        Category::World,
        &[
            "war", "un", "united nations", "refugees", "border", "summit", "diplomat",
            "ceasefire", "sanctions", "embassy", "international",
        ],
    ),
];

struct Keyword {
    re: Regex,
    weight: u32,
}

static COMPILED: Lazy<Vec<(Category, Vec<Keyword>)>> = Lazy::new(|| compile(TABLE));

fn compile(table: &[(Category, &[&str])]) -> Vec<(Category, Vec<Keyword>)> {
    table
        .iter()
        .map(|(cat, words)| {
            let kws = words
                .iter()
                .map(|w| Keyword {
                    re: Regex::new(&format!(r"\b{}\b", regex::escape(w))).expect("keyword regex"),
                    weight: if w.chars().count() > 5 { 2 } else { 1 },
                })
                .collect();
            (*cat, kws)
        })
        .collect()
}

/// Pure, stateless categorizer over the built-in keyword table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Categorizer;

impl Categorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn categorize(&self, text: &str) -> Category {
        let (cat, _) = self.best(text);
        cat
    }

    /// Winning category together with its score.
    pub fn best(&self, text: &str) -> (Category, u32) {
        let lower = text.to_lowercase();
        let mut best = (Category::General, 0u32);
        for (cat, kws) in COMPILED.iter() {
            let score: u32 = kws
                .iter()
                .map(|k| k.re.find_iter(&lower).count() as u32 * k.weight)
                .sum();
            // strictly greater: first declared category keeps ties
            if score > best.1 {
                best = (*cat, score);
            }
        }
        best
    }

    /// Per-category scores in declaration order (diagnostics).
    pub fn scores(&self, text: &str) -> Vec<(Category, u32)> {
        let lower = text.to_lowercase();
        COMPILED
            .iter()
            .map(|(cat, kws)| {
                let s = kws
                    .iter()
                    .map(|k| k.re.find_iter(&lower).count() as u32 * k.weight)
                    .sum();
                (*cat, s)
            })
            .collect()
    }
}
