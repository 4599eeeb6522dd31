// src/ingest/planner.rs
//! Builds the ordered task list for one scheduling tick.
//!
//! A provider gets a task when its budget has headroom and its time-of-day
//! window is open. Its category comes from one rotation counter shared by all
//! providers, so consecutive ticks spread coverage instead of every provider
//! restarting at its first category.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ingest::budget::RateBudgetTracker;
use crate::ingest::config::{FetchWindow, ProviderConfig};
use crate::ingest::types::FetchTask;

const BUSINESS_OPEN_HOUR: u32 = 9;
const BUSINESS_CLOSE_HOUR: u32 = 17;

/// Whether `window` admits a fetch at local time `local`.
pub fn window_open(window: FetchWindow, local: DateTime<FixedOffset>) -> bool {
    match window {
        FetchWindow::Always => true,
        FetchWindow::BusinessHours => {
            !matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
                && (BUSINESS_OPEN_HOUR..BUSINESS_CLOSE_HOUR).contains(&local.hour())
        }
        FetchWindow::EvenHours => local.hour() % 2 == 0,
    }
}

pub struct FetchPlanner {
    providers: Vec<ProviderConfig>,
    tracker: Arc<RateBudgetTracker>,
    offset: FixedOffset,
    rotation: AtomicUsize,
}

impl FetchPlanner {
    pub fn new(providers: Vec<ProviderConfig>, tracker: Arc<RateBudgetTracker>, offset: FixedOffset) -> Self {
        Self {
            providers,
            tracker,
            offset,
            rotation: AtomicUsize::new(0),
        }
    }

    pub fn rotation_index(&self) -> usize {
        self.rotation.load(Ordering::Relaxed)
    }

    /// Tasks for this tick, sorted by ascending provider priority. May be empty.
    pub fn build_plan(&self, now: DateTime<Utc>) -> Vec<FetchTask> {
        let local = now.with_timezone(&self.offset);
        let mut tasks = Vec::new();
        for p in &self.providers {
            if !window_open(p.effective_window(), local) {
                tracing::debug!(target: "ingest", provider = %p.name, "outside fetch window");
                continue;
            }
            if !self.tracker.can_fetch(&p.name, now) {
                tracing::debug!(target: "ingest", provider = %p.name, "rate budget exhausted");
                continue;
            }
            if p.categories.is_empty() {
                continue;
            }
            let idx = self.rotation.fetch_add(1, Ordering::Relaxed);
            let category = p.categories[idx % p.categories.len()];
            tasks.push(FetchTask {
                provider: p.name.clone(),
                category,
                subtype: p.query_for(category),
                priority: p.priority,
            });
        }
        // stable: equal priorities keep config order
        tasks.sort_by_key(|t| t.priority);
        tasks
    }
}
