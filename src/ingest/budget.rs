// src/ingest/budget.rs
//! Per-provider call budgets (daily / hourly / monthly) with lazy rollover.
//!
//! Counters are reset when the wall-clock calendar unit changes, detected on
//! access. No background timer is involved. The tracker is advisory: callers
//! check [`RateBudgetTracker::can_fetch`] before calling
//! [`RateBudgetTracker::record_fetch`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ingest::config::{ProviderConfig, RateBudget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateCounters {
    pub daily_count: u32,
    pub hourly_count: u32,
    pub monthly_count: u32,
    pub last_day_reset: NaiveDate,
    /// Local hour (0..24) of `last_hour_date` at which the hourly counter was reset.
    pub last_hour_reset: u32,
    pub last_hour_date: NaiveDate,
    /// First day of the month in which the monthly counter was reset.
    pub last_month_reset: NaiveDate,
}

impl RateCounters {
    fn fresh(local: DateTime<FixedOffset>) -> Self {
        let day = local.date_naive();
        Self {
            daily_count: 0,
            hourly_count: 0,
            monthly_count: 0,
            last_day_reset: day,
            last_hour_reset: local.hour(),
            last_hour_date: day,
            last_month_reset: first_of_month(day),
        }
    }

    /// Zero every counter whose calendar unit rolled over since the last reset.
    fn roll_forward(&mut self, local: DateTime<FixedOffset>) {
        let day = local.date_naive();
        if day != self.last_day_reset {
            self.daily_count = 0;
            self.last_day_reset = day;
        }
        if day != self.last_hour_date || local.hour() != self.last_hour_reset {
            self.hourly_count = 0;
            self.last_hour_date = day;
            self.last_hour_reset = local.hour();
        }
        let month = first_of_month(day);
        if month != self.last_month_reset {
            self.monthly_count = 0;
            self.last_month_reset = month;
        }
    }

    fn has_headroom(&self, budget: &RateBudget) -> bool {
        let ok = |limit: Option<u32>, used: u32| limit.map_or(true, |l| used < l);
        ok(budget.per_day, self.daily_count)
            && ok(budget.per_hour, self.hourly_count)
            && ok(budget.per_month, self.monthly_count)
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

#[derive(Debug)]
struct Entry {
    budget: RateBudget,
    counters: RateCounters,
}

/// Snapshot row for the admin status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub provider: String,
    pub budget: RateBudget,
    pub counters: RateCounters,
}

#[derive(Debug)]
pub struct RateBudgetTracker {
    inner: Mutex<HashMap<String, Entry>>,
    offset: FixedOffset,
}

impl RateBudgetTracker {
    pub fn new(providers: &[ProviderConfig], offset: FixedOffset, now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&offset);
        let inner = providers
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    Entry {
                        budget: p.budget,
                        counters: RateCounters::fresh(local),
                    },
                )
            })
            .collect();
        Self {
            inner: Mutex::new(inner),
            offset,
        }
    }

    /// Whether every configured budget of `provider` still has headroom at `now`.
    pub fn can_fetch(&self, provider: &str, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);
        let mut map = self.inner.lock().expect("rate tracker mutex poisoned");
        match map.get_mut(provider) {
            Some(e) => {
                e.counters.roll_forward(local);
                e.counters.has_headroom(&e.budget)
            }
            None => {
                tracing::warn!(target: "ingest", provider, "budget check for unknown provider");
                false
            }
        }
    }

    /// Count one call against all three units. Does not check headroom.
    pub fn record_fetch(&self, provider: &str, now: DateTime<Utc>) {
        let local = now.with_timezone(&self.offset);
        let mut map = self.inner.lock().expect("rate tracker mutex poisoned");
        if let Some(e) = map.get_mut(provider) {
            e.counters.roll_forward(local);
            e.counters.daily_count = e.counters.daily_count.saturating_add(1);
            e.counters.hourly_count = e.counters.hourly_count.saturating_add(1);
            e.counters.monthly_count = e.counters.monthly_count.saturating_add(1);
        }
    }

    pub fn status(&self, provider: &str, now: DateTime<Utc>) -> Option<RateCounters> {
        let local = now.with_timezone(&self.offset);
        let mut map = self.inner.lock().expect("rate tracker mutex poisoned");
        map.get_mut(provider).map(|e| {
            e.counters.roll_forward(local);
            e.counters.clone()
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<BudgetStatus> {
        let local = now.with_timezone(&self.offset);
        let mut map = self.inner.lock().expect("rate tracker mutex poisoned");
        let mut out: Vec<BudgetStatus> = map
            .iter_mut()
            .map(|(name, e)| {
                e.counters.roll_forward(local);
                BudgetStatus {
                    provider: name.clone(),
                    budget: e.budget,
                    counters: e.counters.clone(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.provider.cmp(&b.provider));
        out
    }
}
