// src/ingest/stats.rs
//! Daily observability counters. Reset lazily when the local calendar day changes.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::ingest::error::{ErrorKind, IngestError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub provider: String,
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_admitted: u64,
    pub by_provider: BTreeMap<String, u64>,
    pub duplicates: u64,
    pub rejected: u64,
    pub errors: Vec<ErrorRecord>,
}

impl DailyStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_admitted: 0,
            by_provider: BTreeMap::new(),
            duplicates: 0,
            rejected: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct StatsBook {
    inner: Mutex<DailyStats>,
    offset: FixedOffset,
    max_errors: usize,
}

impl StatsBook {
    pub fn new(offset: FixedOffset, max_errors: usize, now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(DailyStats::empty(now.with_timezone(&offset).date_naive())),
            offset,
            max_errors: max_errors.max(1),
        }
    }

    fn with_today<R>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut DailyStats) -> R) -> R {
        let today = now.with_timezone(&self.offset).date_naive();
        let mut s = self.inner.lock().expect("stats mutex poisoned");
        if s.date != today {
            *s = DailyStats::empty(today);
        }
        f(&mut *s)
    }

    pub fn record_admitted(&self, provider: &str, n: u64, now: DateTime<Utc>) {
        if n == 0 {
            return;
        }
        self.with_today(now, |s| {
            s.total_admitted += n;
            *s.by_provider.entry(provider.to_string()).or_default() += n;
        });
    }

    pub fn record_discards(&self, duplicates: u64, rejected: u64, now: DateTime<Utc>) {
        self.with_today(now, |s| {
            s.duplicates += duplicates;
            s.rejected += rejected;
        });
    }

    pub fn record_error(&self, provider: &str, err: &IngestError, now: DateTime<Utc>) {
        let max = self.max_errors;
        self.with_today(now, |s| {
            s.errors.push(ErrorRecord {
                provider: provider.to_string(),
                kind: err.kind(),
                message: err.to_string(),
                at: now,
            });
            if s.errors.len() > max {
                let excess = s.errors.len() - max;
                s.errors.drain(0..excess);
            }
        });
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> DailyStats {
        self.with_today(now, |s| s.clone())
    }
}
