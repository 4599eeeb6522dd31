// src/ingest/scheduler.rs
//! Orchestration: periodic ticks, sequential task execution, per-task error
//! isolation, daily stats and broadcast of admitted articles.
//!
//! One [`IngestionScheduler`] owns every piece of mutable ingestion state.
//! Ticks are serialized by an async run lock, so a manual "run now" queued
//! behind a scheduled tick waits for it instead of interleaving.

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::ingest::budget::{BudgetStatus, RateBudgetTracker};
use crate::ingest::config::{IngestConfig, ProviderConfig, SchedulerConfig};
use crate::ingest::dedup::DuplicateDetector;
use crate::ingest::error::IngestError;
use crate::ingest::planner::FetchPlanner;
use crate::ingest::providers::{build_adapter_table, AdapterTable, FetchParams};
use crate::ingest::stats::{DailyStats, StatsBook};
use crate::ingest::store::ArticleStore;
use crate::ingest::transform::ArticleTransformer;
use crate::ingest::types::{ArticleCandidate, Category, FetchTask};
use crate::notify::Broadcaster;

/// What started a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub provider: String,
    pub category: Category,
    pub fetched: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub error: Option<String>,
}

impl TaskReport {
    fn new(task: &FetchTask) -> Self {
        Self {
            provider: task.provider.clone(),
            category: task.category,
            fetched: 0,
            admitted: 0,
            duplicates: 0,
            rejected: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub budget_counted: bool,
    pub tasks: Vec<TaskReport>,
}

impl TickReport {
    pub fn planned(&self) -> usize {
        self.tasks.len()
    }

    pub fn admitted(&self) -> usize {
        self.tasks.iter().map(|t| t.admitted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.tasks.iter().map(|t| t.duplicates).sum()
    }

    pub fn failed(&self) -> usize {
        self.tasks.iter().filter(|t| t.error.is_some()).count()
    }
}

/// Admin status payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub now: DateTime<Utc>,
    pub daily: DailyStats,
    pub providers: Vec<BudgetStatus>,
    pub articles_stored: Option<usize>,
    pub rotation_index: usize,
}

pub struct IngestionScheduler {
    cfg: SchedulerConfig,
    providers: HashMap<String, ProviderConfig>,
    tracker: Arc<RateBudgetTracker>,
    planner: FetchPlanner,
    adapters: AdapterTable,
    transformer: ArticleTransformer,
    detector: DuplicateDetector,
    store: Arc<dyn ArticleStore>,
    broadcaster: Arc<dyn Broadcaster>,
    stats: StatsBook,
    run_lock: AsyncMutex<()>,
    broadcasts: Mutex<JoinSet<()>>,
}

impl IngestionScheduler {
    /// Build with real HTTP adapters for every configured provider.
    pub fn from_config(
        cfg: &IngestConfig,
        store: Arc<dyn ArticleStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self> {
        let adapters = build_adapter_table(&cfg.providers)?;
        Self::new(cfg, adapters, store, broadcaster)
    }

    /// Build with an explicit adapter table. Every configured provider must have an adapter.
    pub fn new(
        cfg: &IngestConfig,
        adapters: AdapterTable,
        store: Arc<dyn ArticleStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self> {
        cfg.validate()?;
        for p in &cfg.providers {
            if !adapters.contains_key(&p.name) {
                bail!("no adapter registered for provider '{}'", p.name);
            }
        }
        let offset = cfg
            .scheduler
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow::anyhow!("utc_offset_hours out of range"))?;
        let now = Utc::now();
        let tracker = Arc::new(RateBudgetTracker::new(&cfg.providers, offset, now));
        let planner = FetchPlanner::new(cfg.providers.clone(), tracker.clone(), offset);

        crate::ingest::ensure_metrics_described();

        Ok(Self {
            cfg: cfg.scheduler.clone(),
            providers: cfg
                .providers
                .iter()
                .map(|p| (p.name.clone(), p.clone()))
                .collect(),
            tracker,
            planner,
            adapters,
            transformer: ArticleTransformer::new(&cfg.transform),
            detector: DuplicateDetector::new(cfg.dedup.clone(), store.clone()),
            store,
            broadcaster,
            stats: StatsBook::new(offset, cfg.scheduler.max_errors_kept, now),
            run_lock: AsyncMutex::new(()),
            broadcasts: Mutex::new(JoinSet::new()),
        })
    }

    pub fn tracker(&self) -> &RateBudgetTracker {
        &self.tracker
    }

    pub fn planner(&self) -> &FetchPlanner {
        &self.planner
    }

    pub fn daily_stats(&self) -> DailyStats {
        self.stats.snapshot(Utc::now())
    }

    pub async fn status(&self) -> StatusSnapshot {
        let now = Utc::now();
        let articles_stored = match self.store.count().await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "article count failed");
                None
            }
        };
        StatusSnapshot {
            now,
            daily: self.stats.snapshot(now),
            providers: self.tracker.snapshot(now),
            articles_stored,
            rotation_index: self.planner.rotation_index(),
        }
    }

    /// Plan and execute one tick. Never fails: per-task errors land in the daily stats.
    pub async fn run_tick(&self, trigger: Trigger) -> TickReport {
        let _guard = self.run_lock.lock().await;
        let started_at = Utc::now();
        let budget_counted = match trigger {
            Trigger::Scheduled => true,
            Trigger::Manual => self.cfg.manual_runs_consume_budget,
        };

        let plan = self.planner.build_plan(started_at);
        tracing::info!(target: "ingest", ?trigger, tasks = plan.len(), "tick started");

        let delay = Duration::from_millis(self.cfg.task_delay_ms);
        let mut tasks = Vec::with_capacity(plan.len());
        for (i, task) in plan.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut report = TaskReport::new(task);
            if let Err(e) = self.execute_task(task, budget_counted, &mut report).await {
                tracing::warn!(
                    target: "ingest",
                    provider = %task.provider,
                    category = %task.category,
                    error = %e,
                    "task failed"
                );
                counter!("ingest_provider_errors_total", "provider" => task.provider.clone())
                    .increment(1);
                self.stats.record_error(&task.provider, &e, Utc::now());
                report.error = Some(e.to_string());
            }
            tasks.push(report);
        }

        let report = TickReport {
            trigger,
            started_at,
            budget_counted,
            tasks,
        };
        gauge!("ingest_last_tick_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            target: "ingest",
            ?trigger,
            planned = report.planned(),
            admitted = report.admitted(),
            duplicates = report.duplicates(),
            failed = report.failed(),
            "tick finished"
        );
        report
    }

    async fn execute_task(
        &self,
        task: &FetchTask,
        count_budget: bool,
        report: &mut TaskReport,
    ) -> Result<(), IngestError> {
        let adapter = self
            .adapters
            .get(&task.provider)
            .ok_or_else(|| IngestError::api(&task.provider, "no adapter registered"))?;
        let params = FetchParams {
            category: task.category,
            query: task.subtype.clone(),
        };

        let raw = adapter.fetch(&params).await?;
        let fetched_at = Utc::now();
        if count_budget {
            self.tracker.record_fetch(&task.provider, fetched_at);
        }
        counter!("ingest_fetch_total", "provider" => task.provider.clone()).increment(1);
        report.fetched = raw.len();

        let mut admitted: Vec<ArticleCandidate> = Vec::new();
        for rec in &raw {
            let candidate = match self.transformer.transform_at(rec, &task.provider, fetched_at) {
                Ok(c) => c,
                Err(e) => {
                    tracing::debug!(target: "ingest", provider = %task.provider, error = %e, "record discarded");
                    report.rejected += 1;
                    continue;
                }
            };
            if let Some(reason) = self.detector.find_duplicate(&candidate, Utc::now()).await {
                tracing::debug!(target: "ingest", provider = %task.provider, ?reason, title = %candidate.title, "duplicate");
                report.duplicates += 1;
                continue;
            }
            if let Err(e) = self.store.create(&candidate).await {
                // keep going with the rest of the batch
                tracing::warn!(target: "ingest", provider = %task.provider, error = %e, "store create failed");
                self.stats.record_error(&task.provider, &e, Utc::now());
                continue;
            }
            admitted.push(candidate);
        }

        report.admitted = admitted.len();
        let now = Utc::now();
        self.stats
            .record_admitted(&task.provider, admitted.len() as u64, now);
        self.stats
            .record_discards(report.duplicates as u64, report.rejected as u64, now);
        counter!("ingest_admitted_total", "provider" => task.provider.clone())
            .increment(admitted.len() as u64);
        counter!("ingest_duplicates_total").increment(report.duplicates as u64);
        counter!("ingest_transform_rejected_total").increment(report.rejected as u64);

        if !admitted.is_empty() {
            let sink = self.broadcaster.clone();
            let provider = task.provider.clone();
            let mut inflight = self.broadcasts.lock().expect("broadcast set mutex poisoned");
            while inflight.try_join_next().is_some() {}
            inflight.spawn(async move {
                if let Err(e) = sink.notify_admitted(&admitted).await {
                    tracing::warn!(target: "ingest", %provider, sink = sink.name(), error = ?e, "broadcaster failed; ignoring");
                }
            });
        }

        tracing::info!(
            target: "ingest",
            provider = %task.provider,
            category = %task.category,
            fetched = report.fetched,
            admitted = report.admitted,
            duplicates = report.duplicates,
            rejected = report.rejected,
            "task done"
        );
        Ok(())
    }

    /// Wait up to `limit` for detached broadcasts to finish; whatever is
    /// still running after that is aborted. Returns how many completed.
    pub async fn flush_broadcasts(&self, limit: Duration) -> usize {
        let mut set = std::mem::take(&mut *self.broadcasts.lock().expect("broadcast set mutex poisoned"));
        let mut done = 0;
        let drained = tokio::time::timeout(limit, async {
            while set.join_next().await.is_some() {
                done += 1;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(target: "ingest", pending = set.len(), "broadcasts still running; aborting");
            set.abort_all();
        }
        done
    }

    /// Provider config by name (used by the admin surface).
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Spawn the periodic loop. An immediate first tick runs when `run_on_start` is set.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = Duration::from_secs(self.cfg.interval_secs.max(1));
        let run_on_start = self.cfg.run_on_start;
        let sched = self;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !run_on_start {
                // first interval tick completes immediately; swallow it
                ticker.tick().await;
            }
            tracing::info!(target: "ingest", every_secs = period.as_secs(), "scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                if *stop_rx.borrow() {
                    break;
                }
                sched.run_tick(Trigger::Scheduled).await;
            }
            tracing::info!(target: "ingest", "scheduler stopped");
        });

        SchedulerHandle { stop_tx, join }
    }
}

/// Handle to a running scheduler loop. Dropping it stops the loop too.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Halt future ticks. A tick already running finishes.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            tracing::warn!(target: "ingest", error = ?e, "scheduler task ended abnormally");
        }
    }
}
