//! Probe scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! run_once(targets):
//!     for each target: HealthStore CAS Idle → InProgress (skip if in flight)
//!     → spawn task, wait for a pool permit (Semaphore)
//!     → dispatch.rs: Probe::check → classify (failures/panics absorbed)
//!     → HealthStore::upsert
//!     → BatchReport (report.rs), optional snapshot persistence
//!
//! auto_run.rs:
//!     loop { run_once(registry.enabled()); sleep(interval) } until stopped
//! ```
//!
//! # Design Decisions
//! - Probe tasks are detached: dropping a batch never kills an in-flight probe
//! - The probe timeout is passed to the probe; the scheduler does not cancel calls
//! - Thresholds and interval can be swapped while running (ArcSwap / atomics)

pub mod auto_run;
pub mod dispatch;
pub mod report;

pub use report::BatchReport;

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use crate::health::{classify, HealthStore, ProbeResult, ThresholdSet};
use crate::observability::metrics;
use crate::persistence::{PersistenceError, SnapshotSink};
use crate::probe::Probe;
use crate::registry::{RegistryError, Target, TargetRegistry};

use auto_run::AutoRun;

/// Smallest polling interval accepted by the scheduler.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors returned by scheduler configuration calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Polling interval {}ms is below the minimum of 1s", .0.as_millis())]
    IntervalTooShort(Duration),

    #[error("Probe timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Worker pool size must be at least 1")]
    ZeroConcurrency,
}

/// Static scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub max_concurrency: usize,
    /// Persist a snapshot after every N completed batches.
    pub persist_every_batches: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(15),
            max_concurrency: 8,
            persist_every_batches: 1,
        }
    }
}

/// Dispatches probes and records their classified results.
pub struct Scheduler {
    registry: Arc<TargetRegistry>,
    store: Arc<HealthStore>,
    probe: Arc<dyn Probe>,
    thresholds: ArcSwap<ThresholdSet>,
    interval_ms: AtomicU64,
    probe_timeout_ms: AtomicU64,
    permits: Arc<Semaphore>,
    sink: Option<Arc<dyn SnapshotSink>>,
    persist_every_batches: u64,
    batches: AtomicU64,
    auto_run: Mutex<Option<AutoRun>>,
}

impl Scheduler {
    /// Create a scheduler. Settings are validated up front.
    pub fn new(
        registry: Arc<TargetRegistry>,
        store: Arc<HealthStore>,
        probe: Arc<dyn Probe>,
        thresholds: ThresholdSet,
        settings: SchedulerSettings,
    ) -> Result<Self, SchedulerError> {
        validate_interval(settings.interval)?;
        if settings.probe_timeout.is_zero() {
            return Err(SchedulerError::ZeroTimeout);
        }
        if settings.max_concurrency == 0 {
            return Err(SchedulerError::ZeroConcurrency);
        }

        Ok(Self {
            registry,
            store,
            probe,
            thresholds: ArcSwap::from_pointee(thresholds),
            interval_ms: AtomicU64::new(settings.interval.as_millis() as u64),
            probe_timeout_ms: AtomicU64::new(settings.probe_timeout.as_millis() as u64),
            permits: Arc::new(Semaphore::new(settings.max_concurrency)),
            sink: None,
            persist_every_batches: u64::from(settings.persist_every_batches.max(1)),
            batches: AtomicU64::new(0),
            auto_run: Mutex::new(None),
        })
    }

    /// Attach a persistence sink invoked on the batch cadence.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<HealthStore> {
        &self.store
    }

    pub fn thresholds(&self) -> Arc<ThresholdSet> {
        self.thresholds.load_full()
    }

    /// Swap thresholds; the next dispatched probe uses the new set.
    pub fn set_thresholds(&self, thresholds: ThresholdSet) {
        tracing::info!(rules = thresholds.len(), "Thresholds updated");
        self.thresholds.store(Arc::new(thresholds));
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Change the auto-run interval; read again before every wait.
    pub fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        validate_interval(interval)?;
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_probe_timeout(&self, timeout: Duration) -> Result<(), SchedulerError> {
        if timeout.is_zero() {
            return Err(SchedulerError::ZeroTimeout);
        }
        self.probe_timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Bring store rows in line with the registry.
    ///
    /// Every registered target gets a row; rows of removed targets are dropped
    /// unless a check for them is still in flight.
    pub fn reconcile(&self) {
        let targets = self.registry.list();
        for target in &targets {
            self.store.track(target);
        }
        for row in self.store.rows() {
            if !self.registry.contains(&row.target_id) && !row.check_state.is_in_progress() {
                self.store.forget(&row.target_id);
            }
        }
    }

    /// Check one registered target by id.
    pub async fn run_target(&self, id: &str) -> Result<BatchReport, RegistryError> {
        let target = self.registry.get(id)?;
        Ok(self.run_once(std::slice::from_ref(&target)).await)
    }

    /// Probe every given target that is not already in flight.
    ///
    /// Returns once every dispatched probe has reported back.
    pub async fn run_once(&self, targets: &[Target]) -> BatchReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", run_id = %run_id);
        self.run_batch(run_id, targets).instrument(span).await
    }

    async fn run_batch(&self, run_id: Uuid, targets: &[Target]) -> BatchReport {
        let mut report = BatchReport::new(run_id);
        let started = Instant::now();
        let thresholds = self.thresholds.load_full();
        let timeout = self.probe_timeout();

        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            if !self.store.try_begin_check(target) {
                tracing::debug!(
                    run_id = %report.run_id,
                    target_id = %target.id,
                    "Check already in progress, skipping"
                );
                metrics::record_dispatch_skipped();
                report.skipped.push(target.id.clone());
                continue;
            }
            report.dispatched.push(target.id.clone());

            let probe = Arc::clone(&self.probe);
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&self.permits);
            let thresholds = Arc::clone(&thresholds);
            let target = target.clone();
            let target_id = target.id.clone();
            let span = tracing::debug_span!("probe", target_id = %target.id);

            let handle = tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                metrics::record_in_flight(1.0);
                let result =
                    dispatch::probe_and_classify(probe.as_ref(), &target, timeout, &thresholds).await;
                metrics::record_in_flight(-1.0);
                metrics::record_probe(&target.id, result.severity, result.elapsed_ms());
                tracing::debug!(
                    target_id = %target.id,
                    severity = %result.severity,
                    elapsed_ms = result.elapsed_ms(),
                    "Probe complete"
                );
                let severity = result.severity;
                if !store.upsert(&target.id, result) {
                    tracing::debug!(target_id = %target.id, "Target removed mid-check, result dropped");
                }
                severity
            }.instrument(span));
            handles.push((target_id, handle));
        }

        tracing::info!(
            run_id = %report.run_id,
            dispatched = report.dispatched.len(),
            skipped = report.skipped.len(),
            "Batch dispatched"
        );

        for (target_id, handle) in handles {
            match handle.await {
                Ok(severity) => report.record(severity),
                Err(e) => {
                    // Only reachable when the runtime aborts the task.
                    tracing::error!(target_id = %target_id, error = %e, "Probe task did not complete");
                    let raw = ProbeResult::unreachable(format!("probe task aborted: {}", e), 0);
                    let result = classify(&target_id, &raw, &thresholds);
                    report.record(result.severity);
                    let _ = self.store.upsert(&target_id, result);
                }
            }
        }

        report.elapsed = started.elapsed();
        metrics::record_batch(report.dispatched.len(), report.elapsed);
        tracing::info!(
            run_id = %report.run_id,
            completed = report.completed(),
            worst = ?report.worst(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch complete"
        );

        if !report.dispatched.is_empty() {
            // Drop rows of targets removed while their probe was running.
            self.reconcile();
            let batches = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
            if batches % self.persist_every_batches == 0 {
                if let Err(e) = self.persist() {
                    tracing::error!(error = %e, "Failed to persist health snapshot");
                }
            }
        }

        report
    }

    /// Write the current snapshot through the sink, if one is attached.
    pub fn persist(&self) -> Result<(), PersistenceError> {
        match &self.sink {
            Some(sink) => {
                let result = sink.persist(&self.store.snapshot());
                if result.is_err() {
                    metrics::record_persist_failure();
                }
                result
            }
            None => Ok(()),
        }
    }
}

fn validate_interval(interval: Duration) -> Result<(), SchedulerError> {
    if interval < MIN_INTERVAL {
        return Err(SchedulerError::IntervalTooShort(interval));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CheckState, MetricValue, Severity, ThresholdRule};
    use crate::probe::ProbeFailure;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Probe for Echo {
        async fn check(&self, target: &Target, _: Duration) -> Result<ProbeResult, ProbeFailure> {
            match target.id.as_str() {
                "down" => Err(ProbeFailure::Unreachable("connection refused".into())),
                _ => Ok(ProbeResult::reachable(1).with_metric("ts_pct", MetricValue::Number(90.0))),
            }
        }
    }

    fn scheduler(targets: &[&str]) -> Scheduler {
        let registry = Arc::new(
            TargetRegistry::from_targets(targets.iter().map(|id| Target::new(*id))).unwrap(),
        );
        let mut set = ThresholdSet::default();
        set.insert("ts_pct", ThresholdRule::numeric(85.0, 95.0)).unwrap();
        Scheduler::new(
            registry,
            Arc::new(HealthStore::new()),
            Arc::new(Echo),
            set,
            SchedulerSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_settings_validation() {
        let registry = Arc::new(TargetRegistry::new());
        let store = Arc::new(HealthStore::new());
        let short = SchedulerSettings {
            interval: Duration::from_millis(500),
            ..Default::default()
        };
        let err = Scheduler::new(registry.clone(), store.clone(), Arc::new(Echo), ThresholdSet::default(), short);
        assert!(matches!(err, Err(SchedulerError::IntervalTooShort(_))));

        let no_pool = SchedulerSettings {
            max_concurrency: 0,
            ..Default::default()
        };
        let err = Scheduler::new(registry, store, Arc::new(Echo), ThresholdSet::default(), no_pool);
        assert!(matches!(err, Err(SchedulerError::ZeroConcurrency)));
    }

    #[tokio::test]
    async fn test_run_once_records_each_target() {
        let scheduler = scheduler(&["up", "down"]);
        let targets = scheduler.registry().list();
        let report = scheduler.run_once(&targets).await;

        assert_eq!(report.dispatched, vec!["up".to_string(), "down".to_string()]);
        assert_eq!(report.count(Severity::Warn), 1);
        assert_eq!(report.count(Severity::Unreachable), 1);

        let store = scheduler.store();
        assert_eq!(store.get("up").unwrap().severity, Severity::Warn);
        assert_eq!(store.check_state("up"), CheckState::Complete);
        assert_eq!(store.check_state("down"), CheckState::Failed);
        assert!(store.get("down").unwrap().error_message.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_run_target_unknown_id() {
        let scheduler = scheduler(&["up"]);
        assert!(matches!(
            scheduler.run_target("nope").await,
            Err(RegistryError::NotFound(_))
        ));
        let report = scheduler.run_target("up").await.unwrap();
        assert_eq!(report.completed(), 1);
    }

    #[test]
    fn test_interval_changes_at_runtime() {
        let scheduler = scheduler(&[]);
        scheduler.set_interval(Duration::from_secs(5)).unwrap();
        assert_eq!(scheduler.interval(), Duration::from_secs(5));
        assert!(scheduler.set_interval(Duration::ZERO).is_err());
        assert_eq!(scheduler.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_reconcile_tracks_and_forgets() {
        let scheduler = scheduler(&["a", "b"]);
        scheduler.store().track(&Target::new("stale"));
        scheduler.reconcile();
        let ids: Vec<_> = scheduler.store().rows().into_iter().map(|r| r.target_id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
