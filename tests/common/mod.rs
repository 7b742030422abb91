//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use db_pulse::health::{
    HealthStore, MetricValue, MissingMetricPolicy, ProbeResult, ThresholdRule, ThresholdSet,
};
use db_pulse::probe::{Probe, ProbeFailure};
use db_pulse::registry::{Target, TargetRegistry};
use db_pulse::scheduler::{Scheduler, SchedulerSettings};

/// What a scripted probe does for one target.
#[derive(Clone)]
pub enum Step {
    Return(ProbeResult),
    Fail(ProbeFailure),
    Panic(&'static str),
}

/// Probe whose behaviour per target is fixed up front.
///
/// Every call sleeps for `delay` first, so tests running with paused time
/// control exactly when probes finish.
pub struct ScriptedProbe {
    script: Mutex<HashMap<String, Step>>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(delay: Duration) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            delay,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn on(self, target_id: &str, step: Step) -> Self {
        self.script.lock().unwrap().insert(target_id.to_string(), step);
        self
    }

    pub fn calls(&self, target_id: &str) -> usize {
        self.calls.lock().unwrap().get(target_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, target: &Target, _timeout: Duration) -> Result<ProbeResult, ProbeFailure> {
        *self.calls.lock().unwrap().entry(target.id.clone()).or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self
            .script
            .lock()
            .unwrap()
            .get(&target.id)
            .cloned()
            .unwrap_or_else(|| Step::Return(healthy()));
        match step {
            Step::Return(result) => Ok(result),
            Step::Fail(failure) => Err(failure),
            Step::Panic(message) => panic!("{}", message),
        }
    }
}

/// A reachable result with comfortable metric values.
pub fn healthy() -> ProbeResult {
    ProbeResult::reachable(5)
        .with_metric("sessions_ratio", MetricValue::Number(0.2))
        .with_metric("ts_pct", MetricValue::Number(40.0))
}

/// Thresholds used across the scenario tests.
pub fn thresholds() -> ThresholdSet {
    ThresholdSet::new(
        [
            ("sessions_ratio".to_string(), ThresholdRule::ratio(0.8, 0.95)),
            ("ts_pct".to_string(), ThresholdRule::numeric(85.0, 95.0)),
        ],
        MissingMetricPolicy::TreatAsUnknown,
    )
    .unwrap()
}

pub fn registry(ids: &[&str]) -> Arc<TargetRegistry> {
    Arc::new(
        TargetRegistry::from_targets(ids.iter().map(|id| Target::new(*id).with_environment("PROD")))
            .unwrap(),
    )
}

/// Scheduler over `ids` with the shared thresholds.
pub fn scheduler(ids: &[&str], probe: Arc<dyn Probe>, max_concurrency: usize) -> Arc<Scheduler> {
    let settings = SchedulerSettings {
        interval: Duration::from_secs(1),
        probe_timeout: Duration::from_secs(5),
        max_concurrency,
        persist_every_batches: 1,
    };
    let scheduler = Scheduler::new(
        registry(ids),
        Arc::new(HealthStore::new()),
        probe,
        thresholds(),
        settings,
    )
    .unwrap();
    scheduler.reconcile();
    Arc::new(scheduler)
}
