//! Startup orchestration.
//!
//! # Responsibilities
//! - Build registry, store and scheduler from a validated config
//! - Restore the last persisted snapshot
//! - Apply reloaded configs to the running engine
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order: thresholds, registry, store, scheduler
//! - A reload never restarts the scheduler; it swaps settings in place

use std::sync::Arc;
use thiserror::Error;

use crate::config::{PulseConfig, ThresholdConfigError};
use crate::health::HealthStore;
use crate::persistence::{JsonFileSink, PersistenceError};
use crate::probe::Probe;
use crate::registry::{RegistryError, TargetRegistry};
use crate::scheduler::{Scheduler, SchedulerError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid thresholds: {0}")]
    Thresholds(#[from] ThresholdConfigError),

    #[error("Invalid targets: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid scheduler settings: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Failed to restore snapshot: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Wire the engine together.
pub fn build_scheduler(config: &PulseConfig, probe: Arc<dyn Probe>) -> Result<Arc<Scheduler>, StartupError> {
    let thresholds = config.thresholds.build()?;
    let registry = Arc::new(TargetRegistry::from_targets(config.targets.iter().cloned())?);

    let store = Arc::new(HealthStore::new());
    let sink = config
        .persistence
        .snapshot_path
        .as_ref()
        .map(|path| Arc::new(JsonFileSink::new(path.clone())));
    if let Some(sink) = &sink {
        store.load_snapshot(sink.load()?);
    }

    let mut scheduler = Scheduler::new(
        registry,
        store,
        probe,
        thresholds,
        config.scheduler_settings(),
    )?;
    if let Some(sink) = sink {
        scheduler = scheduler.with_sink(sink);
    }
    scheduler.reconcile();

    tracing::info!(
        targets = scheduler.registry().len(),
        rules = scheduler.thresholds().len(),
        interval_secs = config.scheduler.interval_secs,
        max_concurrency = config.scheduler.max_concurrency,
        "Engine initialized"
    );
    Ok(Arc::new(scheduler))
}

/// Apply a reloaded config to a running scheduler.
///
/// Targets are synced by id: new ones are added, existing ones updated,
/// missing ones removed. Pool size and persistence path need a restart.
pub fn apply_reload(scheduler: &Scheduler, config: &PulseConfig) -> Result<(), StartupError> {
    let thresholds = config.thresholds.build()?;
    scheduler.set_interval(config.scheduler.interval())?;
    scheduler.set_probe_timeout(config.scheduler.probe_timeout())?;
    scheduler.set_thresholds(thresholds);

    let registry = scheduler.registry();
    for existing in registry.list() {
        if !config.targets.iter().any(|t| t.id == existing.id) {
            registry.remove(&existing.id);
        }
    }
    for target in &config.targets {
        if registry.contains(&target.id) {
            registry.update(target.clone())?;
        } else {
            registry.add(target.clone())?;
        }
    }
    scheduler.reconcile();

    tracing::info!(
        targets = registry.len(),
        interval_secs = config.scheduler.interval_secs,
        "Configuration reloaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::health::{classify, CheckState, ProbeResult, Severity};
    use crate::probe::TcpProbe;
    use std::time::Duration;

    #[test]
    fn test_build_and_reload() {
        let config = parse_config(
            r#"
            [thresholds]
            preset = "goldengate"

            [[targets]]
            id = "gg1"

            [[targets]]
            id = "gg2"
            "#,
        )
        .unwrap();
        let scheduler = build_scheduler(&config, Arc::new(TcpProbe::new())).unwrap();
        assert_eq!(scheduler.store().len(), 2);
        assert_eq!(scheduler.thresholds().len(), 2);

        let reloaded = parse_config(
            r#"
            [scheduler]
            interval_secs = 20

            [[targets]]
            id = "gg2"
            environment = "PROD"

            [[targets]]
            id = "gg3"
            "#,
        )
        .unwrap();
        apply_reload(&scheduler, &reloaded).unwrap();

        let ids: Vec<_> = scheduler.registry().list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["gg2".to_string(), "gg3".to_string()]);
        assert_eq!(scheduler.registry().get("gg2").unwrap().environment, "PROD");
        assert_eq!(scheduler.interval(), Duration::from_secs(20));
        assert!(scheduler.thresholds().is_empty());
        assert!(scheduler.store().row("gg1").is_none());
    }

    #[test]
    fn test_restores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        let config = parse_config(&format!(
            "[persistence]\nsnapshot_path = {:?}\n[[targets]]\nid = \"db1\"\n",
            path.display().to_string()
        ))
        .unwrap();

        let first = build_scheduler(&config, Arc::new(TcpProbe::new())).unwrap();
        let raw = ProbeResult::unreachable("connection refused", 3);
        first.store().upsert("db1", classify("db1", &raw, &first.thresholds()));
        first.persist().unwrap();

        let second = build_scheduler(&config, Arc::new(TcpProbe::new())).unwrap();
        let restored = second.store().get("db1").unwrap();
        assert_eq!(restored.severity, Severity::Unreachable);
        assert_eq!(second.store().check_state("db1"), CheckState::Failed);
    }
}
