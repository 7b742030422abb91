//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::presets;
use crate::filter::{self, FilterError, FilterSet};
use crate::health::{ClassificationConfigError, MissingMetricPolicy, ThresholdRule, ThresholdSet};
use crate::registry::Target;
use crate::scheduler::SchedulerSettings;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PulseConfig {
    /// Polling cadence and worker pool.
    pub scheduler: SchedulerConfig,

    /// Threshold preset and per-metric overrides.
    pub thresholds: ThresholdConfig,

    /// Monitored targets.
    pub targets: Vec<Target>,

    /// Default row filters, `field op value`.
    pub filters: Vec<String>,

    /// Snapshot persistence.
    pub persistence: PersistenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl PulseConfig {
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: self.scheduler.interval(),
            probe_timeout: self.scheduler.probe_timeout(),
            max_concurrency: self.scheduler.max_concurrency,
            persist_every_batches: self.scheduler.persist_every_batches,
        }
    }

    pub fn filter_set(&self) -> Result<FilterSet, FilterError> {
        filter::parse_all(&self.filters)
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between auto-run batches (minimum 1).
    pub interval_secs: u64,

    /// Per-probe timeout handed to the probe.
    pub probe_timeout_ms: u64,

    /// Maximum probes running at once.
    pub max_concurrency: usize,

    /// Persist a snapshot after every N batches.
    pub persist_every_batches: u32,

    /// Start polling immediately in `run` mode.
    pub auto_run: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            probe_timeout_ms: 15_000,
            max_concurrency: 8,
            persist_every_batches: 1,
            auto_run: true,
        }
    }
}

/// Threshold configuration. Overrides replace preset rules of the same name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// One of `oracle`, `sqlserver`, `goldengate`.
    pub preset: Option<String>,

    pub on_missing_metric: MissingMetricPolicy,

    pub rules: BTreeMap<String, ThresholdRule>,
}

/// Why a `ThresholdConfig` could not be turned into a `ThresholdSet`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdConfigError {
    #[error("Unknown threshold preset '{0}'")]
    UnknownPreset(String),

    #[error(transparent)]
    Rule(#[from] ClassificationConfigError),
}

impl ThresholdConfig {
    /// Merge preset and overrides into a validated set.
    pub fn build(&self) -> Result<ThresholdSet, ThresholdConfigError> {
        let mut rules: BTreeMap<String, ThresholdRule> = BTreeMap::new();
        if let Some(name) = &self.preset {
            let preset = presets::preset(name)
                .ok_or_else(|| ThresholdConfigError::UnknownPreset(name.clone()))?;
            rules.extend(preset);
        }
        rules.extend(self.rules.clone());
        Ok(ThresholdSet::new(rules, self.on_missing_metric)?)
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// JSON snapshot file; persistence is off when unset.
    pub snapshot_path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
