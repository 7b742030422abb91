//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval >= 1s, timeouts > 0, pool size > 0)
//! - Check target ids are present and unique
//! - Build thresholds and filters once to surface their errors
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PulseConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{PulseConfig, ThresholdConfigError};
use crate::filter::{FilterError, FilterPredicate};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("scheduler.interval_secs must be at least 1")]
    IntervalTooShort,

    #[error("scheduler.probe_timeout_ms must be greater than 0")]
    ZeroProbeTimeout,

    #[error("scheduler.max_concurrency must be greater than 0")]
    ZeroConcurrency,

    #[error("scheduler.persist_every_batches must be greater than 0")]
    ZeroPersistCadence,

    #[error("thresholds: {0}")]
    Thresholds(#[from] ThresholdConfigError),

    #[error("targets[{0}]: id cannot be empty")]
    EmptyTargetId(usize),

    #[error("targets: duplicate id '{0}'")]
    DuplicateTargetId(String),

    #[error("filters[{index}]: {source}")]
    Filter { index: usize, source: FilterError },

    #[error("observability.log_format must be 'pretty' or 'json', got '{0}'")]
    InvalidLogFormat(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PulseConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let scheduler = &config.scheduler;
    if scheduler.interval_secs < 1 {
        errors.push(ValidationError::IntervalTooShort);
    }
    if scheduler.probe_timeout_ms == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if scheduler.max_concurrency == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }
    if scheduler.persist_every_batches == 0 {
        errors.push(ValidationError::ZeroPersistCadence);
    }

    if let Err(e) = config.thresholds.build() {
        errors.push(ValidationError::Thresholds(e));
    }

    let mut seen = HashSet::new();
    for (index, target) in config.targets.iter().enumerate() {
        if target.id.trim().is_empty() {
            errors.push(ValidationError::EmptyTargetId(index));
        } else if !seen.insert(target.id.as_str()) {
            errors.push(ValidationError::DuplicateTargetId(target.id.clone()));
        }
    }

    for (index, raw) in config.filters.iter().enumerate() {
        if let Err(source) = FilterPredicate::parse(raw) {
            errors.push(ValidationError::Filter { index, source });
        }
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::InvalidLogFormat(observability.log_format.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
