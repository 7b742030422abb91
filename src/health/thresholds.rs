//! Threshold rules and their validation.
//!
//! # Responsibilities
//! - Describe how each metric is judged (numeric, ratio, age, equality)
//! - Reject inconsistent rules when the set is built, before any scheduling
//! - Carry the missing-metric policy alongside the rules
//!
//! # Design Decisions
//! - A `ThresholdSet` can only exist in validated form; deserialization goes
//!   through the same checks as `ThresholdSet::new`
//! - Boundaries are inclusive for numeric/ratio rules and exclusive for age rules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::health::metric::secs;
use crate::health::state::Verdict;

/// Errors raised while building a `ThresholdSet`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationConfigError {
    #[error("Metric name cannot be empty")]
    EmptyMetricName,

    #[error("Rule for '{metric}': warn ({warn}) must be below crit ({crit})")]
    WarnNotBelowCrit {
        metric: String,
        warn: String,
        crit: String,
    },

    #[error("Rule for '{metric}': ratio boundary {value} is outside [0, 1]")]
    RatioOutOfRange { metric: String, value: f64 },

    #[error("Rule for '{metric}': boundaries must be finite numbers")]
    NonFiniteBoundary { metric: String },

    #[error("Rule for '{metric}': expected value cannot be empty")]
    EmptyExpected { metric: String },

    #[error("Rule for '{metric}': on_mismatch must be WARN or CRIT, got {verdict}")]
    InvalidMismatchVerdict { metric: String, verdict: Verdict },
}

/// How a single metric is compared against its boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// `value >= warn` is WARN, `value >= crit` is CRIT.
    Numeric { warn: f64, crit: f64 },
    /// Same as numeric, with boundaries expressed as fractions of one.
    Ratio { warn: f64, crit: f64 },
    /// Elapsed time beyond `warn`/`crit` escalates.
    Age {
        #[serde(rename = "warn_secs", with = "secs")]
        warn: Duration,
        #[serde(rename = "crit_secs", with = "secs")]
        crit: Duration,
    },
    /// Anything other than `expected` (case-insensitive) is `on_mismatch`.
    Equals {
        expected: String,
        #[serde(default = "default_mismatch")]
        on_mismatch: Verdict,
    },
}

fn default_mismatch() -> Verdict {
    Verdict::Crit
}

impl ThresholdRule {
    pub fn numeric(warn: f64, crit: f64) -> Self {
        ThresholdRule::Numeric { warn, crit }
    }

    pub fn ratio(warn: f64, crit: f64) -> Self {
        ThresholdRule::Ratio { warn, crit }
    }

    pub fn age(warn: Duration, crit: Duration) -> Self {
        ThresholdRule::Age { warn, crit }
    }

    pub fn equals(expected: impl Into<String>) -> Self {
        ThresholdRule::Equals {
            expected: expected.into(),
            on_mismatch: Verdict::Crit,
        }
    }

    /// Check internal consistency of the rule.
    pub fn validate(&self, metric: &str) -> Result<(), ClassificationConfigError> {
        match self {
            ThresholdRule::Numeric { warn, crit } => check_bounds(metric, *warn, *crit),
            ThresholdRule::Ratio { warn, crit } => {
                check_bounds(metric, *warn, *crit)?;
                for value in [*warn, *crit] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(ClassificationConfigError::RatioOutOfRange {
                            metric: metric.to_string(),
                            value,
                        });
                    }
                }
                Ok(())
            }
            ThresholdRule::Age { warn, crit } => {
                if warn >= crit {
                    return Err(ClassificationConfigError::WarnNotBelowCrit {
                        metric: metric.to_string(),
                        warn: format!("{}s", warn.as_secs_f64()),
                        crit: format!("{}s", crit.as_secs_f64()),
                    });
                }
                Ok(())
            }
            ThresholdRule::Equals { expected, on_mismatch } => {
                if expected.trim().is_empty() {
                    return Err(ClassificationConfigError::EmptyExpected {
                        metric: metric.to_string(),
                    });
                }
                if !matches!(on_mismatch, Verdict::Warn | Verdict::Crit) {
                    return Err(ClassificationConfigError::InvalidMismatchVerdict {
                        metric: metric.to_string(),
                        verdict: *on_mismatch,
                    });
                }
                Ok(())
            }
        }
    }
}

fn check_bounds(metric: &str, warn: f64, crit: f64) -> Result<(), ClassificationConfigError> {
    if !warn.is_finite() || !crit.is_finite() {
        return Err(ClassificationConfigError::NonFiniteBoundary {
            metric: metric.to_string(),
        });
    }
    if warn >= crit {
        return Err(ClassificationConfigError::WarnNotBelowCrit {
            metric: metric.to_string(),
            warn: warn.to_string(),
            crit: crit.to_string(),
        });
    }
    Ok(())
}

/// What a rule with no collected metric contributes to severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMetricPolicy {
    /// Verdict UNKNOWN, severity unaffected (fail-open).
    #[default]
    TreatAsUnknown,
    /// Verdict UNKNOWN, severity at least CRIT (fail-safe).
    TreatAsCrit,
}

/// Validated mapping of metric name to rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdSet")]
pub struct ThresholdSet {
    rules: BTreeMap<String, ThresholdRule>,
    on_missing_metric: MissingMetricPolicy,
}

#[derive(Deserialize)]
struct RawThresholdSet {
    #[serde(default)]
    rules: BTreeMap<String, ThresholdRule>,
    #[serde(default)]
    on_missing_metric: MissingMetricPolicy,
}

impl TryFrom<RawThresholdSet> for ThresholdSet {
    type Error = ClassificationConfigError;

    fn try_from(raw: RawThresholdSet) -> Result<Self, Self::Error> {
        ThresholdSet::new(raw.rules, raw.on_missing_metric)
    }
}

impl ThresholdSet {
    /// Build a set, validating every rule.
    pub fn new(
        rules: impl IntoIterator<Item = (String, ThresholdRule)>,
        on_missing_metric: MissingMetricPolicy,
    ) -> Result<Self, ClassificationConfigError> {
        let mut set = Self {
            rules: BTreeMap::new(),
            on_missing_metric,
        };
        for (metric, rule) in rules {
            set.insert(metric, rule)?;
        }
        Ok(set)
    }

    /// Add or replace a rule after validating it.
    pub fn insert(
        &mut self,
        metric: impl Into<String>,
        rule: ThresholdRule,
    ) -> Result<(), ClassificationConfigError> {
        let metric = metric.into();
        if metric.trim().is_empty() {
            return Err(ClassificationConfigError::EmptyMetricName);
        }
        rule.validate(&metric)?;
        self.rules.insert(metric, rule);
        Ok(())
    }

    pub fn with_policy(mut self, policy: MissingMetricPolicy) -> Self {
        self.on_missing_metric = policy;
        self
    }

    pub fn policy(&self) -> MissingMetricPolicy {
        self.on_missing_metric
    }

    pub fn get(&self, metric: &str) -> Option<&ThresholdRule> {
        self.rules.get(metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ThresholdRule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
