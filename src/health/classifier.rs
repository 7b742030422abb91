//! Classification of raw probe results.
//!
//! # Responsibilities
//! - Judge each metric that has a rule (OK / WARN / CRIT / UNKNOWN)
//! - Aggregate verdicts into one severity (worst-of)
//! - Explain every non-OK verdict with a note
//!
//! # Design Decisions
//! - Pure: the only clock is `ProbeResult::collected_at`
//! - Unreachable targets are UNREACHABLE; reachable targets whose probe
//!   reported an error are at least CRIT
//! - Metrics without a rule are kept in `raw` but receive no verdict

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::health::metric::{MetricValue, ProbeResult};
use crate::health::state::{Severity, Verdict};
use crate::health::thresholds::{MissingMetricPolicy, ThresholdRule, ThresholdSet};

/// A probe result after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedResult {
    pub target_id: String,
    pub severity: Severity,
    pub verdicts: BTreeMap<String, Verdict>,
    /// One line per non-OK verdict or probe error.
    #[serde(default)]
    pub notes: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub error_message: Option<String>,
    pub raw: ProbeResult,
}

impl ClassifiedResult {
    pub fn verdict(&self, metric: &str) -> Option<Verdict> {
        self.verdicts.get(metric).copied()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.raw.elapsed_ms
    }
}

/// Classify one probe result against a threshold set.
pub fn classify(target_id: &str, result: &ProbeResult, thresholds: &ThresholdSet) -> ClassifiedResult {
    let mut verdicts = BTreeMap::new();
    let mut notes = Vec::new();

    if !result.reachable {
        notes.push(format!(
            "unreachable: {}",
            result.error_message.as_deref().unwrap_or("no response")
        ));
    } else if let Some(error) = &result.error_message {
        notes.push(format!("probe error: {}", error));
    }

    for (metric, rule) in thresholds.iter() {
        let (verdict, note) = match result.metrics.get(metric) {
            Some(value) => judge(metric, rule, value, result.collected_at),
            None if result.reachable => (Verdict::Unknown, Some(format!("{}: not collected", metric))),
            None => (Verdict::Unknown, None),
        };
        if let Some(note) = note {
            notes.push(note);
        }
        verdicts.insert(metric.clone(), verdict);
    }

    let severity = aggregate(
        &verdicts,
        thresholds.policy(),
        result.reachable,
        result.error_message.is_some(),
    );

    ClassifiedResult {
        target_id: target_id.to_string(),
        severity,
        verdicts,
        notes,
        timestamp: result.collected_at,
        error_message: result.error_message.clone(),
        raw: result.clone(),
    }
}

/// Derive severity from verdicts alone.
///
/// `reachable = false` forces UNREACHABLE; a probe error forces at least CRIT.
pub fn aggregate(
    verdicts: &BTreeMap<String, Verdict>,
    policy: MissingMetricPolicy,
    reachable: bool,
    errored: bool,
) -> Severity {
    if !reachable {
        return Severity::Unreachable;
    }

    let worst = verdicts
        .values()
        .map(|verdict| match (verdict, policy) {
            (Verdict::Ok, _) => Severity::Ok,
            (Verdict::Warn, _) => Severity::Warn,
            (Verdict::Crit, _) => Severity::Crit,
            (Verdict::Unknown, MissingMetricPolicy::TreatAsUnknown) => Severity::Ok,
            (Verdict::Unknown, MissingMetricPolicy::TreatAsCrit) => Severity::Crit,
        })
        .max()
        .unwrap_or(Severity::Ok);

    if errored {
        worst.max(Severity::Crit)
    } else {
        worst
    }
}

fn judge(
    metric: &str,
    rule: &ThresholdRule,
    value: &MetricValue,
    now: DateTime<Utc>,
) -> (Verdict, Option<String>) {
    match rule {
        ThresholdRule::Numeric { warn, crit } | ThresholdRule::Ratio { warn, crit } => {
            let MetricValue::Number(n) = value else {
                return mismatch(metric, rule, value);
            };
            if n.is_nan() {
                (Verdict::Unknown, Some(format!("{}: value is not a number", metric)))
            } else if n >= crit {
                (Verdict::Crit, Some(format!("{} {} >= crit {}", metric, n, crit)))
            } else if n >= warn {
                (Verdict::Warn, Some(format!("{} {} >= warn {}", metric, n, warn)))
            } else {
                (Verdict::Ok, None)
            }
        }
        ThresholdRule::Age { warn, crit } => {
            let age = match value {
                MetricValue::Duration(d) => *d,
                MetricValue::Timestamp(ts) => (now - *ts).to_std().unwrap_or(Duration::ZERO),
                _ => return mismatch(metric, rule, value),
            };
            if age > *crit {
                (
                    Verdict::Crit,
                    Some(format!("{} age {} > crit {}", metric, human(age), human(*crit))),
                )
            } else if age > *warn {
                (
                    Verdict::Warn,
                    Some(format!("{} age {} > warn {}", metric, human(age), human(*warn))),
                )
            } else {
                (Verdict::Ok, None)
            }
        }
        ThresholdRule::Equals { expected, on_mismatch } => {
            let actual = value.to_string();
            if actual.trim().eq_ignore_ascii_case(expected.trim()) {
                (Verdict::Ok, None)
            } else {
                (
                    *on_mismatch,
                    Some(format!("{} is {}, expected {}", metric, actual, expected)),
                )
            }
        }
    }
}

fn mismatch(metric: &str, rule: &ThresholdRule, value: &MetricValue) -> (Verdict, Option<String>) {
    let kind = match rule {
        ThresholdRule::Numeric { .. } => "numeric",
        ThresholdRule::Ratio { .. } => "ratio",
        ThresholdRule::Age { .. } => "age",
        ThresholdRule::Equals { .. } => "equals",
    };
    (
        Verdict::Unknown,
        Some(format!("{}: {} value cannot be judged by a {} rule", metric, value.kind(), kind)),
    )
}

fn human(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        s if s >= 86_400 => format!("{}d {}h", s / 86_400, (s % 86_400) / 3600),
        s if s >= 3600 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s if s >= 60 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}s", s),
    }
}
