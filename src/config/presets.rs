//! Built-in threshold presets per database family.
//!
//! Metric names are the ones the matching probes report.

use std::time::Duration;

use crate::health::{ThresholdRule, Verdict};

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Names accepted by `thresholds.preset`.
pub const PRESET_NAMES: &[&str] = &["oracle", "sqlserver", "goldengate"];

/// Look up a preset by name (case-insensitive).
pub fn preset(name: &str) -> Option<Vec<(String, ThresholdRule)>> {
    match name.to_ascii_lowercase().as_str() {
        "oracle" => Some(oracle()),
        "sqlserver" => Some(sqlserver()),
        "goldengate" => Some(goldengate()),
        _ => None,
    }
}

fn oracle() -> Vec<(String, ThresholdRule)> {
    vec![
        ("sessions_ratio".into(), ThresholdRule::ratio(0.85, 0.95)),
        ("worst_ts_pct".into(), ThresholdRule::numeric(85.0, 90.0)),
        (
            "last_arch_backup".into(),
            ThresholdRule::age(Duration::from_secs(12 * HOUR), Duration::from_secs(24 * HOUR)),
        ),
        (
            "last_full_backup".into(),
            ThresholdRule::age(Duration::from_secs(3 * DAY), Duration::from_secs(4 * DAY)),
        ),
        ("instance_status".into(), ThresholdRule::equals("OPEN")),
    ]
}

fn sqlserver() -> Vec<(String, ThresholdRule)> {
    vec![
        ("max_disk_pct".into(), ThresholdRule::numeric(85.0, 92.0)),
        (
            "last_full_backup".into(),
            ThresholdRule::age(Duration::from_secs(2 * DAY), Duration::from_secs(4 * DAY)),
        ),
        (
            "agent_status".into(),
            ThresholdRule::Equals {
                expected: "Running".into(),
                on_mismatch: Verdict::Warn,
            },
        ),
    ]
}

fn goldengate() -> Vec<(String, ThresholdRule)> {
    vec![
        (
            "max_lag".into(),
            ThresholdRule::age(Duration::from_secs(30 * 60), Duration::from_secs(60 * 60)),
        ),
        ("process_status".into(), ThresholdRule::equals("RUNNING")),
    ]
}
