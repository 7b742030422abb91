//! Health verdicts and the per-target check lifecycle.
//!
//! # States
//! - `Severity`: aggregated verdict for a target (OK < WARN < CRIT < UNREACHABLE)
//! - `Verdict`: per-metric outcome (OK, WARN, CRIT, UNKNOWN)
//! - `CheckState`: operational marker, independent of severity
//!
//! # State Transitions
//! ```text
//! Idle/Complete/Failed → InProgress: on dispatch (compare-and-set)
//! InProgress → Complete: probe returned, target reachable
//! InProgress → Failed: probe errored or target unreachable
//! any → Idle: explicit clear only
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregated health of a target.
///
/// Variants are declared in ascending order of badness so `Ord` yields worst-of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warn,
    Crit,
    Unreachable,
}

impl Severity {
    /// Numeric rank, used for gauges and numeric filters.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warn => 1,
            Severity::Crit => 2,
            Severity::Unreachable => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Crit => "CRIT",
            Severity::Unreachable => "UNREACHABLE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying one threshold rule to one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Ok,
    Warn,
    Crit,
    Unknown,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Warn => "WARN",
            Verdict::Crit => "CRIT",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational lifecycle of a target's check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    #[default]
    Idle,
    InProgress,
    Complete,
    Failed,
}

impl CheckState {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckState::Idle => "idle",
            CheckState::InProgress => "in_progress",
            CheckState::Complete => "complete",
            CheckState::Failed => "failed",
        }
    }

    pub fn is_in_progress(self) -> bool {
        matches!(self, CheckState::InProgress)
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_is_worst_of() {
        let worst = [Severity::Warn, Severity::Ok, Severity::Crit]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, Severity::Crit);
        assert!(Severity::Unreachable > Severity::Crit);
        assert_eq!(Severity::Unreachable.rank(), 3);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Severity::Unreachable).unwrap(), "\"UNREACHABLE\"");
        assert_eq!(serde_json::to_string(&CheckState::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(CheckState::default(), CheckState::Idle);
    }
}
