//! Summary of one scheduling batch.

use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::health::Severity;

/// What happened during one `run_once` call.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Correlates log lines of one batch.
    pub run_id: Uuid,
    /// Targets a probe was dispatched for.
    pub dispatched: Vec<String>,
    /// Targets skipped because a check was already in flight.
    pub skipped: Vec<String>,
    /// Resulting severities of dispatched targets.
    pub severities: BTreeMap<Severity, usize>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            dispatched: Vec::new(),
            skipped: Vec::new(),
            severities: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, severity: Severity) {
        *self.severities.entry(severity).or_default() += 1;
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severities.get(&severity).copied().unwrap_or(0)
    }

    pub fn completed(&self) -> usize {
        self.severities.values().sum()
    }

    /// Worst severity observed in this batch, if anything completed.
    pub fn worst(&self) -> Option<Severity> {
        self.severities.keys().max().copied()
    }
}
