//! Last-known health per target.
//!
//! # Responsibilities
//! - Hold at most one row per target id
//! - Track the operational check state next to the classified result
//! - Hand out snapshot copies to readers (filters, exports, persistence)
//!
//! # Design Decisions
//! - One `RwLock` guards the whole map; every reader gets an owned copy
//! - Idle → InProgress is a compare-and-set under the write lock
//! - Clearing never drops the row: id and environment survive

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::health::classifier::ClassifiedResult;
use crate::health::state::{CheckState, Severity};
use crate::registry::Target;

/// Errors returned by store lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("No health recorded for target '{0}'")]
    NotFound(String),
}

/// One row of the health table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRow {
    pub target_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub check_state: CheckState,
    /// `None` until the first check completes, and again after a clear.
    #[serde(default)]
    pub result: Option<ClassifiedResult>,
}

impl HealthRow {
    pub fn new(target_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            environment: environment.into(),
            check_state: CheckState::Idle,
            result: None,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.result.as_ref().map(|r| r.severity)
    }

    pub fn is_checked(&self) -> bool {
        self.result.is_some()
    }
}

/// Point-in-time copy of the whole store, keyed by target id.
pub type HealthSnapshot = BTreeMap<String, HealthRow>;

/// Thread-safe cache of the latest classified result per target.
#[derive(Debug, Default)]
pub struct HealthStore {
    rows: RwLock<HealthSnapshot>,
}

impl HealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HealthSnapshot> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HealthSnapshot> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure a target has a row, refreshing its environment tag.
    pub fn track(&self, target: &Target) {
        let mut rows = self.write();
        rows.entry(target.id.clone())
            .and_modify(|row| row.environment = target.environment.clone())
            .or_insert_with(|| HealthRow::new(&target.id, &target.environment));
    }

    /// Drop a target's row entirely. Returns whether one existed.
    pub fn forget(&self, target_id: &str) -> bool {
        self.write().remove(target_id).is_some()
    }

    /// Replace the result for a tracked target and close its in-flight check.
    ///
    /// Returns `false` and drops the result when the target has no row,
    /// e.g. it was forgotten while its probe was still running.
    pub fn upsert(&self, target_id: &str, result: ClassifiedResult) -> bool {
        let state = if result.severity == Severity::Unreachable || result.error_message.is_some() {
            CheckState::Failed
        } else {
            CheckState::Complete
        };

        let mut rows = self.write();
        let Some(row) = rows.get_mut(target_id) else {
            return false;
        };
        row.check_state = state;
        row.result = Some(result);
        true
    }

    /// Latest classified result, or `NotFound` if never checked (or cleared).
    pub fn get(&self, target_id: &str) -> Result<ClassifiedResult, StoreError> {
        self.read()
            .get(target_id)
            .and_then(|row| row.result.clone())
            .ok_or_else(|| StoreError::NotFound(target_id.to_string()))
    }

    pub fn row(&self, target_id: &str) -> Option<HealthRow> {
        self.read().get(target_id).cloned()
    }

    /// Current check state; untracked targets are `Idle`.
    pub fn check_state(&self, target_id: &str) -> CheckState {
        self.read()
            .get(target_id)
            .map(|row| row.check_state)
            .unwrap_or_default()
    }

    /// Set the operational state without touching the result.
    pub fn set_check_state(&self, target_id: &str, state: CheckState) -> Result<(), StoreError> {
        let mut rows = self.write();
        let row = rows
            .get_mut(target_id)
            .ok_or_else(|| StoreError::NotFound(target_id.to_string()))?;
        row.check_state = state;
        Ok(())
    }

    /// Atomically move a target to `InProgress`.
    ///
    /// Returns `false` when a check is already in flight for it.
    pub fn try_begin_check(&self, target: &Target) -> bool {
        let mut rows = self.write();
        let row = rows
            .entry(target.id.clone())
            .or_insert_with(|| HealthRow::new(&target.id, &target.environment));
        if row.check_state.is_in_progress() {
            return false;
        }
        row.environment = target.environment.clone();
        row.check_state = CheckState::InProgress;
        true
    }

    /// Reset one row to "not checked". Returns whether the row exists.
    ///
    /// A row with a check in flight keeps `InProgress` so the target cannot be
    /// dispatched twice; its result will land when the probe returns.
    pub fn clear(&self, target_id: &str) -> bool {
        let mut rows = self.write();
        match rows.get_mut(target_id) {
            Some(row) => {
                reset(row);
                true
            }
            None => false,
        }
    }

    /// Reset every row to "not checked".
    pub fn clear_all(&self) {
        let mut rows = self.write();
        for row in rows.values_mut() {
            reset(row);
        }
    }

    /// Copy of every row keyed by target id.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.read().clone()
    }

    /// Snapshot handed to persistence sinks.
    pub fn export_snapshot(&self) -> HealthSnapshot {
        self.snapshot()
    }

    /// Copy of every classified result keyed by target id.
    pub fn results(&self) -> BTreeMap<String, ClassifiedResult> {
        self.read()
            .iter()
            .filter_map(|(id, row)| row.result.clone().map(|r| (id.clone(), r)))
            .collect()
    }

    /// Rows ordered by target id.
    pub fn rows(&self) -> Vec<HealthRow> {
        self.read().values().cloned().collect()
    }

    /// Replace the store content with a previously exported snapshot.
    ///
    /// Nothing is in flight after a restart, so `InProgress` rows load as `Idle`.
    pub fn load_snapshot(&self, snapshot: HealthSnapshot) {
        let loaded: HealthSnapshot = snapshot
            .into_iter()
            .map(|(id, mut row)| {
                row.target_id = id.clone();
                if row.check_state.is_in_progress() {
                    row.check_state = CheckState::Idle;
                }
                (id, row)
            })
            .collect();
        *self.write() = loaded;
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn reset(row: &mut HealthRow) {
    row.result = None;
    if !row.check_state.is_in_progress() {
        row.check_state = CheckState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::classifier::classify;
    use crate::health::metric::{MetricValue, ProbeResult};
    use crate::health::thresholds::{MissingMetricPolicy, ThresholdRule, ThresholdSet};

    fn target(id: &str, env: &str) -> Target {
        Target::new(id).with_environment(env)
    }

    fn result_for(id: &str, value: f64) -> ClassifiedResult {
        let set = ThresholdSet::new(
            [("ts_pct".to_string(), ThresholdRule::numeric(85.0, 95.0))],
            MissingMetricPolicy::TreatAsUnknown,
        )
        .unwrap();
        classify(id, &ProbeResult::reachable(5).with_metric("ts_pct", MetricValue::Number(value)), &set)
    }

    #[test]
    fn test_get_never_checked() {
        let store = HealthStore::new();
        store.track(&target("db1", "PROD"));
        assert_eq!(store.get("db1"), Err(StoreError::NotFound("db1".into())));
        assert_eq!(store.get("nope"), Err(StoreError::NotFound("nope".into())));
    }

    #[test]
    fn test_upsert_replaces_single_entry() {
        let store = HealthStore::new();
        store.track(&target("db1", "PROD"));
        assert!(store.upsert("db1", result_for("db1", 10.0)));
        assert!(store.upsert("db1", result_for("db1", 99.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("db1").unwrap().severity, Severity::Crit);
        assert_eq!(store.check_state("db1"), CheckState::Complete);
    }

    #[test]
    fn test_begin_check_is_compare_and_set() {
        let store = HealthStore::new();
        let t = target("db1", "PROD");
        assert!(store.try_begin_check(&t));
        assert!(!store.try_begin_check(&t));
        assert_eq!(store.check_state("db1"), CheckState::InProgress);

        store.upsert("db1", result_for("db1", 1.0));
        assert!(store.try_begin_check(&t));
    }

    #[test]
    fn test_clear_all_keeps_identity() {
        let store = HealthStore::new();
        store.track(&target("db1", "PROD"));
        store.track(&target("db2", "NON-PROD"));
        store.upsert("db1", result_for("db1", 90.0));
        store.upsert("db2", result_for("db2", 10.0));

        store.clear_all();

        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].target_id, "db1");
        assert_eq!(rows[0].environment, "PROD");
        assert_eq!(rows[1].environment, "NON-PROD");
        assert!(rows.iter().all(|r| r.result.is_none() && r.check_state == CheckState::Idle));
    }

    #[test]
    fn test_clear_keeps_in_flight_marker() {
        let store = HealthStore::new();
        let t = target("db1", "PROD");
        store.track(&t);
        store.upsert("db1", result_for("db1", 1.0));
        assert!(store.try_begin_check(&t));
        assert!(store.clear("db1"));
        assert_eq!(store.check_state("db1"), CheckState::InProgress);
        assert!(store.get("db1").is_err());
        assert!(!store.clear("missing"));
    }

    #[test]
    fn test_set_check_state_requires_row() {
        let store = HealthStore::new();
        assert!(store.set_check_state("db1", CheckState::InProgress).is_err());
        store.track(&target("db1", "PROD"));
        store.set_check_state("db1", CheckState::Failed).unwrap();
        assert_eq!(store.check_state("db1"), CheckState::Failed);
    }

    #[test]
    fn test_load_snapshot_resets_in_flight() {
        let store = HealthStore::new();
        store.track(&target("db1", "PROD"));
        assert!(store.try_begin_check(&target("db1", "PROD")));
        store.track(&target("db2", "PROD"));
        store.upsert("db2", result_for("db2", 50.0));

        let snapshot = store.snapshot();
        let restored = HealthStore::new();
        restored.load_snapshot(snapshot);

        assert_eq!(restored.check_state("db1"), CheckState::Idle);
        assert_eq!(restored.get("db2").unwrap(), store.get("db2").unwrap());
        assert_eq!(restored.results().len(), 1);
    }

    #[test]
    fn test_unreachable_marks_failed() {
        let store = HealthStore::new();
        let set = ThresholdSet::default();
        store.track(&target("db1", "PROD"));
        store.upsert("db1", classify("db1", &ProbeResult::unreachable("timeout", 10), &set));
        assert_eq!(store.check_state("db1"), CheckState::Failed);
        assert!(store.forget("db1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_after_forget_is_dropped() {
        let store = HealthStore::new();
        let t = target("db1", "PROD");
        assert!(store.try_begin_check(&t));
        assert!(store.forget("db1"));

        assert!(!store.upsert("db1", result_for("db1", 10.0)));
        assert!(store.row("db1").is_none());
        assert!(store.is_empty());
    }
}
