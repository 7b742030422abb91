//! Monitored target bookkeeping.
//!
//! # Responsibilities
//! - Own the list of targets in insertion order
//! - Enforce unique, immutable ids
//! - Hand out snapshot copies for scheduling and display

pub mod target;

pub use target::{ConnectionProfile, Target};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Target '{0}' already exists")]
    DuplicateId(String),

    #[error("Target '{0}' not found")]
    NotFound(String),

    #[error("Target id cannot be empty")]
    EmptyId,
}

/// Registry of monitored targets.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: RwLock<Vec<Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list, failing on the first duplicate.
    pub fn from_targets(targets: impl IntoIterator<Item = Target>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for target in targets {
            registry.add(target)?;
        }
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Target>> {
        self.targets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Target>> {
        self.targets.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, target: Target) -> Result<(), RegistryError> {
        if target.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        let mut targets = self.write();
        if targets.iter().any(|t| t.id == target.id) {
            return Err(RegistryError::DuplicateId(target.id));
        }
        tracing::debug!(target_id = %target.id, environment = %target.environment, "Target added");
        targets.push(target);
        Ok(())
    }

    /// Replace the target with the same id, keeping its position.
    pub fn update(&self, target: Target) -> Result<(), RegistryError> {
        let mut targets = self.write();
        let slot = targets
            .iter_mut()
            .find(|t| t.id == target.id)
            .ok_or_else(|| RegistryError::NotFound(target.id.clone()))?;
        *slot = target;
        Ok(())
    }

    /// Remove a target. Removing an absent id is not an error.
    pub fn remove(&self, id: &str) -> bool {
        let mut targets = self.write();
        let before = targets.len();
        targets.retain(|t| t.id != id);
        let removed = targets.len() != before;
        if removed {
            tracing::debug!(target_id = %id, "Target removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Result<Target, RegistryError> {
        self.read()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Snapshot of all targets in insertion order.
    pub fn list(&self) -> Vec<Target> {
        self.read().clone()
    }

    /// Snapshot of enabled targets in insertion order.
    pub fn enabled(&self) -> Vec<Target> {
        self.read().iter().filter(|t| t.enabled).cloned().collect()
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut targets = self.write();
        let target = targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        target.enabled = enabled;
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_duplicates() {
        let registry = TargetRegistry::new();
        registry.add(Target::new("ORCL1")).unwrap();
        assert_eq!(
            registry.add(Target::new("ORCL1").with_environment("PROD")),
            Err(RegistryError::DuplicateId("ORCL1".into()))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.add(Target::new("  ")), Err(RegistryError::EmptyId));
    }

    #[test]
    fn test_update_requires_existing() {
        let registry = TargetRegistry::new();
        assert_eq!(
            registry.update(Target::new("ORCL1")),
            Err(RegistryError::NotFound("ORCL1".into()))
        );

        registry.add(Target::new("ORCL1")).unwrap();
        registry.add(Target::new("ORCL2")).unwrap();
        registry
            .update(Target::new("ORCL1").with_environment("PROD"))
            .unwrap();
        let listed = registry.list();
        assert_eq!(listed[0].id, "ORCL1");
        assert_eq!(listed[0].environment, "PROD");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = TargetRegistry::new();
        registry.add(Target::new("ORCL1")).unwrap();
        assert!(registry.remove("ORCL1"));
        assert!(!registry.remove("ORCL1"));
        assert_eq!(registry.get("ORCL1"), Err(RegistryError::NotFound("ORCL1".into())));
    }

    #[test]
    fn test_list_is_ordered_copy() {
        let registry = TargetRegistry::from_targets(
            ["c", "a", "b"].into_iter().map(Target::new),
        )
        .unwrap();
        let mut listed = registry.list();
        assert_eq!(
            listed.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
        listed.clear();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_enabled_filter() {
        let registry = TargetRegistry::new();
        registry.add(Target::new("a")).unwrap();
        registry.add(Target::new("b").disabled()).unwrap();
        registry.add(Target::new("c")).unwrap();
        assert_eq!(registry.enabled().len(), 2);
        registry.set_enabled("b", true).unwrap();
        assert_eq!(registry.enabled().len(), 3);
        assert!(registry.set_enabled("zz", true).is_err());
    }

    #[test]
    fn test_from_targets_rejects_duplicates() {
        let result = TargetRegistry::from_targets(vec![Target::new("x"), Target::new("x")]);
        assert!(matches!(result, Err(RegistryError::DuplicateId(id)) if id == "x"));
    }
}
