//! Target definition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection details for a target, opaque to the engine.
///
/// Only probes read it. Secrets are resolved before a profile gets here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionProfile(BTreeMap<String, String>);

impl ConnectionProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A monitored backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique, immutable identifier.
    pub id: String,

    /// Environment tag (e.g. "PROD", "NON-PROD").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Whether auto-run includes this target.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, rename = "connection")]
    pub connection_profile: ConnectionProfile,
}

fn default_environment() -> String {
    "NON-PROD".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Target {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            environment: default_environment(),
            enabled: true,
            connection_profile: ConnectionProfile::default(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_profile(mut self, profile: ConnectionProfile) -> Self {
        self.connection_profile = profile;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
