//! Probe interface consumed by the scheduler.
//!
//! # Responsibilities
//! - Define the capability the engine is polymorphic over
//! - Define the failure taxonomy a probe may report
//!
//! # Design Decisions
//! - Probes receive an already-resolved connection profile
//! - A probe must honour the timeout it is given and return an
//!   unreachable-shaped result instead of blocking past it
//! - Failures are values; the scheduler converts them into results

pub mod tcp;

pub use tcp::TcpProbe;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::health::ProbeResult;
use crate::registry::Target;

/// Ways a probe can fail to produce a full result.
#[derive(Debug, Clone, Error)]
pub enum ProbeFailure {
    #[error("Probe timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Some metrics could not be collected (e.g. missing grants).
    #[error("Metrics unavailable: {}", .missing.join(", "))]
    PartialMetricUnavailable {
        missing: Vec<String>,
        partial: Box<ProbeResult>,
    },

    #[error("Probe failed: {0}")]
    Other(String),
}

impl ProbeFailure {
    /// Convert the failure into the result the classifier will see.
    ///
    /// Timeouts and connection failures are unreachable. Anything else is
    /// reported as reachable with an error, which classifies as CRIT.
    pub fn into_probe_result(self, elapsed_ms: u64) -> ProbeResult {
        match self {
            ProbeFailure::PartialMetricUnavailable { partial, .. } => *partial,
            ProbeFailure::AuthFailure(_) | ProbeFailure::Other(_) => {
                let message = self.to_string();
                ProbeResult::reachable(elapsed_ms).with_error(message)
            }
            ProbeFailure::Timeout(_) | ProbeFailure::Unreachable(_) => {
                ProbeResult::unreachable(self.to_string(), elapsed_ms)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout(_) => "timeout",
            ProbeFailure::Unreachable(_) => "unreachable",
            ProbeFailure::AuthFailure(_) => "auth_failure",
            ProbeFailure::PartialMetricUnavailable { .. } => "partial_metrics",
            ProbeFailure::Other(_) => "other",
        }
    }
}

/// Performs the actual protocol-level check for one target.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, target: &Target, timeout: Duration) -> Result<ProbeResult, ProbeFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::MetricValue;

    #[test]
    fn test_failure_shapes() {
        let timeout = ProbeFailure::Timeout(Duration::from_millis(1500)).into_probe_result(1500);
        assert!(!timeout.reachable);
        assert_eq!(timeout.error_message.as_deref(), Some("Probe timed out after 1500ms"));

        let auth = ProbeFailure::AuthFailure("ORA-01017".into()).into_probe_result(20);
        assert!(auth.reachable);
        assert_eq!(auth.error_message.as_deref(), Some("Authentication failed: ORA-01017"));

        let other = ProbeFailure::Other("driver not loaded".into()).into_probe_result(3);
        assert!(other.reachable);

        let partial = ProbeResult::reachable(30).with_metric("sessions_ratio", MetricValue::Number(0.2));
        let failure = ProbeFailure::PartialMetricUnavailable {
            missing: vec!["ts_pct".into(), "last_arch".into()],
            partial: Box::new(partial.clone()),
        };
        assert_eq!(failure.to_string(), "Metrics unavailable: ts_pct, last_arch");
        assert_eq!(failure.into_probe_result(30), partial);
    }
}
