//! Dispatch boundary for a single probe call.
//!
//! Everything a probe can do wrong (return a failure, panic) is turned into
//! a `ClassifiedResult` here; nothing escapes to the batch.

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use crate::health::{classify, ClassifiedResult, ProbeResult, ThresholdSet};
use crate::probe::Probe;
use crate::registry::Target;

/// Run one probe and classify whatever comes back.
pub async fn probe_and_classify(
    probe: &dyn Probe,
    target: &Target,
    timeout: Duration,
    thresholds: &ThresholdSet,
) -> ClassifiedResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(probe.check(target, timeout))
        .catch_unwind()
        .await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let raw = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(failure)) => {
            tracing::warn!(
                target_id = %target.id,
                kind = failure.kind(),
                error = %failure,
                "Probe failed"
            );
            failure.into_probe_result(elapsed_ms)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(target_id = %target.id, panic = %message, "Probe panicked");
            ProbeResult::reachable(elapsed_ms).with_error(format!("probe panicked: {}", message))
        }
    };

    classify(&target.id, &raw, thresholds)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{MetricValue, Severity, ThresholdRule};
    use crate::probe::ProbeFailure;
    use async_trait::async_trait;

    struct Fixed(Result<ProbeResult, ProbeFailure>);

    #[async_trait]
    impl Probe for Fixed {
        async fn check(&self, _: &Target, _: Duration) -> Result<ProbeResult, ProbeFailure> {
            self.0.clone()
        }
    }

    struct Panics;

    #[async_trait]
    impl Probe for Panics {
        async fn check(&self, _: &Target, _: Duration) -> Result<ProbeResult, ProbeFailure> {
            panic!("driver segfault");
        }
    }

    fn set() -> ThresholdSet {
        let mut set = ThresholdSet::default();
        set.insert("ts_pct", ThresholdRule::numeric(85.0, 95.0)).unwrap();
        set
    }

    #[tokio::test]
    async fn test_success_is_classified() {
        let probe = Fixed(Ok(ProbeResult::reachable(4).with_metric("ts_pct", MetricValue::Number(88.0))));
        let result = probe_and_classify(&probe, &Target::new("db"), Duration::from_secs(1), &set()).await;
        assert_eq!(result.severity, Severity::Warn);
        assert_eq!(result.target_id, "db");
    }

    #[tokio::test]
    async fn test_failure_is_absorbed() {
        let probe = Fixed(Err(ProbeFailure::Timeout(Duration::from_secs(1))));
        let result = probe_and_classify(&probe, &Target::new("db"), Duration::from_secs(1), &set()).await;
        assert_eq!(result.severity, Severity::Unreachable);
        assert!(result.error_message.unwrap().contains("timed out"));

        let probe = Fixed(Err(ProbeFailure::AuthFailure("bad password".into())));
        let result = probe_and_classify(&probe, &Target::new("db"), Duration::from_secs(1), &set()).await;
        assert_eq!(result.severity, Severity::Crit);
    }

    #[tokio::test]
    async fn test_panic_is_absorbed() {
        let result = probe_and_classify(&Panics, &Target::new("db"), Duration::from_secs(1), &set()).await;
        assert_eq!(result.severity, Severity::Crit);
        assert_eq!(
            result.error_message.as_deref(),
            Some("probe panicked: driver segfault")
        );
    }
}
