//! Raw probe output and typed metric values.
//!
//! Metric values stay typed all the way through classification and
//! filtering; only `Display` renders them for humans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A single collected metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// Plain number: counts, percentages, ratios.
    Number(#[serde(with = "number")] f64),
    /// An already-measured age, e.g. replication lag.
    Duration(#[serde(with = "secs")] Duration),
    /// A point in time, e.g. the last successful backup.
    Timestamp(DateTime<Utc>),
    /// A state out of a known set, e.g. `OPEN`.
    Enum(String),
    /// Free text, e.g. a version string.
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Durations are seconds, timestamps are Unix seconds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Duration(d) => Some(d.as_secs_f64()),
            MetricValue::Timestamp(ts) => Some(ts.timestamp() as f64),
            MetricValue::Enum(_) | MetricValue::Text(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Number(_) => "number",
            MetricValue::Duration(_) => "duration",
            MetricValue::Timestamp(_) => "timestamp",
            MetricValue::Enum(_) => "enum",
            MetricValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Duration(d) => {
                let total = d.as_secs();
                let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
                write!(f, "{:02}:{:02}:{:02}", h, m, s)
            }
            MetricValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            MetricValue::Enum(s) | MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// Raw output of one probe invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub reachable: bool,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// When the probe finished. Age rules measure against this instant.
    pub collected_at: DateTime<Utc>,
}

impl ProbeResult {
    /// A reachable result with no metrics yet.
    pub fn reachable(elapsed_ms: u64) -> Self {
        Self {
            reachable: true,
            elapsed_ms,
            metrics: BTreeMap::new(),
            error_message: None,
            collected_at: Utc::now(),
        }
    }

    /// A result for a target that could not be reached.
    pub fn unreachable(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            reachable: false,
            elapsed_ms,
            metrics: BTreeMap::new(),
            error_message: Some(error.into()),
            collected_at: Utc::now(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: MetricValue) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn collected_at(mut self, at: DateTime<Utc>) -> Self {
        self.collected_at = at;
        self
    }
}

/// Serde helper storing a `Duration` as fractional seconds.
pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            serde::de::Error::custom(format!("invalid duration {} seconds: {}", secs, e))
        })
    }
}

/// Serde helper for numbers that may be NaN or infinite.
///
/// JSON has no such literals, so they are written as `"NaN"`, `"inf"` and
/// `"-inf"`. A `null` reads back as NaN.
pub(crate) mod number {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &f64, s: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            s.serialize_f64(*n)
        } else if n.is_nan() {
            s.serialize_str("NaN")
        } else if n.is_sign_positive() {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
        Null,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(n) => Ok(n),
            Repr::Null => Ok(f64::NAN),
            Repr::Text(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!("invalid number '{}'", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numeric_view() {
        assert_eq!(MetricValue::Number(4.5).as_f64(), Some(4.5));
        assert_eq!(MetricValue::Duration(Duration::from_secs(90)).as_f64(), Some(90.0));
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(MetricValue::Timestamp(ts).as_f64(), Some(ts.timestamp() as f64));
        assert_eq!(MetricValue::Text("19c".into()).as_f64(), None);
    }

    #[test]
    fn test_display_is_undecorated() {
        assert_eq!(MetricValue::Number(87.3).to_string(), "87.3");
        assert_eq!(MetricValue::Duration(Duration::from_secs(3723)).to_string(), "01:02:03");
        assert_eq!(MetricValue::Enum("OPEN".into()).to_string(), "OPEN");
    }

    #[test]
    fn test_duration_serialized_as_seconds() {
        let json = serde_json::to_string(&MetricValue::Duration(Duration::from_millis(1500))).unwrap();
        assert_eq!(json, r#"{"type":"duration","value":1.5}"#);
        let back: MetricValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MetricValue::Duration(Duration::from_millis(1500)));
        assert!(serde_json::from_str::<MetricValue>(r#"{"type":"duration","value":-1.0}"#).is_err());
    }

    #[test]
    fn test_non_finite_numbers_survive_json() {
        let json = serde_json::to_string(&MetricValue::Number(f64::NAN)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":"NaN"}"#);
        let back: MetricValue = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, MetricValue::Number(n) if n.is_nan()));

        for n in [f64::INFINITY, f64::NEG_INFINITY, 87.5] {
            let json = serde_json::to_string(&MetricValue::Number(n)).unwrap();
            let back: MetricValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, MetricValue::Number(n));
        }

        let back: MetricValue = serde_json::from_str(r#"{"type":"number","value":null}"#).unwrap();
        assert!(matches!(back, MetricValue::Number(n) if n.is_nan()));
        let back: MetricValue = serde_json::from_str(r#"{"type":"number","value":40}"#).unwrap();
        assert_eq!(back, MetricValue::Number(40.0));
        assert!(serde_json::from_str::<MetricValue>(r#"{"type":"number","value":"lots"}"#).is_err());
    }
}
