//! Health classification subsystem.
//!
//! # Data Flow
//! ```text
//! Probe returns ProbeResult (metric.rs)
//!     → classifier.rs applies ThresholdSet (thresholds.rs)
//!     → ClassifiedResult with per-metric verdicts + severity (state.rs)
//!     → store.rs keeps the latest result per target
//! ```
//!
//! # Design Decisions
//! - Metric values are typed; nothing is parsed back out of display strings
//! - Classification is pure and runs outside the store lock
//! - Severity and check state are separate columns and never influence each other

pub mod classifier;
pub mod metric;
pub mod state;
pub mod store;
pub mod thresholds;

pub use classifier::{classify, ClassifiedResult};
pub use metric::{MetricValue, ProbeResult};
pub use state::{CheckState, Severity, Verdict};
pub use store::{HealthRow, HealthSnapshot, HealthStore, StoreError};
pub use thresholds::{ClassificationConfigError, MissingMetricPolicy, ThresholdRule, ThresholdSet};
