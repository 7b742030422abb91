//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler, store, config reload produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Batch run ID flows through all scheduler log lines
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
