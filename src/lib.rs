//! Fleet health-check engine library.

pub mod config;
pub mod filter;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod probe;
pub mod registry;
pub mod scheduler;

pub use config::PulseConfig;
pub use health::{ClassifiedResult, HealthStore, Severity};
pub use lifecycle::Shutdown;
pub use registry::{Target, TargetRegistry};
pub use scheduler::Scheduler;
