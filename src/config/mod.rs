//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, presets.rs for threshold presets)
//!     → PulseConfig (validated)
//!     → registry, thresholds, scheduler settings built from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates the new config
//!     → runtime applies interval and thresholds to the live scheduler
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A config that fails validation on reload is logged and ignored

pub mod loader;
pub mod presets;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ObservabilityConfig, PersistenceConfig, PulseConfig, SchedulerConfig, ThresholdConfig,
    ThresholdConfigError,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
