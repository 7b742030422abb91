//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Restore snapshot → Build scheduler → Start auto-run
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop auto-run → Drain current batch → Persist → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then timers
//! - Shutdown never aborts probes that are already running

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{apply_reload, build_scheduler, StartupError};
