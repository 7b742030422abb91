//! Snapshot persistence.
//!
//! # Responsibilities
//! - Define the sink the scheduler hands snapshots to
//! - Provide a JSON file sink used by the binary
//!
//! # Design Decisions
//! - Persistence is batch-granular; the store never writes on its own
//! - Writes go to a temp file that is renamed over the target, so a crash
//!   mid-write leaves the previous snapshot intact

pub mod json_file;

pub use json_file::JsonFileSink;

use thiserror::Error;

use crate::health::HealthSnapshot;

/// Errors raised while saving or loading snapshots.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives store snapshots on the scheduler's batch cadence.
pub trait SnapshotSink: Send + Sync {
    fn persist(&self, snapshot: &HealthSnapshot) -> Result<(), PersistenceError>;
}
