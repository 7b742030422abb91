//! JSON file snapshot sink.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{PersistenceError, SnapshotSink};
use crate::health::HealthSnapshot;

/// Stores the health snapshot as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last persisted snapshot. A missing file is an empty snapshot.
    pub fn load(&self) -> Result<HealthSnapshot, PersistenceError> {
        if !self.path.exists() {
            tracing::debug!(path = ?self.path, "No snapshot file, starting empty");
            return Ok(HealthSnapshot::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let snapshot: HealthSnapshot = serde_json::from_reader(reader)?;
        tracing::info!(path = ?self.path, rows = snapshot.len(), "Loaded health snapshot");
        Ok(snapshot)
    }
}

impl SnapshotSink for JsonFileSink {
    /// Each write goes to its own temp file in the target directory, so
    /// concurrent batches never share a partially written file.
    fn persist(&self, snapshot: &HealthSnapshot) -> Result<(), PersistenceError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(path = ?self.path, rows = snapshot.len(), "Saved health snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{classify, CheckState, HealthRow, MetricValue, ProbeResult, ThresholdSet};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("absent.json"));
        assert!(sink.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("state").join("health.json"));

        let mut row = HealthRow::new("db1", "PROD");
        row.check_state = CheckState::Complete;
        let raw = ProbeResult::reachable(12).with_metric("ts_pct", MetricValue::Number(40.0));
        row.result = Some(classify("db1", &raw, &ThresholdSet::default()));

        let mut snapshot = HealthSnapshot::new();
        snapshot.insert("db1".into(), row.clone());
        sink.persist(&snapshot).unwrap();

        let leftovers = fs::read_dir(dir.path().join("state")).unwrap().count();
        assert_eq!(leftovers, 1);
        let loaded = sink.load().unwrap();
        assert_eq!(loaded.get("db1"), Some(&row));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileSink::new(path).load(),
            Err(PersistenceError::Serialize(_))
        ));
    }

    #[test]
    fn test_concurrent_writes_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(JsonFileSink::new(dir.path().join("health.json")));

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let mut failures = 0;
                    for round in 0..50 {
                        let id = format!("db{}-{}", w, round);
                        let mut snapshot = HealthSnapshot::new();
                        snapshot.insert(id.clone(), HealthRow::new(&id, "PROD"));
                        if sink.persist(&snapshot).is_err() {
                            failures += 1;
                        }
                    }
                    failures
                })
            })
            .collect();

        let failures: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failures, 0);
        assert_eq!(sink.load().unwrap().len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
