//! Batch aggregation and persistence
//!
//! After the scheduler joins, all trial records are bundled with run-level
//! metadata into one immutable [`BatchResult`] and written exactly once.
//! The write goes to a temporary sibling file first and is renamed over the
//! destination, so a failed run leaves no partial batch behind.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::trial::TrialRecord;
use crate::{Error, Result};

/// The complete outcome of one benchmarking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    records: Vec<TrialRecord>,
    train_fraction: f64,
    repetitions: u64,
    top_k_variables: usize,
    created_at: DateTime<Utc>,
}

impl BatchResult {
    /// Bundle trial records with run metadata.
    #[must_use]
    pub fn aggregate(records: Vec<TrialRecord>, config: &RunConfig) -> Self {
        Self {
            records,
            train_fraction: config.train_fraction(),
            repetitions: config.repetitions(),
            top_k_variables: config.top_k_variables(),
            created_at: Utc::now(),
        }
    }

    /// All trial records, in scheduler input order.
    #[must_use]
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Training fraction the run used.
    #[must_use]
    pub const fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Repetitions per dataset.
    #[must_use]
    pub const fn repetitions(&self) -> u64 {
        self.repetitions
    }

    /// Variable-selection budget the run used.
    #[must_use]
    pub const fn top_k_variables(&self) -> usize {
        self.top_k_variables
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Serialize to the persisted byte representation.
    ///
    /// Field order is fixed (struct order plus `BTreeMap` outcome keys), so
    /// serializing the same batch twice yields identical bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persist` if serialization fails.
    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Persist(format!("failed to serialize batch result: {e}")))
    }

    /// Write the batch to `destination` in a single atomic step.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persist` on any serialization or filesystem failure;
    /// the destination is never left half-written.
    pub fn persist<P: AsRef<Path>>(&self, destination: P) -> Result<()> {
        let destination = destination.as_ref();
        let bytes = self.to_json_vec()?;

        let mut tmp = destination.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        fs::write(&tmp, &bytes)
            .map_err(|e| Error::Persist(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, destination).map_err(|e| {
            // Leave nothing behind on a failed rename.
            let _ = fs::remove_file(&tmp);
            Error::Persist(format!(
                "failed to move batch into place at {}: {e}",
                destination.display()
            ))
        })?;
        Ok(())
    }

    /// Read a previously persisted batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persist` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(source: P) -> Result<Self> {
        let bytes = fs::read(source.as_ref())
            .map_err(|e| Error::Persist(format!("failed to read {}: {e}", source.as_ref().display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Persist(format!("failed to parse batch result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{TrialConfig, TrialRecord};

    fn sample_batch() -> BatchResult {
        let config = RunConfig::builder()
            .datasets(["a", "b"])
            .repetitions(2)
            .train_fraction(0.67)
            .top_k_variables(10)
            .build()
            .unwrap();
        let records = config
            .trial_configs()
            .iter()
            .map(|t| TrialRecord::failed(t, "synthetic"))
            .collect();
        BatchResult::aggregate(records, &config)
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("reparto-test-{}-{name}", std::process::id()));
        path
    }

    #[test]
    fn test_aggregate_carries_run_metadata() {
        let batch = sample_batch();
        assert_eq!(batch.records().len(), 4);
        assert!((batch.train_fraction() - 0.67).abs() < 1e-12);
        assert_eq!(batch.repetitions(), 2);
        assert_eq!(batch.top_k_variables(), 10);
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let batch = sample_batch();
        assert_eq!(batch.to_json_vec().unwrap(), batch.to_json_vec().unwrap());
    }

    #[test]
    fn test_persist_round_trip_and_no_tmp_residue() {
        let batch = sample_batch();
        let path = temp_path("roundtrip.json");

        batch.persist(&path).unwrap();
        let back = BatchResult::load(&path).unwrap();
        assert_eq!(batch, back);

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        assert!(!std::path::Path::new(&tmp).exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_persist_twice_is_byte_identical() {
        let batch = sample_batch();
        let path_a = temp_path("idempotent-a.json");
        let path_b = temp_path("idempotent-b.json");

        batch.persist(&path_a).unwrap();
        batch.persist(&path_b).unwrap();
        assert_eq!(fs::read(&path_a).unwrap(), fs::read(&path_b).unwrap());
        fs::remove_file(&path_a).unwrap();
        fs::remove_file(&path_b).unwrap();
    }

    #[test]
    fn test_persist_to_invalid_destination_fails() {
        let batch = sample_batch();
        let result = batch.persist("/nonexistent-dir/reparto/batch.json");
        assert!(matches!(result, Err(Error::Persist(_))));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(BatchResult::load(temp_path("never-written.json")).is_err());
    }
}
