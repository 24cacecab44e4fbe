//! Parallel trial scheduling
//!
//! Trials fan out over a bounded rayon pool of `worker_count` threads.
//! Workers share nothing mutable: each trial derives its own seed, loads
//! through the read-only dataset cache, and owns its transient allocations.
//! The indexed parallel map collects results back into input order, so the
//! caller can align records to configurations no matter which trials
//! finished first. A failing trial yields its failure record in place; the
//! remaining trials are unaffected.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::trial::{TrialConfig, TrialRecord, TrialRunner};
use crate::{Error, Result};

/// Runs batches of trials on a dedicated worker pool.
pub struct Scheduler {
    pool: ThreadPool,
}

impl Scheduler {
    /// Build a scheduler with a pool of `worker_count` threads.
    ///
    /// # Errors
    ///
    /// Returns `Error::Trial` if `worker_count` is zero or the pool cannot
    /// be constructed.
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(Error::Trial(
                "worker_count must be a positive integer".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("reparto-worker-{i}"))
            .build()
            .map_err(|e| Error::Trial(format!("failed to build worker pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Execute every trial and return records in input order.
    #[must_use]
    pub fn run(&self, runner: &TrialRunner, configs: &[TrialConfig]) -> Vec<TrialRecord> {
        self.pool.install(|| {
            configs
                .par_iter()
                .map(|config| runner.run(config))
                .collect()
        })
    }
}
