//! # Reparto: Repeated-Holdout Classification Benchmarking Harness
//!
//! Reparto compares classification algorithms on small-sample,
//! high-dimensional datasets (gene-expression microarrays being the
//! canonical case). Each trial draws a stratified random train/test split,
//! keeps the top-K most discriminating variables, fits seven classifier
//! adapters on the reduced training data, and scores them on held-out
//! rows. Trials are independent, seeded by their repetition index, and run
//! in parallel on a bounded worker pool; the collected records persist as
//! one immutable batch.
//!
//! ## Design Principles
//!
//! - **Reproducibility**: randomness is a pure function of (dataset,
//!   repetition), never of scheduling order
//! - **Failure isolation**: a classifier failure marks that classifier, a
//!   trial failure marks that trial — nothing aborts the batch
//! - **Leakage guard**: variable selection sees training rows only
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reparto::config::RunConfig;
//! use reparto::dataset::{CachedSource, Dataset, InMemorySource};
//! use reparto::matrix::Matrix;
//! use reparto::telemetry::TracingSink;
//! use reparto::Harness;
//!
//! let features = Matrix::from_vec(vec![0.0, 0.2, 5.0, 5.2], 4, 1)?;
//! let dataset = Dataset::new(
//!     "toy",
//!     features,
//!     vec![0, 0, 1, 1],
//!     vec!["healthy".to_string(), "tumor".to_string()],
//! )?;
//! let mut source = InMemorySource::new();
//! source.insert(dataset);
//!
//! let config = RunConfig::builder()
//!     .dataset("toy")
//!     .repetitions(10)
//!     .top_k_variables(1)
//!     .build()?;
//! let harness = Harness::new(
//!     config,
//!     Arc::new(CachedSource::new(source)),
//!     Arc::new(TracingSink),
//! )?;
//! let batch = harness.execute_and_persist("results.json")?;
//! println!("{} trial records", batch.records().len());
//! # Ok::<(), reparto::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod matrix;
pub mod partition;
pub mod report;
pub mod scheduler;
pub mod select;
pub mod telemetry;
pub mod trial;

pub use error::{Error, Result};

use std::sync::Arc;

use config::RunConfig;
use dataset::DatasetSource;
use report::BatchResult;
use scheduler::Scheduler;
use telemetry::EventSink;
use trial::{TrialRecord, TrialRunner};

/// One configured benchmarking run: scheduler, trial runner, and the
/// aggregation step behind a single entry point.
pub struct Harness {
    config: RunConfig,
    runner: TrialRunner,
    scheduler: Scheduler,
}

impl Harness {
    /// Assemble a harness from a validated configuration, a dataset source,
    /// and an event sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be constructed.
    pub fn new(
        config: RunConfig,
        source: Arc<dyn DatasetSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let scheduler = Scheduler::new(config.worker_count())?;
        let runner = TrialRunner::new(source, sink, &config);
        Ok(Self {
            config,
            runner,
            scheduler,
        })
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute every trial and return records in configuration order.
    #[must_use]
    pub fn execute(&self) -> Vec<TrialRecord> {
        let configs = self.config.trial_configs();
        self.scheduler.run(&self.runner, &configs)
    }

    /// Execute every trial, aggregate, and persist the batch in one atomic
    /// write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persist` if the final write fails; trial-level
    /// failures are recorded inside the batch instead.
    pub fn execute_and_persist<P: AsRef<std::path::Path>>(
        &self,
        destination: P,
    ) -> Result<BatchResult> {
        let records = self.execute();
        let batch = BatchResult::aggregate(records, &self.config);
        batch.persist(destination)?;
        Ok(batch)
    }
}
