//! Run configuration
//!
//! One validated [`RunConfig`] drives a whole benchmarking run: which
//! datasets, how many repetitions each, the holdout fraction, the worker
//! pool size, the variable-selection budget, and the gamma grid resolution
//! for the two tuning variants.

use serde::{Deserialize, Serialize};

use crate::trial::TrialConfig;
use crate::{Error, Result};

/// Validated configuration for one benchmarking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    dataset_ids: Vec<String>,
    repetitions: u64,
    train_fraction: f64,
    worker_count: usize,
    top_k_variables: usize,
    num_gamma_grid_points: usize,
}

impl RunConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Dataset identifiers, in run order.
    #[must_use]
    pub fn dataset_ids(&self) -> &[String] {
        &self.dataset_ids
    }

    /// Repetitions per dataset.
    #[must_use]
    pub const fn repetitions(&self) -> u64 {
        self.repetitions
    }

    /// Training fraction of each holdout split, in (0, 1).
    #[must_use]
    pub const fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Parallel worker count for the trial pool.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of variables kept by selection.
    #[must_use]
    pub const fn top_k_variables(&self) -> usize {
        self.top_k_variables
    }

    /// Gamma grid resolution for the cross-validated variants.
    #[must_use]
    pub const fn num_gamma_grid_points(&self) -> usize {
        self.num_gamma_grid_points
    }

    /// Expand the dataset × repetition cross product, in input order.
    ///
    /// Each trial's seed derives from its repetition index, so no two
    /// trials share a (dataset, seed) pair.
    #[must_use]
    pub fn trial_configs(&self) -> Vec<TrialConfig> {
        let mut configs = Vec::with_capacity(self.dataset_ids.len() * self.repetitions as usize);
        for id in &self.dataset_ids {
            for repetition in 0..self.repetitions {
                configs.push(TrialConfig::new(id.clone(), repetition));
            }
        }
        configs
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    dataset_ids: Vec<String>,
    repetitions: u64,
    train_fraction: f64,
    worker_count: usize,
    top_k_variables: usize,
    num_gamma_grid_points: usize,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self {
            dataset_ids: Vec::new(),
            repetitions: 50,
            train_fraction: 2.0 / 3.0,
            worker_count: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            top_k_variables: 1000,
            num_gamma_grid_points: 8,
        }
    }
}

impl RunConfigBuilder {
    /// Add one dataset identifier.
    #[must_use]
    pub fn dataset(mut self, id: impl Into<String>) -> Self {
        self.dataset_ids.push(id.into());
        self
    }

    /// Set all dataset identifiers at once.
    #[must_use]
    pub fn datasets<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dataset_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Repetitions per dataset.
    #[must_use]
    pub const fn repetitions(mut self, repetitions: u64) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Training fraction of each holdout split.
    #[must_use]
    pub const fn train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Worker pool size (defaults to host core count).
    #[must_use]
    pub const fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Number of variables kept by selection.
    #[must_use]
    pub const fn top_k_variables(mut self, k: usize) -> Self {
        self.top_k_variables = k;
        self
    }

    /// Gamma grid resolution for the cross-validated variants.
    #[must_use]
    pub const fn num_gamma_grid_points(mut self, points: usize) -> Self {
        self.num_gamma_grid_points = points;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when any option is out of range:
    /// empty dataset list, `repetitions` or `worker_count` or
    /// `top_k_variables` or `num_gamma_grid_points` of zero, or a
    /// `train_fraction` outside (0, 1).
    pub fn build(self) -> Result<RunConfig> {
        if self.dataset_ids.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one dataset id is required".to_string(),
            ));
        }
        if self.repetitions == 0 {
            return Err(Error::InvalidConfig(
                "repetitions must be a positive integer".to_string(),
            ));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig(
                "worker_count must be a positive integer".to_string(),
            ));
        }
        if self.top_k_variables == 0 {
            return Err(Error::InvalidConfig(
                "top_k_variables must be a positive integer".to_string(),
            ));
        }
        if self.num_gamma_grid_points == 0 {
            return Err(Error::InvalidConfig(
                "num_gamma_grid_points must be a positive integer".to_string(),
            ));
        }
        Ok(RunConfig {
            dataset_ids: self.dataset_ids,
            repetitions: self.repetitions,
            train_fraction: self.train_fraction,
            worker_count: self.worker_count,
            top_k_variables: self.top_k_variables,
            num_gamma_grid_points: self.num_gamma_grid_points,
        })
    }
}
