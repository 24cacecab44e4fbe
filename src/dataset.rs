//! Datasets and dataset sources
//!
//! A [`Dataset`] is a dense feature matrix plus a dense label vector with a
//! stable class ordering. Loading is a collaborator capability behind the
//! [`DatasetSource`] trait; [`CachedSource`] wraps any source with a shared
//! read-only cache so parallel trials on the same dataset load it once.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use crate::matrix::Matrix;
use crate::{Error, Result};

/// One classification dataset: observations × variables plus class labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: String,
    features: Matrix,
    labels: Vec<usize>,
    class_names: Vec<String>,
}

impl Dataset {
    /// Assemble and validate a dataset.
    ///
    /// Labels are dense class indices into `class_names`, whose order fixes
    /// the stable class ordering for the whole run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Dataset` if the label vector length does not match
    /// the feature row count, any label is out of range, or fewer than two
    /// classes are actually present.
    pub fn new(
        id: impl Into<String>,
        features: Matrix,
        labels: Vec<usize>,
        class_names: Vec<String>,
    ) -> Result<Self> {
        if labels.len() != features.rows() {
            return Err(Error::Dataset(format!(
                "label vector has {} entries, feature matrix has {} rows",
                labels.len(),
                features.rows()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= class_names.len()) {
            return Err(Error::Dataset(format!(
                "label {bad} out of range ({} classes declared)",
                class_names.len()
            )));
        }
        let mut present = vec![false; class_names.len()];
        for &label in &labels {
            present[label] = true;
        }
        if present.iter().filter(|&&p| p).count() < 2 {
            return Err(Error::Dataset(
                "dataset must contain at least two classes".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            features,
            labels,
            class_names,
        })
    }

    /// Dataset identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Feature matrix (observations × variables).
    #[must_use]
    pub const fn features(&self) -> &Matrix {
        &self.features
    }

    /// Dense class labels, one per observation.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Class names in stable order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Number of declared classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }
}

/// Dataset loading capability (external collaborator).
pub trait DatasetSource: Send + Sync {
    /// Load the dataset with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::Dataset` if the identifier is unknown or the data
    /// fails validation.
    fn load(&self, id: &str) -> Result<Arc<Dataset>>;
}

/// In-memory source backed by a fixed map of datasets.
///
/// The unit of registration is an already-validated [`Dataset`]; useful for
/// tests, demos, and callers that materialize data elsewhere.
#[derive(Debug, Default)]
pub struct InMemorySource {
    datasets: FxHashMap<String, Arc<Dataset>>,
}

impl InMemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under its own id.
    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets
            .insert(dataset.id().to_string(), Arc::new(dataset));
    }
}

impl DatasetSource for InMemorySource {
    fn load(&self, id: &str) -> Result<Arc<Dataset>> {
        self.datasets
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Dataset(format!("unknown dataset id: {id}")))
    }
}

/// Caching wrapper: loads each dataset id at most once and hands out
/// shared references afterwards.
pub struct CachedSource<S> {
    inner: S,
    cache: DashMap<String, Arc<Dataset>>,
}

impl<S: DatasetSource> CachedSource<S> {
    /// Wrap a source with a shared cache.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of cached datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<S: DatasetSource> DatasetSource for CachedSource<S> {
    fn load(&self, id: &str) -> Result<Arc<Dataset>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(Arc::clone(&hit));
        }
        let loaded = self.inner.load(id)?;
        self.cache.insert(id.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_dataset(id: &str) -> Dataset {
        let features = Matrix::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 4, 2).unwrap();
        Dataset::new(
            id,
            features,
            vec![0, 0, 1, 1],
            vec!["healthy".to_string(), "tumor".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_dataset_label_length_mismatch() {
        let features = Matrix::zeros(3, 2);
        let result = Dataset::new("d", features, vec![0, 1], vec!["a".into(), "b".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_label_out_of_range() {
        let features = Matrix::zeros(2, 2);
        let result = Dataset::new("d", features, vec![0, 2], vec!["a".into(), "b".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_requires_two_classes() {
        let features = Matrix::zeros(3, 2);
        let result = Dataset::new("d", features, vec![0, 0, 0], vec!["a".into(), "b".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_in_memory_source_load() {
        let mut source = InMemorySource::new();
        source.insert(two_class_dataset("leukemia"));

        assert!(source.load("leukemia").is_ok());
        assert!(source.load("missing").is_err());
    }

    #[test]
    fn test_cached_source_returns_same_arc() {
        let mut source = InMemorySource::new();
        source.insert(two_class_dataset("colon"));
        let cached = CachedSource::new(source);

        assert!(cached.is_empty());
        let a = cached.load("colon").unwrap();
        let b = cached.load("colon").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cached.len(), 1);
    }
}
