//! Classifier adapter contract and registry
//!
//! Every wrapped algorithm implements the same capability pair:
//! `fit(train_x, train_y, priors, seed) -> model` and
//! `predict(model, test_x) -> labels`. The trial runner drives all
//! registered adapters through this surface with per-adapter failure
//! isolation, so one algorithm's `Fit`/`Predict` error never disturbs the
//! others. Outcomes are explicit success/failure values, not suppressed
//! exceptions, so a consumer can always tell "error rate 0" apart from
//! "classifier failed".

mod centroid;
mod discriminant;
mod forest;
mod stats;
mod tuned;

pub use centroid::{NearestCentroid, ShrunkenCentroid};
pub use discriminant::{DiagonalLda, DiagonalQda, RidgeLda};
pub use forest::BaggedForest;
pub use tuned::{Rda, Scrda};

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;
use crate::{Error, Result};

/// A regularization pair selected by an internal cross-validated search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunedParams {
    /// First regularization weight (variant-specific meaning).
    pub lambda: f64,
    /// Second regularization weight, drawn from the gamma grid.
    pub gamma: f64,
}

/// Outcome of one classifier within one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifierOutcome {
    /// The classifier produced predictions for every test row.
    Scored {
        /// Fraction of mismatched test predictions, in `[0, 1]`.
        error_rate: f64,
        /// Selected hyperparameters, for variants that tune internally.
        #[serde(skip_serializing_if = "Option::is_none")]
        tuned: Option<TunedParams>,
    },
    /// The classifier failed to fit or predict; the trial continued.
    Failed {
        /// Failure kind tag (`fit` or `predict`).
        kind: String,
        /// Algorithm-specific failure description.
        message: String,
    },
}

impl ClassifierOutcome {
    /// Build the failure marker for an adapter error.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        Self::Failed {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    /// The error rate, when the classifier scored.
    #[must_use]
    pub const fn error_rate(&self) -> Option<f64> {
        match self {
            Self::Scored { error_rate, .. } => Some(*error_rate),
            Self::Failed { .. } => None,
        }
    }

    /// The selected hyperparameters, when present.
    #[must_use]
    pub const fn tuned(&self) -> Option<TunedParams> {
        match self {
            Self::Scored { tuned, .. } => *tuned,
            Self::Failed { .. } => None,
        }
    }
}

/// A fitted model: predicts one label per test row.
pub trait Model: Send {
    /// Predict class labels for every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Predict` if `x` does not match the fitted shape.
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>>;

    /// Hyperparameters selected during fit, for tuning variants.
    fn tuned(&self) -> Option<TunedParams> {
        None
    }
}

/// A classification algorithm behind the uniform adapter contract.
pub trait Classifier: Send + Sync {
    /// Stable name used as the key in trial records.
    fn name(&self) -> &'static str;

    /// Fit a model on training data.
    ///
    /// `y` holds dense class indices; `priors` has one entry per class and
    /// defaults to [`uniform_priors`] at the call site. `seed` drives any
    /// internal randomness (resampling, fold assignment) so a fit is a pure
    /// function of its arguments.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fit` when the algorithm cannot produce a model for
    /// this data (empty class, zero variance it must divide by, shape
    /// mismatch).
    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], seed: u64) -> Result<Box<dyn Model>>;
}

/// Uniform prior probabilities over `n_classes` observed classes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn uniform_priors(n_classes: usize) -> Vec<f64> {
    if n_classes == 0 {
        return Vec::new();
    }
    vec![1.0 / n_classes as f64; n_classes]
}

/// Fraction of mismatched predictions.
///
/// # Errors
///
/// Returns `Error::Predict` if the vectors differ in length or are empty.
#[allow(clippy::cast_precision_loss)]
pub fn error_rate(predicted: &[usize], truth: &[usize]) -> Result<f64> {
    if predicted.len() != truth.len() || truth.is_empty() {
        return Err(Error::Predict {
            classifier: "harness",
            message: format!(
                "prediction/truth length mismatch: {} vs {}",
                predicted.len(),
                truth.len()
            ),
        });
    }
    let mismatches = predicted
        .iter()
        .zip(truth)
        .filter(|(p, t)| p != t)
        .count();
    Ok(mismatches as f64 / truth.len() as f64)
}

/// The seven benchmark adapters in canonical report order.
///
/// `num_gamma_grid_points` sizes the gamma grid of the two cross-validated
/// variants (`rda`, `scrda`).
#[must_use]
pub fn registry(num_gamma_grid_points: usize) -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(BaggedForest::default()),
        Box::new(DiagonalLda),
        Box::new(DiagonalQda),
        Box::new(RidgeLda::default()),
        Box::new(NearestCentroid),
        Box::new(Rda::new(num_gamma_grid_points)),
        Box::new(Scrda::new(num_gamma_grid_points)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_priors_sum_to_one() {
        let priors = uniform_priors(4);
        assert_eq!(priors.len(), 4);
        let sum: f64 = priors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(uniform_priors(0).is_empty());
    }

    #[test]
    fn test_error_rate_counts_mismatches() {
        let rate = error_rate(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap();
        assert!((rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_error_rate_rejects_mismatched_lengths() {
        assert!(error_rate(&[0, 1], &[0]).is_err());
        assert!(error_rate(&[], &[]).is_err());
    }

    #[test]
    fn test_registry_has_seven_named_variants() {
        let classifiers = registry(4);
        let names: Vec<&str> = classifiers.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["forest", "dlda", "dqda", "lda", "centroid", "rda", "scrda"]
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let scored = ClassifierOutcome::Scored {
            error_rate: 0.1,
            tuned: Some(TunedParams {
                lambda: 0.5,
                gamma: 0.25,
            }),
        };
        assert_eq!(scored.error_rate(), Some(0.1));
        assert!(scored.tuned().is_some());

        let failed = ClassifierOutcome::from_error(&Error::Fit {
            classifier: "lda",
            message: "singular".into(),
        });
        assert_eq!(failed.error_rate(), None);
        match failed {
            ClassifierOutcome::Failed { ref kind, .. } => assert_eq!(kind, "fit"),
            ClassifierOutcome::Scored { .. } => panic!("expected failure marker"),
        }
    }
}
