//! Centroid-based adapters
//!
//! `centroid` classifies by plain distance to class centroids — the
//! baseline the regularized variants are measured against. The
//! shrunken-centroid scorer (soft-thresholded centroids standardized by
//! pooled spread) also lives here; [`ShrunkenCentroid`] exposes it with a
//! fixed shrinkage and the cross-validated `scrda` variant reuses it with a
//! regularized variance.

use super::stats::{argmin, ClassStats};
use super::{Classifier, Model};
use crate::matrix::Matrix;
use crate::{Error, Result};

/// Nearest-centroid baseline.
///
/// Assigns each test row to the class with the closest training centroid in
/// squared Euclidean distance. Priors do not enter the distance rule; they
/// are validated for shape like every adapter's.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestCentroid;

struct CentroidModel {
    centroids: Vec<Vec<f64>>,
    n_vars: usize,
}

impl Classifier for NearestCentroid {
    fn name(&self) -> &'static str {
        "centroid"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], _seed: u64) -> Result<Box<dyn Model>> {
        let stats = ClassStats::compute(self.name(), x, y, priors)?;
        Ok(Box::new(CentroidModel {
            centroids: stats.means,
            n_vars: x.cols(),
        }))
    }
}

impl Model for CentroidModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        if x.cols() != self.n_vars {
            return Err(Error::Predict {
                classifier: "centroid",
                message: format!(
                    "test matrix has {} variables, model was fitted on {}",
                    x.cols(),
                    self.n_vars
                ),
            });
        }
        let mut labels = Vec::with_capacity(x.rows());
        for row in 0..x.rows() {
            let sample = x.row(row);
            let dists: Vec<f64> = self
                .centroids
                .iter()
                .map(|c| {
                    sample
                        .iter()
                        .zip(c)
                        .map(|(&v, &m)| (v - m).powi(2))
                        .sum::<f64>()
                })
                .collect();
            labels.push(argmin(&dists));
        }
        Ok(labels)
    }
}

/// Shrunken-centroid scorer shared by [`ShrunkenCentroid`] and the
/// cross-validated `scrda` variant.
///
/// Class centroids are pulled toward the grand centroid by soft-thresholding
/// their standardized offsets at `delta`; scoring standardizes by the same
/// spread and adds the prior term.
pub(crate) struct ShrunkenScorer {
    centroids: Vec<Vec<f64>>,
    spread: Vec<f64>,
    log_priors: Vec<f64>,
}

impl ShrunkenScorer {
    /// Build the scorer from class moments, a shrinkage threshold, and the
    /// per-variable variances to standardize with (pooled for the plain
    /// variant, blended for `scrda`).
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn build(
        classifier: &'static str,
        stats: &ClassStats,
        priors: &[f64],
        delta: f64,
        variances: &[f64],
    ) -> Result<Self> {
        let n: usize = stats.counts.iter().sum();
        let mut sd: Vec<f64> = variances.iter().map(|&v| v.max(0.0).sqrt()).collect();
        let s0 = median(&sd);
        for s in &mut sd {
            *s += s0;
        }
        if let Some(j) = sd.iter().position(|&s| s <= 0.0) {
            return Err(Error::Fit {
                classifier,
                message: format!("variable {j} has zero spread, cannot standardize"),
            });
        }

        let mut centroids = Vec::with_capacity(stats.n_classes);
        for (class, mean) in stats.means.iter().enumerate() {
            let m_c = (1.0 / stats.counts[class] as f64 - 1.0 / n as f64).sqrt();
            let centroid: Vec<f64> = mean
                .iter()
                .zip(&stats.grand_mean)
                .zip(&sd)
                .map(|((&m, &g), &s)| {
                    let offset = (m - g) / (m_c * s);
                    g + m_c * s * soft_threshold(offset, delta)
                })
                .collect();
            centroids.push(centroid);
        }

        Ok(Self {
            centroids,
            spread: sd,
            log_priors: priors.iter().map(|&p| p.ln()).collect(),
        })
    }

    pub(crate) fn n_vars(&self) -> usize {
        self.spread.len()
    }

    /// Classify one sample.
    pub(crate) fn score(&self, sample: &[f64]) -> usize {
        let scores: Vec<f64> = self
            .centroids
            .iter()
            .zip(&self.log_priors)
            .map(|(centroid, &log_prior)| {
                let dist: f64 = sample
                    .iter()
                    .zip(centroid)
                    .zip(&self.spread)
                    .map(|((&v, &c), &s)| ((v - c) / s).powi(2))
                    .sum();
                dist - 2.0 * log_prior
            })
            .collect();
        argmin(&scores)
    }
}

fn soft_threshold(value: f64, delta: f64) -> f64 {
    value.signum() * (value.abs() - delta).max(0.0)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2]
    } else {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    }
}

/// Shrunken-centroid adapter with a fixed shrinkage threshold.
#[derive(Debug, Clone, Copy)]
pub struct ShrunkenCentroid {
    delta: f64,
}

impl Default for ShrunkenCentroid {
    fn default() -> Self {
        Self { delta: 0.5 }
    }
}

impl ShrunkenCentroid {
    /// Fixed shrinkage threshold on standardized centroid offsets.
    #[must_use]
    pub const fn new(delta: f64) -> Self {
        Self { delta }
    }
}

struct ShrunkenModel {
    scorer: ShrunkenScorer,
}

impl Classifier for ShrunkenCentroid {
    fn name(&self) -> &'static str {
        "shrunken-centroid"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], _seed: u64) -> Result<Box<dyn Model>> {
        let stats = ClassStats::compute(self.name(), x, y, priors)?;
        let scorer =
            ShrunkenScorer::build(self.name(), &stats, priors, self.delta, &stats.pooled_var)?;
        Ok(Box::new(ShrunkenModel { scorer }))
    }
}

impl Model for ShrunkenModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        if x.cols() != self.scorer.n_vars() {
            return Err(Error::Predict {
                classifier: "shrunken-centroid",
                message: format!(
                    "test matrix has {} variables, model was fitted on {}",
                    x.cols(),
                    self.scorer.n_vars()
                ),
            });
        }
        Ok((0..x.rows()).map(|row| self.scorer.score(x.row(row))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::uniform_priors;

    fn separable() -> (Matrix, Vec<usize>) {
        let data = vec![
            0.0, 0.1, //
            0.2, 0.0, //
            0.1, 0.3, //
            5.0, 5.1, //
            5.2, 4.9, //
            4.9, 5.2,
        ];
        (Matrix::from_vec(data, 6, 2).unwrap(), vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_nearest_centroid_separates_clusters() {
        let (x, y) = separable();
        let model = NearestCentroid.fit(&x, &y, &uniform_priors(2), 0).unwrap();
        let test = Matrix::from_vec(vec![0.0, 0.0, 5.1, 5.1], 2, 2).unwrap();
        assert_eq!(model.predict(&test).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_shrunken_centroid_separates_clusters() {
        let (x, y) = separable();
        let model = ShrunkenCentroid::default()
            .fit(&x, &y, &uniform_priors(2), 0)
            .unwrap();
        let test = Matrix::from_vec(vec![0.0, 0.0, 5.1, 5.1], 2, 2).unwrap();
        assert_eq!(model.predict(&test).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_large_shrinkage_collapses_to_priors_and_grand_centroid() {
        let (x, y) = separable();
        // Absurd threshold shrinks every centroid onto the grand centroid;
        // prediction still runs and returns a valid class.
        let model = ShrunkenCentroid::new(1e6)
            .fit(&x, &y, &uniform_priors(2), 0)
            .unwrap();
        let test = Matrix::from_vec(vec![0.0, 0.0], 1, 2).unwrap();
        let labels = model.predict(&test).unwrap();
        assert!(labels[0] < 2);
    }

    #[test]
    fn test_shrunken_rejects_all_constant_data() {
        let x = Matrix::zeros(4, 2);
        let y = vec![0, 0, 1, 1];
        assert!(ShrunkenCentroid::default()
            .fit(&x, &y, &uniform_priors(2), 0)
            .is_err());
    }

    #[test]
    fn test_soft_threshold() {
        assert!((soft_threshold(2.0, 0.5) - 1.5).abs() < 1e-12);
        assert!((soft_threshold(-2.0, 0.5) + 1.5).abs() < 1e-12);
        assert!((soft_threshold(0.3, 0.5) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_median() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let (x, y) = separable();
        let model = NearestCentroid.fit(&x, &y, &uniform_priors(2), 0).unwrap();
        assert!(model.predict(&Matrix::zeros(1, 5)).is_err());
    }
}
