//! Shared per-class moment computations for the discriminant family

use crate::matrix::Matrix;
use crate::{Error, Result};

/// Per-class first and second moments of a training matrix.
#[derive(Debug, Clone)]
pub(crate) struct ClassStats {
    /// Number of classes (dense label range).
    pub n_classes: usize,
    /// Rows per class.
    pub counts: Vec<usize>,
    /// Per-class, per-variable means; `means[class][variable]`.
    pub means: Vec<Vec<f64>>,
    /// Per-class, per-variable unbiased variances (0 when a class has one row).
    pub variances: Vec<Vec<f64>>,
    /// Pooled within-class variance per variable.
    pub pooled_var: Vec<f64>,
    /// Grand mean per variable.
    pub grand_mean: Vec<f64>,
}

impl ClassStats {
    /// Compute moments for `x` grouped by dense labels `y`.
    ///
    /// Fails when shapes disagree, any class in the dense range has no
    /// rows, or the prior vector does not cover the classes; these are the
    /// rank-deficiency conditions the discriminant adapters cannot absorb.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        classifier: &'static str,
        x: &Matrix,
        y: &[usize],
        priors: &[f64],
    ) -> Result<Self> {
        let fit_err = |message: String| Error::Fit {
            classifier,
            message,
        };

        if y.len() != x.rows() || x.rows() == 0 {
            return Err(fit_err(format!(
                "training shape mismatch: {} labels for {} rows",
                y.len(),
                x.rows()
            )));
        }
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        if n_classes < 2 {
            return Err(fit_err("training data has fewer than two classes".into()));
        }
        if priors.len() != n_classes {
            return Err(fit_err(format!(
                "prior vector covers {} classes, training data has {n_classes}",
                priors.len()
            )));
        }

        let p = x.cols();
        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(fit_err(format!("class {empty} has no training rows")));
        }

        let mut means = vec![vec![0.0; p]; n_classes];
        let mut grand_mean = vec![0.0; p];
        for (row, &label) in y.iter().enumerate() {
            for (j, &v) in x.row(row).iter().enumerate() {
                means[label][j] += v;
                grand_mean[j] += v;
            }
        }
        for (class, mean) in means.iter_mut().enumerate() {
            for v in mean.iter_mut() {
                *v /= counts[class] as f64;
            }
        }
        for v in &mut grand_mean {
            *v /= x.rows() as f64;
        }

        let mut variances = vec![vec![0.0; p]; n_classes];
        let mut pooled_var = vec![0.0; p];
        for (row, &label) in y.iter().enumerate() {
            for (j, &v) in x.row(row).iter().enumerate() {
                let dev = (v - means[label][j]).powi(2);
                variances[label][j] += dev;
                pooled_var[j] += dev;
            }
        }
        for (class, var) in variances.iter_mut().enumerate() {
            let denom = counts[class].saturating_sub(1);
            for v in var.iter_mut() {
                *v = if denom > 0 { *v / denom as f64 } else { 0.0 };
            }
        }
        let pooled_denom = x.rows().saturating_sub(n_classes);
        for v in &mut pooled_var {
            *v = if pooled_denom > 0 {
                *v / pooled_denom as f64
            } else {
                0.0
            };
        }

        Ok(Self {
            n_classes,
            counts,
            means,
            variances,
            pooled_var,
            grand_mean,
        })
    }
}

/// Argmin over per-class scores with deterministic lower-index tie-break.
pub(crate) fn argmin(scores: &[f64]) -> usize {
    let mut best = 0;
    for (class, &score) in scores.iter().enumerate().skip(1) {
        if score < scores[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Matrix, Vec<usize>) {
        let data = vec![
            1.0, 10.0, //
            3.0, 10.0, //
            5.0, 20.0, //
            7.0, 20.0,
        ];
        (Matrix::from_vec(data, 4, 2).unwrap(), vec![0, 0, 1, 1])
    }

    #[test]
    fn test_class_moments() {
        let (x, y) = toy();
        let stats = ClassStats::compute("test", &x, &y, &[0.5, 0.5]).unwrap();

        assert_eq!(stats.counts, vec![2, 2]);
        assert_eq!(stats.means[0], vec![2.0, 10.0]);
        assert_eq!(stats.means[1], vec![6.0, 20.0]);
        assert_eq!(stats.grand_mean, vec![4.0, 15.0]);
        // Unbiased variance of {1,3} = 2; pooled over both classes = 2.
        assert!((stats.variances[0][0] - 2.0).abs() < 1e-12);
        assert!((stats.pooled_var[0] - 2.0).abs() < 1e-12);
        assert!((stats.pooled_var[1] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_class_rejected() {
        let x = Matrix::from_vec(vec![1.0, 2.0, 3.0], 3, 1).unwrap();
        // Dense range says 3 classes but class 1 never appears.
        let result = ClassStats::compute("test", &x, &[0, 0, 2], &[0.3, 0.3, 0.4]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prior_length_mismatch_rejected() {
        let (x, y) = toy();
        assert!(ClassStats::compute("test", &x, &y, &[1.0]).is_err());
    }

    #[test]
    fn test_argmin_tie_breaks_low() {
        assert_eq!(argmin(&[0.5, 0.2, 0.2]), 1);
        assert_eq!(argmin(&[0.1]), 0);
    }
}
