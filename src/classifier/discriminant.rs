//! Diagonal and pooled-covariance discriminant adapters
//!
//! Three Gaussian discriminant variants: `dlda` (pooled per-variable
//! variances), `dqda` (per-class variances), and `lda` (pooled full
//! covariance with a diagonal ridge). All fail with a fit error rather than
//! divide through degenerate variance.

use super::stats::{argmin, ClassStats};
use super::{Classifier, Model};
use crate::matrix::Matrix;
use crate::{Error, Result};

fn predict_shape_check(classifier: &'static str, x: &Matrix, expected_cols: usize) -> Result<()> {
    if x.cols() == expected_cols {
        Ok(())
    } else {
        Err(Error::Predict {
            classifier,
            message: format!(
                "test matrix has {} variables, model was fitted on {expected_cols}",
                x.cols()
            ),
        })
    }
}

/// Diagonal linear discriminant analysis.
///
/// Scores a row against each class mean with pooled per-variable variances;
/// the covariance is never materialized, which is what makes the variant
/// usable at microarray dimensionality.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalLda;

struct DldaModel {
    means: Vec<Vec<f64>>,
    inv_var: Vec<f64>,
    log_priors: Vec<f64>,
}

impl Classifier for DiagonalLda {
    fn name(&self) -> &'static str {
        "dlda"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], _seed: u64) -> Result<Box<dyn Model>> {
        let stats = ClassStats::compute(self.name(), x, y, priors)?;
        if let Some(j) = stats.pooled_var.iter().position(|&v| v <= 0.0) {
            return Err(Error::Fit {
                classifier: self.name(),
                message: format!("variable {j} has zero pooled within-class variance"),
            });
        }
        Ok(Box::new(DldaModel {
            means: stats.means,
            inv_var: stats.pooled_var.iter().map(|v| 1.0 / v).collect(),
            log_priors: priors.iter().map(|&p| p.ln()).collect(),
        }))
    }
}

impl Model for DldaModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        predict_shape_check("dlda", x, self.inv_var.len())?;
        let mut labels = Vec::with_capacity(x.rows());
        for row in 0..x.rows() {
            let sample = x.row(row);
            let scores: Vec<f64> = self
                .means
                .iter()
                .zip(&self.log_priors)
                .map(|(mean, &log_prior)| {
                    let dist: f64 = sample
                        .iter()
                        .zip(mean)
                        .zip(&self.inv_var)
                        .map(|((&v, &m), &iv)| (v - m).powi(2) * iv)
                        .sum();
                    dist - 2.0 * log_prior
                })
                .collect();
            labels.push(argmin(&scores));
        }
        Ok(labels)
    }
}

/// Diagonal quadratic discriminant analysis.
///
/// Like `dlda` but with per-class variances and the corresponding
/// log-determinant term, so classes may differ in spread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalQda;

struct DqdaModel {
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
    log_priors: Vec<f64>,
    n_vars: usize,
}

impl Classifier for DiagonalQda {
    fn name(&self) -> &'static str {
        "dqda"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], _seed: u64) -> Result<Box<dyn Model>> {
        let stats = ClassStats::compute(self.name(), x, y, priors)?;
        for (class, var) in stats.variances.iter().enumerate() {
            if let Some(j) = var.iter().position(|&v| v <= 0.0) {
                return Err(Error::Fit {
                    classifier: self.name(),
                    message: format!("class {class} has zero variance in variable {j}"),
                });
            }
        }
        Ok(Box::new(DqdaModel {
            means: stats.means,
            variances: stats.variances,
            log_priors: priors.iter().map(|&p| p.ln()).collect(),
            n_vars: x.cols(),
        }))
    }
}

impl Model for DqdaModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        predict_shape_check("dqda", x, self.n_vars)?;
        let mut labels = Vec::with_capacity(x.rows());
        for row in 0..x.rows() {
            let sample = x.row(row);
            let scores: Vec<f64> = (0..self.means.len())
                .map(|class| {
                    let mut score = 0.0;
                    for j in 0..self.n_vars {
                        let var = self.variances[class][j];
                        score += (sample[j] - self.means[class][j]).powi(2) / var + var.ln();
                    }
                    score - 2.0 * self.log_priors[class]
                })
                .collect();
            labels.push(argmin(&scores));
        }
        Ok(labels)
    }
}

/// Pooled-covariance linear discriminant with diagonal ridge stabilization.
///
/// The pooled covariance of small-sample high-dimensional training data is
/// singular whenever variables outnumber observations; a ridge proportional
/// to the mean diagonal restores positive definiteness in the benign cases,
/// and the Cholesky factorization rejects the rest with a fit error.
#[derive(Debug, Clone, Copy)]
pub struct RidgeLda {
    ridge: f64,
}

impl Default for RidgeLda {
    fn default() -> Self {
        Self { ridge: 1e-6 }
    }
}

impl RidgeLda {
    /// Ridge coefficient relative to the mean covariance diagonal.
    #[must_use]
    pub const fn new(ridge: f64) -> Self {
        Self { ridge }
    }
}

struct RidgeLdaModel {
    // Per-class linear discriminant: score = x . weights[c] + bias[c].
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    n_vars: usize,
}

impl Classifier for RidgeLda {
    fn name(&self) -> &'static str {
        "lda"
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], _seed: u64) -> Result<Box<dyn Model>> {
        let stats = ClassStats::compute(self.name(), x, y, priors)?;
        let p = x.cols();
        let pooled_denom = x.rows().saturating_sub(stats.n_classes);
        if pooled_denom == 0 {
            return Err(Error::Fit {
                classifier: self.name(),
                message: "no residual degrees of freedom for pooled covariance".into(),
            });
        }

        // Pooled within-class covariance, lower triangle only.
        let mut cov = vec![0.0f64; p * p];
        for (row, &label) in y.iter().enumerate() {
            let sample = x.row(row);
            let mean = &stats.means[label];
            for i in 0..p {
                let di = sample[i] - mean[i];
                for j in 0..=i {
                    cov[i * p + j] += di * (sample[j] - mean[j]);
                }
            }
        }
        for v in &mut cov {
            *v /= pooled_denom as f64;
        }

        let mean_diag = (0..p).map(|i| cov[i * p + i]).sum::<f64>() / p as f64;
        if mean_diag <= 0.0 {
            return Err(Error::Fit {
                classifier: self.name(),
                message: "pooled covariance has an all-zero diagonal".into(),
            });
        }
        let ridge = self.ridge * mean_diag;
        for i in 0..p {
            cov[i * p + i] += ridge;
        }

        let chol = cholesky(&cov, p).ok_or_else(|| Error::Fit {
            classifier: self.name(),
            message: "pooled covariance is singular after ridge stabilization".into(),
        })?;

        let mut weights = Vec::with_capacity(stats.n_classes);
        let mut bias = Vec::with_capacity(stats.n_classes);
        for (class, mean) in stats.means.iter().enumerate() {
            let w = cholesky_solve(&chol, p, mean);
            let quad: f64 = mean.iter().zip(&w).map(|(&m, &wi)| m * wi).sum();
            bias.push(priors[class].ln() - 0.5 * quad);
            weights.push(w);
        }

        Ok(Box::new(RidgeLdaModel {
            weights,
            bias,
            n_vars: p,
        }))
    }
}

impl Model for RidgeLdaModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        predict_shape_check("lda", x, self.n_vars)?;
        let mut labels = Vec::with_capacity(x.rows());
        for row in 0..x.rows() {
            let sample = x.row(row);
            // Argmax of the linear scores; negate so the shared argmin
            // tie-break applies unchanged.
            let scores: Vec<f64> = self
                .weights
                .iter()
                .zip(&self.bias)
                .map(|(w, &b)| {
                    let dot: f64 = sample.iter().zip(w).map(|(&v, &wi)| v * wi).sum();
                    -(dot + b)
                })
                .collect();
            labels.push(argmin(&scores));
        }
        Ok(labels)
    }
}

/// Lower-triangular Cholesky factor of a symmetric matrix given by its
/// lower triangle in row-major `p × p` storage. `None` when the matrix is
/// not positive definite.
fn cholesky(a: &[f64], p: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0f64; p * p];
    for i in 0..p {
        for j in 0..=i {
            let mut sum = a[i * p + j];
            for k in 0..j {
                sum -= l[i * p + k] * l[j * p + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i * p + i] = sum.sqrt();
            } else {
                l[i * p + j] = sum / l[j * p + j];
            }
        }
    }
    Some(l)
}

/// Solve `L L^T w = b` by forward then back substitution.
fn cholesky_solve(l: &[f64], p: usize, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0f64; p];
    for i in 0..p {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * p + k] * y[k];
        }
        y[i] = sum / l[i * p + i];
    }
    let mut w = vec![0.0f64; p];
    for i in (0..p).rev() {
        let mut sum = y[i];
        for k in (i + 1)..p {
            sum -= l[k * p + i] * w[k];
        }
        w[i] = sum / l[i * p + i];
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::uniform_priors;

    /// Two well-separated classes in two variables, with spread.
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

    fn test_points() -> Matrix {
        Matrix::from_vec(vec![0.1, 0.1, 5.0, 5.0], 2, 2).unwrap()
    }

    #[test]
    fn test_dlda_separates_clusters() {
        let (x, y) = separable();
        let model = DiagonalLda.fit(&x, &y, &uniform_priors(2), 0).unwrap();
        assert_eq!(model.predict(&test_points()).unwrap(), vec![0, 1]);
        assert!(model.tuned().is_none());
    }

    #[test]
    fn test_dqda_separates_clusters() {
        let (x, y) = separable();
        let model = DiagonalQda.fit(&x, &y, &uniform_priors(2), 0).unwrap();
        assert_eq!(model.predict(&test_points()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_ridge_lda_separates_clusters() {
        let (x, y) = separable();
        let model = RidgeLda::default()
            .fit(&x, &y, &uniform_priors(2), 0)
            .unwrap();
        assert_eq!(model.predict(&test_points()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_dlda_rejects_zero_pooled_variance() {
        // Second variable is constant within both classes.
        let data = vec![0.0, 1.0, 0.5, 1.0, 5.0, 1.0, 5.5, 1.0];
        let x = Matrix::from_vec(data, 4, 2).unwrap();
        let y = vec![0, 0, 1, 1];
        let err = match DiagonalLda.fit(&x, &y, &uniform_priors(2), 0) {
            Ok(_) => panic!("expected fit to fail"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), "fit");
    }

    #[test]
    fn test_dqda_rejects_zero_class_variance() {
        // Class 1 is constant in variable 0.
        let data = vec![0.0, 1.0, 0.5, 2.0, 5.0, 3.0, 5.0, 4.0];
        let x = Matrix::from_vec(data, 4, 2).unwrap();
        let y = vec![0, 0, 1, 1];
        assert!(DiagonalQda.fit(&x, &y, &uniform_priors(2), 0).is_err());
    }

    #[test]
    fn test_ridge_lda_rejects_all_zero_diagonal() {
        let x = Matrix::zeros(4, 2);
        let y = vec![0, 0, 1, 1];
        assert!(RidgeLda::default()
            .fit(&x, &y, &uniform_priors(2), 0)
            .is_err());
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let (x, y) = separable();
        let model = DiagonalLda.fit(&x, &y, &uniform_priors(2), 0).unwrap();
        let wrong = Matrix::zeros(1, 3);
        assert!(model.predict(&wrong).is_err());
    }

    #[test]
    fn test_cholesky_identity() {
        let a = vec![1.0, 0.0, 0.0, 1.0];
        let l = cholesky(&a, 2).unwrap();
        let w = cholesky_solve(&l, 2, &[3.0, 4.0]);
        assert!((w[0] - 3.0).abs() < 1e-12);
        assert!((w[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = vec![0.0, 0.0, 0.0, -1.0];
        assert!(cholesky(&a, 2).is_none());
    }
}
