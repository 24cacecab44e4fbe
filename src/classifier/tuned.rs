//! Cross-validated grid-search adapters
//!
//! The two tuning variants search a `(lambda, gamma)` grid by stratified
//! k-fold cross-validation on the training data before the final fit, and
//! expose the selected pair through [`Model::tuned`]. Fold assignment
//! derives from the fit seed, so the search is a pure function of
//! (data, seed). Ties on CV error resolve to the first grid point in
//! row-major (lambda, gamma) order.

use super::centroid::ShrunkenScorer;
use super::stats::{argmin, ClassStats};
use super::{Classifier, Model, TunedParams};
use crate::matrix::Matrix;
use crate::partition::stratified_folds;
use crate::{Error, Result};

const CV_FOLDS: usize = 3;

/// Evenly spaced gamma grid over `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
fn gamma_grid(points: usize) -> Vec<f64> {
    if points <= 1 {
        return vec![0.0];
    }
    (0..points)
        .map(|i| i as f64 / (points - 1) as f64)
        .collect()
}

/// Mean CV error of one grid point; infinity when any fold cannot be fitted
/// or scored, which removes that point from contention.
#[allow(clippy::cast_precision_loss)]
fn cv_error<F>(x: &Matrix, y: &[usize], folds: &[Vec<usize>], fit_predict: F) -> f64
where
    F: Fn(&Matrix, &[usize], &Matrix) -> Result<Vec<usize>>,
{
    let mut mismatches = 0usize;
    let mut scored = 0usize;
    for fold in folds {
        let mut in_fold = vec![false; x.rows()];
        for &row in fold {
            in_fold[row] = true;
        }
        let train_rows: Vec<usize> = (0..x.rows()).filter(|&r| !in_fold[r]).collect();

        let Ok(train_x) = x.select_rows(&train_rows) else {
            return f64::INFINITY;
        };
        let Ok(test_x) = x.select_rows(fold) else {
            return f64::INFINITY;
        };
        let train_y: Vec<usize> = train_rows.iter().map(|&r| y[r]).collect();

        match fit_predict(&train_x, &train_y, &test_x) {
            Ok(predicted) => {
                mismatches += predicted
                    .iter()
                    .zip(fold.iter().map(|&r| y[r]))
                    .filter(|(&p, t)| p != *t)
                    .count();
                scored += fold.len();
            }
            Err(_) => return f64::INFINITY,
        }
    }
    if scored == 0 {
        f64::INFINITY
    } else {
        mismatches as f64 / scored as f64
    }
}

/// Grid search driver shared by both tuning variants.
fn search_grid<F>(
    classifier: &'static str,
    x: &Matrix,
    y: &[usize],
    seed: u64,
    lambda_grid: &[f64],
    gamma_points: usize,
    fit_predict: F,
) -> Result<TunedParams>
where
    F: Fn(f64, f64, &Matrix, &[usize], &Matrix) -> Result<Vec<usize>>,
{
    let folds = stratified_folds(y, CV_FOLDS.min(y.len()), seed).map_err(|e| Error::Fit {
        classifier,
        message: format!("cannot build CV folds: {e}"),
    })?;

    let mut best: Option<(TunedParams, f64)> = None;
    for &lambda in lambda_grid {
        for &gamma in &gamma_grid(gamma_points) {
            let err = cv_error(x, y, &folds, |tx, ty, vx| {
                fit_predict(lambda, gamma, tx, ty, vx)
            });
            let better = best.map_or(err < f64::INFINITY, |(_, b)| err < b);
            if better {
                best = Some((TunedParams { lambda, gamma }, err));
            }
        }
    }
    best.map(|(params, _)| params).ok_or_else(|| Error::Fit {
        classifier,
        message: "every grid point failed cross-validation".into(),
    })
}

// ---------------------------------------------------------------------------
// rda
// ---------------------------------------------------------------------------

/// Regularized diagonal discriminant analysis with internal CV search.
///
/// `lambda` blends class-specific variances toward the pooled variance
/// (0 = quadratic, 1 = linear); `gamma` blends each class's variance vector
/// toward its own mean, shrinking extreme per-variable estimates.
#[derive(Debug, Clone, Copy)]
pub struct Rda {
    gamma_points: usize,
}

const RDA_LAMBDA_GRID: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

impl Rda {
    /// Configure the gamma grid resolution.
    #[must_use]
    pub const fn new(gamma_points: usize) -> Self {
        Self { gamma_points }
    }

    fn regularized_variances(
        stats: &ClassStats,
        lambda: f64,
        gamma: f64,
    ) -> Option<Vec<Vec<f64>>> {
        let p = stats.pooled_var.len();
        let mut out = Vec::with_capacity(stats.n_classes);
        for class_var in &stats.variances {
            let blended: Vec<f64> = class_var
                .iter()
                .zip(&stats.pooled_var)
                .map(|(&v, &pv)| (1.0 - lambda) * v + lambda * pv)
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let mean = blended.iter().sum::<f64>() / p as f64;
            let reg: Vec<f64> = blended.iter().map(|&v| (1.0 - gamma) * v + gamma * mean).collect();
            if reg.iter().any(|&v| v <= 0.0) {
                return None;
            }
            out.push(reg);
        }
        Some(out)
    }

    fn fit_at(
        x: &Matrix,
        y: &[usize],
        priors: &[f64],
        lambda: f64,
        gamma: f64,
    ) -> Result<RdaModel> {
        let stats = ClassStats::compute("rda", x, y, priors)?;
        let variances =
            Self::regularized_variances(&stats, lambda, gamma).ok_or_else(|| Error::Fit {
                classifier: "rda",
                message: format!(
                    "regularized variance is not positive at lambda={lambda}, gamma={gamma}"
                ),
            })?;
        Ok(RdaModel {
            means: stats.means,
            variances,
            log_priors: priors.iter().map(|&p| p.ln()).collect(),
            n_vars: x.cols(),
            tuned: TunedParams { lambda, gamma },
        })
    }
}

struct RdaModel {
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
    log_priors: Vec<f64>,
    n_vars: usize,
    tuned: TunedParams,
}

impl Classifier for Rda {
    fn name(&self) -> &'static str {
        "rda"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], seed: u64) -> Result<Box<dyn Model>> {
        let selected = search_grid(
            self.name(),
            x,
            y,
            seed,
            &RDA_LAMBDA_GRID,
            self.gamma_points,
            |lambda, gamma, tx, ty, vx| {
                let model = Self::fit_at(tx, ty, priors, lambda, gamma)?;
                model.predict_labels(vx)
            },
        )?;
        let model = Self::fit_at(x, y, priors, selected.lambda, selected.gamma)?;
        Ok(Box::new(model))
    }
}

impl RdaModel {
    fn predict_labels(&self, x: &Matrix) -> Result<Vec<usize>> {
        if x.cols() != self.n_vars {
            return Err(Error::Predict {
                classifier: "rda",
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

impl Model for RdaModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        self.predict_labels(x)
    }

    fn tuned(&self) -> Option<TunedParams> {
        Some(self.tuned)
    }
}

// ---------------------------------------------------------------------------
// scrda
// ---------------------------------------------------------------------------

/// Shrunken-centroid regularized discriminant with internal CV search.
///
/// `lambda` is the soft-threshold applied to standardized centroid offsets;
/// `gamma` blends the pooled per-variable variance toward its mean before
/// standardization.
#[derive(Debug, Clone, Copy)]
pub struct Scrda {
    gamma_points: usize,
}

const SCRDA_LAMBDA_GRID: [f64; 5] = [0.0, 0.5, 1.0, 1.5, 2.0];

impl Scrda {
    /// Configure the gamma grid resolution.
    #[must_use]
    pub const fn new(gamma_points: usize) -> Self {
        Self { gamma_points }
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit_at(
        x: &Matrix,
        y: &[usize],
        priors: &[f64],
        lambda: f64,
        gamma: f64,
    ) -> Result<ScrdaModel> {
        let stats = ClassStats::compute("scrda", x, y, priors)?;
        let mean_var = stats.pooled_var.iter().sum::<f64>() / stats.pooled_var.len() as f64;
        let variances: Vec<f64> = stats
            .pooled_var
            .iter()
            .map(|&v| (1.0 - gamma) * v + gamma * mean_var)
            .collect();
        let scorer = ShrunkenScorer::build("scrda", &stats, priors, lambda, &variances)?;
        Ok(ScrdaModel {
            scorer,
            tuned: TunedParams { lambda, gamma },
        })
    }
}

struct ScrdaModel {
    scorer: ShrunkenScorer,
    tuned: TunedParams,
}

impl Classifier for Scrda {
    fn name(&self) -> &'static str {
        "scrda"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], seed: u64) -> Result<Box<dyn Model>> {
        let selected = search_grid(
            self.name(),
            x,
            y,
            seed,
            &SCRDA_LAMBDA_GRID,
            self.gamma_points,
            |lambda, gamma, tx, ty, vx| {
                let model = Self::fit_at(tx, ty, priors, lambda, gamma)?;
                model.predict_labels(vx)
            },
        )?;
        let model = Self::fit_at(x, y, priors, selected.lambda, selected.gamma)?;
        Ok(Box::new(model))
    }
}

impl ScrdaModel {
    fn predict_labels(&self, x: &Matrix) -> Result<Vec<usize>> {
        if x.cols() != self.scorer.n_vars() {
            return Err(Error::Predict {
                classifier: "scrda",
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

impl Model for ScrdaModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        self.predict_labels(x)
    }

    fn tuned(&self) -> Option<TunedParams> {
        Some(self.tuned)
    }
}
