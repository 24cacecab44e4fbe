//! Bagged tree-ensemble adapter
//!
//! Depth-limited CART trees trained on bootstrap resamples, each split drawn
//! from a random feature subset, aggregated by majority vote. Trees use an
//! array-based node representation so traversal is a flat index chase.
//! All randomness comes from the fit seed: tree `t` derives its own stream,
//! so a fit is reproducible for a fixed (data, seed) pair.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use super::{Classifier, Model};
use crate::matrix::Matrix;
use crate::{Error, Result};

const TREE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// A node in one trained tree.
#[derive(Debug, Clone)]
struct TreeNode {
    /// Feature index to split on (`-2` for leaf nodes).
    feature: i32,
    /// Split threshold (features <= threshold go left).
    threshold: f64,
    /// Index of left child (`-1` for leaf).
    left: i32,
    /// Index of right child (`-1` for leaf).
    right: i32,
    /// Predicted class for leaf nodes.
    prediction: Option<usize>,
}

impl TreeNode {
    const fn is_leaf(&self) -> bool {
        self.feature < 0
    }
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    #[allow(clippy::cast_sign_loss)]
    fn predict(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node.prediction.unwrap_or(0);
            }
            let value = sample.get(node.feature as usize).copied().unwrap_or(0.0);
            idx = if value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Random-forest-style bagged ensemble.
#[derive(Debug, Clone, Copy)]
pub struct BaggedForest {
    n_trees: usize,
    max_depth: usize,
}

impl Default for BaggedForest {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
        }
    }
}

impl BaggedForest {
    /// Configure ensemble size and tree depth limit.
    #[must_use]
    pub const fn new(n_trees: usize, max_depth: usize) -> Self {
        Self { n_trees, max_depth }
    }
}

struct ForestModel {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl Classifier for BaggedForest {
    fn name(&self) -> &'static str {
        "forest"
    }

    fn fit(&self, x: &Matrix, y: &[usize], priors: &[f64], seed: u64) -> Result<Box<dyn Model>> {
        if y.len() != x.rows() || x.rows() == 0 {
            return Err(Error::Fit {
                classifier: self.name(),
                message: format!(
                    "training shape mismatch: {} labels for {} rows",
                    y.len(),
                    x.rows()
                ),
            });
        }
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        if priors.len() < n_classes {
            return Err(Error::Fit {
                classifier: self.name(),
                message: format!(
                    "prior vector covers {} classes, training data has {n_classes}",
                    priors.len()
                ),
            });
        }
        if self.n_trees == 0 {
            return Err(Error::Fit {
                classifier: self.name(),
                message: "ensemble size must be at least 1".into(),
            });
        }

        // Class priors do not enter the voting rule; the ensemble sees class
        // frequencies through the bootstrap itself.
        let n_classes = priors.len();
        let mut trees = Vec::with_capacity(self.n_trees);
        for t in 0..self.n_trees {
            let mut rng = StdRng::seed_from_u64(
                seed.wrapping_add((t as u64 + 1).wrapping_mul(TREE_SEED_STRIDE)),
            );
            let rows: Vec<usize> = (0..x.rows()).map(|_| rng.gen_range(0..x.rows())).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                n_classes,
                max_depth: self.max_depth,
                nodes: Vec::new(),
            };
            builder.grow(&rows, 0, &mut rng);
            trees.push(Tree {
                nodes: builder.nodes,
            });
        }

        Ok(Box::new(ForestModel {
            trees,
            n_features: x.cols(),
            n_classes,
        }))
    }
}

impl Model for ForestModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        if x.cols() != self.n_features {
            return Err(Error::Predict {
                classifier: "forest",
                message: format!(
                    "test matrix has {} variables, model was fitted on {}",
                    x.cols(),
                    self.n_features
                ),
            });
        }
        let mut labels = Vec::with_capacity(x.rows());
        for row in 0..x.rows() {
            let sample = x.row(row);
            let mut votes = vec![0usize; self.n_classes];
            for tree in &self.trees {
                let pred = tree.predict(sample);
                if pred < self.n_classes {
                    votes[pred] += 1;
                }
            }
            labels.push(majority(&votes));
        }
        Ok(labels)
    }
}

/// Winning class with lower-index tie-break.
fn majority(votes: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = class;
        }
    }
    best
}

struct TreeBuilder<'a> {
    x: &'a Matrix,
    y: &'a [usize],
    n_classes: usize,
    max_depth: usize,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Grow a subtree over `rows`, returning its node index.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(rows);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if depth >= self.max_depth || pure || rows.len() < 2 {
            return self.push_leaf(&counts);
        }

        let Some((feature, threshold)) = self.best_split(rows, &counts, rng) else {
            return self.push_leaf(&counts);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x.get(r, feature) <= threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return self.push_leaf(&counts);
        }

        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            feature: feature as i32,
            threshold,
            left: -1,
            right: -1,
            prediction: None,
        });
        let left = self.grow(&left_rows, depth + 1, rng);
        let right = self.grow(&right_rows, depth + 1, rng);
        self.nodes[idx].left = left as i32;
        self.nodes[idx].right = right as i32;
        idx
    }

    fn push_leaf(&mut self, counts: &[usize]) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            feature: -2,
            threshold: 0.0,
            left: -1,
            right: -1,
            prediction: Some(majority(counts)),
        });
        idx
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    /// Best (feature, threshold) over a random sqrt-sized feature subset by
    /// Gini impurity decrease; `None` when no candidate split separates the
    /// rows.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn best_split(
        &self,
        rows: &[usize],
        counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<(usize, f64)> {
        let p = self.x.cols();
        let mtry = (p as f64).sqrt().ceil() as usize;
        let candidates = sample(rng, p, mtry.min(p));

        let total = rows.len() as f64;
        let parent_gini = gini(counts, rows.len());

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 0.0f64;

        for feature in candidates {
            // Sort rows by this feature's value; split candidates are the
            // midpoints between distinct adjacent values.
            let mut ordered: Vec<usize> = rows.to_vec();
            ordered.sort_by(|&a, &b| {
                self.x
                    .get(a, feature)
                    .partial_cmp(&self.x.get(b, feature))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_counts = vec![0usize; self.n_classes];
            for window in 0..ordered.len() - 1 {
                left_counts[self.y[ordered[window]]] += 1;
                let v_here = self.x.get(ordered[window], feature);
                let v_next = self.x.get(ordered[window + 1], feature);
                if v_here >= v_next {
                    continue;
                }

                let n_left = window + 1;
                let n_right = rows.len() - n_left;
                let right_counts: Vec<usize> = counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(&c, &l)| c - l)
                    .collect();
                let weighted = (n_left as f64 / total) * gini(&left_counts, n_left)
                    + (n_right as f64 / total) * gini(&right_counts, n_right);
                let gain = parent_gini - weighted;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, (v_here + v_next) / 2.0));
                }
            }
        }
        best
    }
}

#[allow(clippy::cast_precision_loss)]
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let frac = c as f64 / n;
            frac * frac
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::uniform_priors;

    fn separable() -> (Matrix, Vec<usize>) {
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            data.extend_from_slice(&[f64::from(i) * 0.1, 1.0]);
            labels.push(0);
        }
        for i in 0..10 {
            data.extend_from_slice(&[5.0 + f64::from(i) * 0.1, 1.0]);
            labels.push(1);
        }
        (Matrix::from_vec(data, 20, 2).unwrap(), labels)
    }

    #[test]
    fn test_forest_separates_clusters() {
        let (x, y) = separable();
        let model = BaggedForest::new(25, 6)
            .fit(&x, &y, &uniform_priors(2), 42)
            .unwrap();
        let test = Matrix::from_vec(vec![0.3, 1.0, 5.4, 1.0], 2, 2).unwrap();
        assert_eq!(model.predict(&test).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_fixed_seed_reproducible() {
        let (x, y) = separable();
        let priors = uniform_priors(2);
        let test = Matrix::from_vec(vec![2.4, 1.0, 2.6, 1.0, 0.1, 1.0], 3, 2).unwrap();

        let a = BaggedForest::new(15, 6).fit(&x, &y, &priors, 7).unwrap();
        let b = BaggedForest::new(15, 6).fit(&x, &y, &priors, 7).unwrap();
        assert_eq!(a.predict(&test).unwrap(), b.predict(&test).unwrap());
    }

    #[test]
    fn test_gini() {
        assert!((gini(&[5, 0], 5) - 0.0).abs() < 1e-12);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < 1e-12);
        assert!((gini(&[0, 0], 0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_majority_tie_breaks_low() {
        assert_eq!(majority(&[3, 3]), 0);
        assert_eq!(majority(&[1, 4, 4]), 1);
    }

    #[test]
    fn test_constant_features_fall_back_to_leaf() {
        // No split can separate identical rows; the forest still fits and
        // predicts the majority class.
        let x = Matrix::from_vec(vec![1.0; 8], 8, 1).unwrap();
        let y = vec![0, 0, 0, 0, 0, 1, 1, 1];
        let model = BaggedForest::new(9, 4)
            .fit(&x, &y, &uniform_priors(2), 3)
            .unwrap();
        let labels = model
            .predict(&Matrix::from_vec(vec![1.0], 1, 1).unwrap())
            .unwrap();
        assert!(labels[0] < 2);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let (x, y) = separable();
        assert!(BaggedForest::default()
            .fit(&x, &y[..5], &uniform_priors(2), 0)
            .is_err());

        let model = BaggedForest::new(5, 3)
            .fit(&x, &y, &uniform_priors(2), 0)
            .unwrap();
        assert!(model.predict(&Matrix::zeros(1, 7)).is_err());
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (x, y) = separable();
        assert!(BaggedForest::new(0, 4)
            .fit(&x, &y, &uniform_priors(2), 0)
            .is_err());
    }
}
