//! Variable selection by univariate class separation
//!
//! Every variable is scored with a one-way ANOVA F-statistic
//! (between-class over within-class variance) computed from training rows
//! only; the top-k indices by descending score are returned. Selection is
//! deterministic: no randomness, and score ties break toward the lower
//! column index.
//!
//! Ranking uses a bounded min-heap, O(N log K) over N variables instead of
//! a full O(N log N) sort — the microarray case is N in the tens of
//! thousands with K around a thousand.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::matrix::Matrix;
use crate::{Error, Result};

/// One candidate variable during ranking.
///
/// Heap ordering is inverted so the weakest kept candidate surfaces at the
/// top of the `BinaryHeap` and can be evicted in O(log K).
#[derive(Debug)]
struct ScoredVariable {
    score: f64,
    index: usize,
}

impl PartialEq for ScoredVariable {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredVariable {}

impl Ord for ScoredVariable {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater = worse: lower score first, then higher index on ties.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for ScoredVariable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-variable one-way ANOVA F-statistics.
///
/// A variable with zero within-class variance scores `f64::INFINITY` when its
/// class means differ (perfect separator) and `0.0` when they do not.
///
/// # Errors
///
/// Returns `Error::Selection` if `y` does not match the row count or fewer
/// than two classes are present.
#[allow(clippy::cast_precision_loss)]
pub fn f_scores(x: &Matrix, y: &[usize]) -> Result<Vec<f64>> {
    if y.len() != x.rows() {
        return Err(Error::Selection(format!(
            "label vector has {} entries, matrix has {} rows",
            y.len(),
            x.rows()
        )));
    }
    let n_classes = y.iter().max().map_or(0, |&m| m + 1);
    let mut class_sizes = vec![0usize; n_classes];
    for &label in y {
        class_sizes[label] += 1;
    }
    let groups = class_sizes.iter().filter(|&&s| s > 0).count();
    if groups < 2 {
        return Err(Error::Selection(
            "F-score requires at least two classes in training data".to_string(),
        ));
    }
    let n = x.rows();

    let mut scores = Vec::with_capacity(x.cols());
    let mut class_sums = vec![0.0f64; n_classes];
    for col in 0..x.cols() {
        class_sums.iter_mut().for_each(|s| *s = 0.0);
        let mut total = 0.0;
        for row in 0..n {
            let v = x.get(row, col);
            class_sums[y[row]] += v;
            total += v;
        }
        let grand_mean = total / n as f64;

        let mut between = 0.0;
        for (class, &size) in class_sizes.iter().enumerate() {
            if size > 0 {
                let mean = class_sums[class] / size as f64;
                between += size as f64 * (mean - grand_mean).powi(2);
            }
        }
        between /= (groups - 1) as f64;

        let mut within = 0.0;
        for row in 0..n {
            let mean = class_sums[y[row]] / class_sizes[y[row]] as f64;
            within += (x.get(row, col) - mean).powi(2);
        }
        within /= (n - groups) as f64;

        let score = if within > 0.0 {
            between / within
        } else if between > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        scores.push(score);
    }
    Ok(scores)
}

/// Indices of the `k` most discriminating variables, descending by F-score.
///
/// # Errors
///
/// Returns `Error::Selection` if `k` is zero or exceeds the variable count,
/// or if the inputs fail [`f_scores`] validation.
pub fn select_top_k(x: &Matrix, y: &[usize], k: usize) -> Result<Vec<usize>> {
    if k == 0 {
        return Err(Error::Selection("k must be greater than 0".to_string()));
    }
    if k > x.cols() {
        return Err(Error::Selection(format!(
            "k exceeds variable count: k = {k}, variables = {}",
            x.cols()
        )));
    }

    let scores = f_scores(x, y)?;

    let mut heap: BinaryHeap<ScoredVariable> = BinaryHeap::with_capacity(k);
    for (index, &score) in scores.iter().enumerate() {
        let candidate = ScoredVariable { score, index };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(weakest) = heap.peek() {
            if candidate.cmp(weakest) == Ordering::Less {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    // Ascending heap order is best-first by construction.
    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|v| v.index)
        .collect())
}
