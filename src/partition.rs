//! Label-stratified randomized train/test partitioning
//!
//! Each class is split independently: `round(train_fraction * class_size)`
//! of its indices are drawn uniformly without replacement into the training
//! side, the rest go to test. This keeps class proportions intact in both
//! splits even under severe imbalance, where a plain random split can starve
//! a class from training entirely.
//!
//! Randomness is a pure function of the caller-supplied seed, so a fixed
//! seed reproduces the same partitions regardless of scheduling order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::telemetry::{EventSink, Level};
use crate::{Error, Result};

/// One train/test split over row indices.
///
/// Invariants (enforced by construction): train and test are sorted,
/// disjoint, and their union covers exactly the input rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Partition {
    /// Training row indices, sorted ascending.
    #[must_use]
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    /// Test row indices, sorted ascending.
    #[must_use]
    pub fn test(&self) -> &[usize] {
        &self.test
    }
}

// Per-partition seed stride (splitmix64 increment) so each requested
// partition draws from an independent stream of the same seed.
const PARTITION_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Draw `count` stratified train/test partitions over `labels`.
///
/// `labels` are dense class indices. A class with a single member cannot be
/// split; its lone row is assigned to training and a
/// `partition.single_member_class` warning is emitted through `sink`. A class
/// with two or more members always contributes at least one row to each side.
///
/// # Errors
///
/// Returns `Error::Partition` if `labels` is empty, `train_fraction` is not
/// strictly inside (0, 1), or `count` is zero.
pub fn stratified_partitions(
    labels: &[usize],
    train_fraction: f64,
    count: usize,
    seed: u64,
    sink: &dyn EventSink,
) -> Result<Vec<Partition>> {
    if labels.is_empty() {
        return Err(Error::Partition("label vector is empty".to_string()));
    }
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(Error::Partition(format!(
            "train_fraction must be in (0, 1), got {train_fraction}"
        )));
    }
    if count == 0 {
        return Err(Error::Partition(
            "partition count must be at least 1".to_string(),
        ));
    }

    let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        by_class[label].push(row);
    }

    let mut partitions = Vec::with_capacity(count);
    for ordinal in 0..count {
        let mut rng =
            StdRng::seed_from_u64(seed.wrapping_add((ordinal as u64).wrapping_mul(PARTITION_SEED_STRIDE)));
        let mut train = Vec::new();
        let mut test = Vec::new();

        for (class, members) in by_class.iter().enumerate() {
            match members.len() {
                0 => {}
                1 => {
                    // Cannot split a singleton; train keeps it so every
                    // observed class is represented at fit time.
                    train.push(members[0]);
                    sink.log(
                        Level::Warn,
                        "partition.single_member_class",
                        &[("class", class.to_string())],
                    );
                }
                size => {
                    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let raw = (train_fraction * size as f64).round() as usize;
                    // Both sides keep at least one member of the class.
                    let n_train = raw.clamp(1, size - 1);

                    let mut shuffled = members.clone();
                    shuffled.shuffle(&mut rng);
                    train.extend_from_slice(&shuffled[..n_train]);
                    test.extend_from_slice(&shuffled[n_train..]);
                }
            }
        }

        train.sort_unstable();
        test.sort_unstable();
        partitions.push(Partition { train, test });
    }

    Ok(partitions)
}

/// Deal rows into `folds` label-stratified folds for cross-validation.
///
/// Each class's indices are shuffled with the seed and dealt round-robin,
/// so fold sizes differ by at most one within every class. Returned folds
/// are sorted; every row lands in exactly one fold.
///
/// # Errors
///
/// Returns `Error::Partition` if `labels` is empty or `folds` is less than
/// 2 or greater than the row count.
pub fn stratified_folds(labels: &[usize], folds: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if labels.is_empty() {
        return Err(Error::Partition("label vector is empty".to_string()));
    }
    if folds < 2 || folds > labels.len() {
        return Err(Error::Partition(format!(
            "fold count must be in [2, {}], got {folds}",
            labels.len()
        )));
    }

    let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        by_class[label].push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assigned: Vec<Vec<usize>> = vec![Vec::new(); folds];
    let mut next_fold = 0usize;
    for members in &mut by_class {
        members.shuffle(&mut rng);
        for &row in members.iter() {
            assigned[next_fold].push(row);
            next_fold = (next_fold + 1) % folds;
        }
    }
    for fold in &mut assigned {
        fold.sort_unstable();
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{CapturingSink, NullSink};

    fn balanced_labels(n: usize) -> Vec<usize> {
        (0..n).map(|i| i % 2).collect()
    }

    #[test]
    fn test_disjoint_and_covering() {
        let labels = balanced_labels(100);
        let parts = stratified_partitions(&labels, 0.67, 1, 7, &NullSink).unwrap();
        let p = &parts[0];

        let mut all: Vec<usize> = p.train().iter().chain(p.test()).copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..100).collect();
        assert_eq!(all, expected);

        for idx in p.train() {
            assert!(!p.test().contains(idx));
        }
    }

    #[test]
    fn test_stratification_preserves_class_balance() {
        let labels = balanced_labels(100);
        let parts = stratified_partitions(&labels, 0.67, 1, 3, &NullSink).unwrap();
        let p = &parts[0];

        // round(0.67 * 50) = 34 per class.
        assert_eq!(p.train().len(), 68);
        assert_eq!(p.test().len(), 32);
        let train_class0 = p.train().iter().filter(|&&i| labels[i] == 0).count();
        assert_eq!(train_class0, 34);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let labels = balanced_labels(40);
        let a = stratified_partitions(&labels, 0.5, 3, 99, &NullSink).unwrap();
        let b = stratified_partitions(&labels, 0.5, 3, 99, &NullSink).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_seeds_differ() {
        let labels = balanced_labels(40);
        let a = stratified_partitions(&labels, 0.5, 1, 1, &NullSink).unwrap();
        let b = stratified_partitions(&labels, 0.5, 1, 2, &NullSink).unwrap();
        // Same sizes, almost surely different membership.
        assert_eq!(a[0].train().len(), b[0].train().len());
        assert_ne!(a[0].train(), b[0].train());
    }

    #[test]
    fn test_requested_count_honored() {
        let labels = balanced_labels(20);
        let parts = stratified_partitions(&labels, 0.5, 5, 0, &NullSink).unwrap();
        assert_eq!(parts.len(), 5);
    }

    #[test]
    fn test_single_member_class_goes_to_train() {
        // Class 2 has exactly one member, row 6.
        let labels = vec![0, 0, 0, 1, 1, 1, 2];
        let sink = CapturingSink::new();
        let parts = stratified_partitions(&labels, 0.5, 1, 11, &sink).unwrap();
        let p = &parts[0];

        assert!(p.train().contains(&6));
        assert!(!p.test().contains(&6));
        assert_eq!(sink.count("partition.single_member_class"), 1);
    }

    #[test]
    fn test_two_member_class_split_both_sides() {
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        // Even at a high train fraction, the 2-member class keeps one row in test.
        let parts = stratified_partitions(&labels, 0.9, 1, 3, &NullSink).unwrap();
        let p = &parts[0];
        let train_class1 = p.train().iter().filter(|&&i| labels[i] == 1).count();
        let test_class1 = p.test().iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(train_class1, 1);
        assert_eq!(test_class1, 1);
    }

    #[test]
    fn test_folds_cover_all_rows_once() {
        let labels = balanced_labels(23);
        let folds = stratified_folds(&labels, 3, 5).unwrap();
        assert_eq!(folds.len(), 3);

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..23).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_folds_are_stratified_and_deterministic() {
        let labels = balanced_labels(30);
        let folds = stratified_folds(&labels, 3, 9).unwrap();
        for fold in &folds {
            // 15 rows per class dealt into 3 folds: 5 of each class per fold.
            let class0 = fold.iter().filter(|&&i| labels[i] == 0).count();
            assert_eq!(class0, 5);
            assert_eq!(fold.len(), 10);
        }
        assert_eq!(folds, stratified_folds(&labels, 3, 9).unwrap());
    }

    #[test]
    fn test_fold_count_bounds() {
        let labels = balanced_labels(6);
        assert!(stratified_folds(&labels, 1, 0).is_err());
        assert!(stratified_folds(&labels, 7, 0).is_err());
        assert!(stratified_folds(&[], 2, 0).is_err());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let labels = balanced_labels(10);
        assert!(stratified_partitions(&[], 0.5, 1, 0, &NullSink).is_err());
        assert!(stratified_partitions(&labels, 0.0, 1, 0, &NullSink).is_err());
        assert!(stratified_partitions(&labels, 1.0, 1, 0, &NullSink).is_err());
        assert!(stratified_partitions(&labels, 0.5, 0, 0, &NullSink).is_err());
    }
}
