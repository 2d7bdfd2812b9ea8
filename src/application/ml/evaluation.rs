//! Model evaluation: hold-out split, classification scores and learning curve.
//!
//! Scores follow the weighted-average convention: per-label precision, recall
//! and F1 are averaged with the label's support in `y_true` as weight. Labels
//! are the union of true and predicted labels; an undefined ratio counts as 0.

use crate::domain::errors::{PipelineError, ValidationError};
use crate::domain::ml::model::{self, Classifier, ModelParams};
use crate::domain::ml::{LearningCurve, MetricsRecord};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tracing::debug;

pub const SPLIT_SEED: u64 = 42;
pub const TEST_FRACTION: f64 = 0.2;
pub const CV_FOLDS: usize = 5;
pub const CURVE_STEPS: usize = 10;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Seeded shuffle split; the first `ceil(n * TEST_FRACTION)` shuffled rows
/// form the test set.
pub fn train_test_split(n_samples: usize, seed: u64) -> Result<Split, ValidationError> {
    let n_test = (n_samples as f64 * TEST_FRACTION).ceil() as usize;
    if n_samples < 2 || n_test >= n_samples {
        return Err(ValidationError::InsufficientRows {
            stage: "train/test split",
            rows: n_samples,
            required: 2,
        });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_indices = indices.split_off(n_test);
    Ok(Split {
        train_indices,
        test_indices: indices,
    })
}

pub fn select<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

pub fn accuracy(y_true: &[i32], y_pred: &[i32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Support-weighted precision, recall and F1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

pub fn weighted_scores(y_true: &[i32], y_pred: &[i32]) -> WeightedScores {
    let labels: BTreeSet<i32> = y_true.iter().chain(y_pred).copied().collect();
    let total = y_true.len() as f64;
    let mut scores = WeightedScores {
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
    };
    if total == 0.0 {
        return scores;
    }

    for label in labels {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == label, p == label) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        let support = (tp + fn_) as f64;
        if support == 0.0 {
            continue;
        }
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let weight = support / total;
        scores.precision += weight * precision;
        scores.recall += weight * recall;
        scores.f1 += weight * f1;
    }
    scores
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Scores the fitted classifier on both partitions
pub fn score(
    classifier: &Classifier,
    x_train: &[Vec<f64>],
    y_train: &[i32],
    x_test: &[Vec<f64>],
    y_test: &[i32],
) -> Result<MetricsRecord, PipelineError> {
    let train_pred = model::predict_classifier(classifier, x_train)?;
    let test_pred = model::predict_classifier(classifier, x_test)?;
    let train = weighted_scores(y_train, &train_pred);
    let test = weighted_scores(y_test, &test_pred);

    Ok(MetricsRecord {
        accuracy_train: accuracy(y_train, &train_pred),
        accuracy_test: accuracy(y_test, &test_pred),
        f1_train: train.f1,
        f1_test: test.f1,
        precision_train: train.precision,
        precision_test: test.precision,
        recall_train: train.recall,
        recall_test: test.recall,
    })
}

/// Stratified k-fold without shuffling.
///
/// Rows sorted by class are dealt to the folds round-robin, which fixes how
/// many rows of each class every fold tests on; each class is then cut into
/// contiguous chunks of those sizes in row order. Every fold gets at least
/// one test row whenever there are `k` rows.
pub fn stratified_k_fold(y: &[i32], k: usize) -> Result<Vec<Split>, ValidationError> {
    if k < 2 || y.len() < k {
        return Err(ValidationError::InsufficientRows {
            stage: "cross-validation",
            rows: y.len(),
            required: k.max(2),
        });
    }

    let classes: Vec<i32> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let members: Vec<Vec<usize>> = classes
        .iter()
        .map(|&class| (0..y.len()).filter(|&i| y[i] == class).collect())
        .collect();

    // allocation[fold][class]: test rows of `class` in `fold`
    let mut allocation = vec![vec![0usize; classes.len()]; k];
    let sorted_classes = members
        .iter()
        .enumerate()
        .flat_map(|(class, rows)| std::iter::repeat_n(class, rows.len()));
    for (position, class) in sorted_classes.enumerate() {
        allocation[position % k][class] += 1;
    }

    let mut fold_of = vec![0usize; y.len()];
    for (class, rows) in members.iter().enumerate() {
        let mut start = 0;
        for (fold, counts) in allocation.iter().enumerate() {
            let size = counts[class];
            for &row in &rows[start..start + size] {
                fold_of[row] = fold;
            }
            start += size;
        }
    }

    Ok((0..k)
        .map(|fold| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| fold_of[i] == fold);
            Split {
                train_indices,
                test_indices,
            }
        })
        .collect())
}

/// Training-set sizes at evenly spaced fractions `0.1..=1.0` of `max_size`,
/// deduplicated and at least 1
pub fn curve_sizes(max_size: usize, steps: usize) -> Vec<usize> {
    let steps = steps.max(1);
    let mut sizes: Vec<usize> = (0..steps)
        .map(|i| {
            let fraction = if steps == 1 {
                1.0
            } else {
                0.1 + 0.9 * i as f64 / (steps - 1) as f64
            };
            ((fraction * max_size as f64 + 1e-9).floor() as usize).max(1)
        })
        .collect();
    sizes.dedup();
    sizes
}

/// Mean train and held-out accuracy per training-set size over stratified
/// folds of `(x, y)`.
pub fn learning_curve(
    x: &[Vec<f64>],
    y: &[i32],
    params: &ModelParams,
) -> Result<LearningCurve, PipelineError> {
    let folds = stratified_k_fold(y, CV_FOLDS)?;
    // the smallest CV training set bounds every subset
    let max_size = folds
        .iter()
        .map(|f| f.train_indices.len())
        .min()
        .unwrap_or(0);
    let sizes = curve_sizes(max_size, CURVE_STEPS);

    let mut train_scores_mean = Vec::with_capacity(sizes.len());
    let mut test_scores_mean = Vec::with_capacity(sizes.len());

    for &size in &sizes {
        let mut train_total = 0.0;
        let mut test_total = 0.0;
        for fold in &folds {
            let subset = &fold.train_indices[..size];
            let x_sub = select(x, subset);
            let y_sub = select(y, subset);
            let x_val = select(x, &fold.test_indices);
            let y_val = select(y, &fold.test_indices);

            let (train_pred, val_pred) = fit_or_constant(&x_sub, &y_sub, &x_val, params)?;
            train_total += accuracy(&y_sub, &train_pred);
            test_total += accuracy(&y_val, &val_pred);
        }
        train_scores_mean.push(train_total / folds.len() as f64);
        test_scores_mean.push(test_total / folds.len() as f64);
    }

    debug!("Learning curve computed for sizes {:?}", sizes);
    Ok(LearningCurve {
        train_sizes: sizes,
        train_scores_mean,
        test_scores_mean,
    })
}

/// Predictions on the training subset and the validation fold. A subset
/// holding a single class predicts that class everywhere.
fn fit_or_constant(
    x_sub: &[Vec<f64>],
    y_sub: &[i32],
    x_val: &[Vec<f64>],
    params: &ModelParams,
) -> Result<(Vec<i32>, Vec<i32>), PipelineError> {
    let first = y_sub[0];
    if y_sub.iter().all(|&label| label == first) {
        return Ok((vec![first; x_sub.len()], vec![first; x_val.len()]));
    }
    let classifier = model::fit_classifier(x_sub, y_sub, params)?;
    Ok((
        model::predict_classifier(&classifier, x_sub)?,
        model::predict_classifier(&classifier, x_val)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let split = train_test_split(101, SPLIT_SEED).unwrap();
        assert_eq!(split.test_indices.len(), 21);
        assert_eq!(split.train_indices.len(), 80);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(&split.test_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());

        assert_eq!(split, train_test_split(101, SPLIT_SEED).unwrap());
    }

    #[test]
    fn test_split_rejects_tiny_input() {
        assert!(matches!(
            train_test_split(1, SPLIT_SEED),
            Err(ValidationError::InsufficientRows { rows: 1, .. })
        ));
        assert!(train_test_split(0, SPLIT_SEED).is_err());
    }

    #[test]
    fn test_accuracy() {
        assert!(approx(accuracy(&[1, 0, 1, 1], &[1, 0, 0, 1]), 0.75));
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_weighted_scores_match_hand_computation() {
        // label 0: tp=2 fp=1 fn=1 support=3 -> p=2/3 r=2/3 f1=2/3
        // label 1: tp=1 fp=1 fn=1 support=2 -> p=1/2 r=1/2 f1=1/2
        let y_true = [0, 0, 0, 1, 1];
        let y_pred = [0, 0, 1, 1, 0];
        let scores = weighted_scores(&y_true, &y_pred);
        let expected = 0.6 * (2.0 / 3.0) + 0.4 * 0.5;
        assert!(approx(scores.precision, expected));
        assert!(approx(scores.recall, expected));
        assert!(approx(scores.f1, expected));
    }

    #[test]
    fn test_zero_division_scores_zero() {
        // nothing predicted as 1: precision for label 1 is undefined -> 0
        let scores = weighted_scores(&[0, 1], &[0, 0]);
        assert!(approx(scores.precision, 0.5 * 0.5));
        assert!(approx(scores.recall, 0.5));

        let none = weighted_scores(&[], &[]);
        assert_eq!(none.f1, 0.0);
    }

    #[test]
    fn test_stratified_folds_keep_class_balance() {
        let y: Vec<i32> = (0..50).map(|i| i32::from(i % 5 == 0)).collect();
        let folds = stratified_k_fold(&y, 5).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; y.len()];
        for fold in &folds {
            let positives = fold.test_indices.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(positives, 2);
            assert_eq!(fold.test_indices.len(), 10);
            assert_eq!(fold.train_indices.len(), 40);
            for &i in &fold.test_indices {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_stratified_rejects_too_few_rows() {
        assert_eq!(
            stratified_k_fold(&[0, 1, 0], 5).unwrap_err(),
            ValidationError::InsufficientRows {
                stage: "cross-validation",
                rows: 3,
                required: 5
            }
        );
    }

    #[test]
    fn test_small_classes_leave_no_fold_empty() {
        // every class has fewer rows than folds
        let y = [0, 1, 0, 1, 0, 1];
        let folds = stratified_k_fold(&y, 5).unwrap();

        let sizes: Vec<usize> = folds.iter().map(|f| f.test_indices.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1, 1, 1]);
        assert_eq!(folds[0].test_indices, vec![0, 1]);
        assert_eq!(folds[1].test_indices, vec![2]);
        assert_eq!(folds[2].test_indices, vec![4]);
        assert_eq!(folds[3].test_indices, vec![3]);
        assert_eq!(folds[4].test_indices, vec![5]);
    }

    #[test]
    fn test_learning_curve_on_small_data_scores_every_fold() {
        // feature 0 tracks the label, so a fitted model is right on every row
        let x: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![if i % 2 == 1 { 10.0 } else { -10.0 }, (i % 5) as f64])
            .collect();
        let y: Vec<i32> = (0..12).map(|i| i32::from(i % 2 == 1)).collect();
        let curve = learning_curve(&x, &y, &ModelParams::default()).unwrap();

        let last = curve.test_scores_mean.len() - 1;
        assert!(approx(curve.test_scores_mean[last], 1.0), "{:?}", curve);
        assert!(approx(curve.train_scores_mean[last], 1.0));
    }

    #[test]
    fn test_curve_sizes() {
        assert_eq!(
            curve_sizes(80, 10),
            vec![8, 16, 24, 32, 40, 48, 56, 64, 72, 80]
        );
        assert_eq!(curve_sizes(5, 10), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_learning_curve_shapes() {
        let x: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 30) as f64, ((i * 7) % 11) as f64])
            .collect();
        let y: Vec<i32> = (0..60).map(|i| i32::from(i % 30 >= 15)).collect();
        let curve = learning_curve(&x, &y, &ModelParams::default()).unwrap();

        assert_eq!(curve.train_sizes.len(), curve.train_scores_mean.len());
        assert_eq!(curve.train_sizes.len(), curve.test_scores_mean.len());
        assert_eq!(*curve.train_sizes.last().unwrap(), 48);
        for score in curve.train_scores_mean.iter().chain(&curve.test_scores_mean) {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[test]
    fn test_single_class_subset_uses_constant_predictor() {
        let (train, val) = fit_or_constant(
            &[vec![1.0], vec![2.0]],
            &[0, 0],
            &[vec![3.0]],
            &ModelParams::default(),
        )
        .unwrap();
        assert_eq!(train, vec![0, 0]);
        assert_eq!(val, vec![0]);
    }
}
