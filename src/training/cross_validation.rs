//! Cross-validation splitters

use crate::error::{PropensityError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter.
///
/// Every class is spread over the folds as evenly as possible. Without
/// shuffling, the samples of a class keep their data order across
/// contiguous fold blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CrossValidator {
    /// Create an unshuffled splitter
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle each class's fold assignment
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Generate train/test splits for the labels `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(PropensityError::ValidationError(
                "n_splits must be at least 2".to_string()
            ));
        }
        if n_samples < n_splits {
            return Err(PropensityError::ValidationError(
                format!("n_samples ({}) must be >= n_splits ({})", n_samples, n_splits)
            ));
        }

        // Classes encoded in order of first appearance
        let mut classes: Vec<i64> = Vec::new();
        let encoded: Vec<usize> = y
            .iter()
            .map(|&val| {
                let class = val.round() as i64;
                match classes.iter().position(|&c| c == class) {
                    Some(pos) => pos,
                    None => {
                        classes.push(class);
                        classes.len() - 1
                    }
                }
            })
            .collect();

        let n_classes = classes.len();
        let mut counts = vec![0usize; n_classes];
        for &k in &encoded {
            counts[k] += 1;
        }

        let max_count = counts.iter().copied().max().unwrap_or(0);
        if n_splits > max_count {
            return Err(PropensityError::ValidationError(format!(
                "n_splits ({}) cannot exceed the number of members in each class ({})",
                n_splits, max_count
            )));
        }
        let min_count = counts.iter().copied().min().unwrap_or(0);
        if min_count < n_splits {
            tracing::warn!(
                min_class_count = min_count,
                n_splits,
                "The least populated class has fewer members than n_splits"
            );
        }

        // allocation[fold][class]: deal the sorted labels round-robin over folds
        let mut y_order = encoded.clone();
        y_order.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; n_splits];
        for (i, &k) in y_order.iter().enumerate() {
            allocation[i % n_splits][k] += 1;
        }

        let mut rng = if self.shuffle { Some(self.rng()) } else { None };
        let mut fold_of = vec![0usize; n_samples];
        for k in 0..n_classes {
            let mut folds_for_class: Vec<usize> = (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][k]))
                .collect();
            if let Some(rng) = rng.as_mut() {
                folds_for_class.shuffle(rng);
            }

            let members = encoded.iter().enumerate().filter(|(_, &c)| c == k).map(|(i, _)| i);
            for (idx, fold) in members.zip(folds_for_class) {
                fold_of[idx] = fold;
            }
        }

        Ok(splits_from_assignment(&fold_of, n_splits))
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Build splits from a per-sample fold assignment; indices stay ascending
fn splits_from_assignment(fold_of: &[usize], n_splits: usize) -> Vec<CVSplit> {
    (0..n_splits)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..fold_of.len()).partition(|&i| fold_of[i] == fold_idx);
            CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect()
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores.
    ///
    /// NaN marks a fold that could not be evaluated; mean and std cover the
    /// remaining folds, and are 0 when none remain.
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let finite: Vec<f64> = scores.iter().copied().filter(|s| !s.is_nan()).collect();
        if finite.is_empty() {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let n = finite.len() as f64;
        let mean_score = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }

    /// Folds that produced a score
    pub fn n_scored(&self) -> usize {
        self.scores.iter().filter(|s| !s.is_nan()).count()
    }
}
