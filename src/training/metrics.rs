//! Binary classification metrics

use crate::error::{PropensityError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion matrix counts for the positive class 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t > 0.5, p > 0.5) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

/// Classification scores for one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// tp / (tp + fn); 0 when the evaluated rows hold no positives
    pub recall: f64,
    pub precision: f64,
    pub f1_score: f64,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Score predictions against ground truth
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PropensityError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(PropensityError::InvalidInput(
                "Cannot score an empty prediction set".to_string(),
            ));
        }

        let counts = ConfusionCounts::compute(y_true, y_pred);
        let accuracy = (counts.tp + counts.tn) as f64 / counts.total() as f64;
        let recall = ratio(counts.tp, counts.tp + counts.fn_);
        let precision = ratio(counts.tp, counts.tp + counts.fp);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy,
            recall,
            precision,
            f1_score,
            n_samples: counts.total(),
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 { num as f64 / den as f64 } else { 0.0 }
}
