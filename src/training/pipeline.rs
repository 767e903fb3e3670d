//! Standardize-then-classify pipeline

use crate::error::{PropensityError, Result};
use crate::preprocessing::StandardScaler;
use super::linear_models::LogisticRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Scaler followed by a logistic regression, fitted and applied as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    scaler: StandardScaler,
    classifier: LogisticRegression,
}

impl Pipeline {
    /// Wrap an unfitted classifier; the scaler is created fresh
    pub fn new(classifier: LogisticRegression) -> Self {
        Self {
            scaler: StandardScaler::new(),
            classifier,
        }
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted() && self.classifier.is_fitted
    }

    /// Number of encoded input columns
    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// Fit the scaler on `x`, then the classifier on the scaled matrix
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let scaled = self.scaler.fit_transform(x)?;
        self.classifier.fit(&scaled, y)?;
        Ok(self)
    }

    fn scaled(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PropensityError::ModelNotFitted);
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PropensityError::InvalidInput(
                "Input contains non-finite values".to_string(),
            ));
        }
        self.scaler.transform(x)
    }

    /// 0/1 predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.classifier.predict(&self.scaled(x)?)
    }

    /// Probability of class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.classifier.predict_proba(&self.scaled(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::linear_models::ClassWeight;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [25.0, 1000.0],
            [30.0, 1200.0],
            [35.0, 900.0],
            [60.0, 5000.0],
            [65.0, 5200.0],
            [58.0, 4800.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    fn classifier() -> LogisticRegression {
        LogisticRegression::new()
            .with_max_iter(300)
            .with_class_weight(ClassWeight::Balanced)
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let (x, y) = data();
        let mut pipeline = Pipeline::new(classifier());
        pipeline.fit(&x, &y).unwrap();

        assert!(pipeline.is_fitted());
        assert_eq!(pipeline.n_features(), 2);
        assert_eq!(pipeline.predict(&x).unwrap(), y);

        let proba = pipeline.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_refit_identical() {
        let (x, y) = data();
        let mut a = Pipeline::new(classifier());
        let mut b = Pipeline::new(classifier());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.classifier().coefficients, b.classifier().coefficients);
        assert_eq!(a.scaler().params(), b.scaler().params());
    }

    #[test]
    fn test_rejects_non_finite() {
        let (x, y) = data();
        let mut pipeline = Pipeline::new(classifier());
        pipeline.fit(&x, &y).unwrap();
        assert!(pipeline.predict(&array![[f64::NAN, 1.0]]).is_err());
    }

    #[test]
    fn test_unfitted() {
        let pipeline = Pipeline::new(classifier());
        assert!(matches!(
            pipeline.predict(&array![[1.0, 2.0]]),
            Err(PropensityError::ModelNotFitted)
        ));
    }
}
