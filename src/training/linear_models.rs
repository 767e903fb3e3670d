//! Regularized logistic regression for binary classification

use crate::error::{PropensityError, Result};
use super::solver::{Lbfgs, LbfgsConfig, Objective};
use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every sample weighs 1
    Uniform,
    /// `n_samples / (n_classes * count(class))`
    Balanced,
}

/// Numerically stable logistic function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + exp(z)) without overflow
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Balanced weights per sample for 0/1 labels
pub fn balanced_sample_weights(y: &Array1<f64>) -> Result<Array1<f64>> {
    let n = y.len() as f64;
    let positives = y.iter().filter(|&&v| v == 1.0).count() as f64;
    let negatives = n - positives;

    if positives == 0.0 || negatives == 0.0 {
        return Err(PropensityError::TrainingError(
            "Training data must contain both classes".to_string(),
        ));
    }

    let w_pos = n / (2.0 * positives);
    let w_neg = n / (2.0 * negatives);
    Ok(y.mapv(|v| if v == 1.0 { w_pos } else { w_neg }))
}

/// Weighted, L2-penalized log loss scaled by the total sample weight:
/// `sum_i s_i * logloss_i / S + ||w||^2 / (2 * C * S)`
struct LogisticLoss<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    sample_weight: Array1<f64>,
    weight_sum: f64,
    c: f64,
}

impl<'a> LogisticLoss<'a> {
    fn split<'p>(&self, params: &'p Array1<f64>) -> (ArrayView1<'p, f64>, f64) {
        let n_features = self.x.ncols();
        let w = params.slice(s![..n_features]);
        (w, params[n_features])
    }
}

impl<'a> Objective for LogisticLoss<'a> {
    fn evaluate(&self, params: &Array1<f64>) -> (f64, Array1<f64>) {
        let n_features = self.x.ncols();
        let (w, b) = self.split(params);
        let z = self.x.dot(&w) + b;

        let mut loss = 0.0;
        let mut residual = Array1::zeros(z.len());
        for i in 0..z.len() {
            let sw = self.sample_weight[i];
            loss += sw * (log1p_exp(z[i]) - self.y[i] * z[i]);
            residual[i] = sw * (sigmoid(z[i]) - self.y[i]) / self.weight_sum;
        }

        let penalty = 1.0 / (self.c * self.weight_sum);
        let value = loss / self.weight_sum + 0.5 * penalty * w.dot(&w);

        let mut grad = Array1::zeros(params.len());
        let grad_w = self.x.t().dot(&residual) + &(penalty * &w);
        grad.slice_mut(s![..n_features]).assign(&grad_w);
        grad[n_features] = residual.sum();

        (value, grad)
    }
}

/// Logistic regression for binary classification, fitted with L-BFGS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum solver iterations
    pub max_iter: usize,
    /// Gradient tolerance
    pub tol: f64,
    /// Class weighting
    pub class_weight: ClassWeight,
    /// Solver iterations used by the last fit
    pub n_iter: usize,
    /// Whether the last fit reached the tolerance
    pub converged: bool,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            class_weight: ClassWeight::Uniform,
            n_iter: 0,
            converged: false,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength (must be positive)
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set gradient tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set class weighting
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    fn validate_params(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(PropensityError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(PropensityError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.validate_params()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PropensityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PropensityError::InvalidInput(format!(
                "Labels must be 0 or 1, found {}",
                bad
            )));
        }

        let sample_weight = match self.class_weight {
            ClassWeight::Balanced => balanced_sample_weights(y)?,
            ClassWeight::Uniform => {
                // Still needs both classes to define a boundary
                balanced_sample_weights(y)?;
                Array1::ones(n_samples)
            }
        };
        let weight_sum = sample_weight.sum();

        let objective = LogisticLoss {
            x,
            y,
            sample_weight,
            weight_sum,
            c: self.c,
        };

        // Coefficients followed by the unpenalized intercept
        let n_params = n_features + 1;
        let solver = Lbfgs::new(LbfgsConfig {
            max_iter: self.max_iter,
            tol: self.tol,
            ..Default::default()
        });
        let result = solver.minimize(&objective, Array1::zeros(n_params))?;

        if !result.converged {
            tracing::warn!(
                iterations = result.iterations,
                grad_max_norm = result.grad_max_norm,
                "L-BFGS did not converge; increase max_iter or scale the data"
            );
        }

        let coefficients = result.x.slice(s![..n_features]).to_owned();
        let intercept = result.x[n_features];

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.n_iter = result.iterations;
        self.converged = result.converged;
        self.is_fitted = true;

        Ok(self)
    }

    fn fitted_params(&self) -> Result<(&Array1<f64>, f64)> {
        match (&self.coefficients, self.is_fitted) {
            (Some(coefficients), true) => Ok((coefficients, self.intercept.unwrap_or(0.0))),
            _ => Err(PropensityError::ModelNotFitted),
        }
    }

    /// Signed distance to the decision boundary
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = self.fitted_params()?;
        if x.ncols() != coefficients.len() {
            return Err(PropensityError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + intercept)
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(|z| if z > 0.0 { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn overlapping_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 1.0],
            [1.5, 2.0],
            [2.0, 1.5],
            [3.0, 3.5],
            [3.5, 2.5],
            [4.0, 4.5],
            [5.0, 5.0],
            [5.5, 4.0],
            [2.5, 3.0],
            [4.5, 3.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        (x, y)
    }

    #[test]
    fn test_logistic_regression() {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new().with_c(1.0).with_max_iter(300);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted);

        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [10.0, 10.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_gradient_vanishes_at_solution() {
        let (x, y) = overlapping_data();
        let mut model = LogisticRegression::new()
            .with_c(0.5)
            .with_max_iter(300)
            .with_tol(1e-6)
            .with_class_weight(ClassWeight::Balanced);
        model.fit(&x, &y).unwrap();
        assert!(model.converged);

        let sample_weight = balanced_sample_weights(&y).unwrap();
        let objective = LogisticLoss {
            x: &x,
            y: &y,
            weight_sum: sample_weight.sum(),
            sample_weight,
            c: 0.5,
        };
        let mut params = model.coefficients.clone().unwrap().to_vec();
        params.push(model.intercept.unwrap());
        let (_, grad) = objective.evaluate(&Array1::from_vec(params));
        for g in grad.iter() {
            assert!(g.abs() < 1e-5);
        }
    }

    #[test]
    fn test_stronger_regularization_shrinks_coefficients() {
        let (x, y) = overlapping_data();
        let mut loose = LogisticRegression::new().with_c(100.0).with_max_iter(300);
        let mut tight = LogisticRegression::new().with_c(0.01).with_max_iter(300);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| {
            let c = m.coefficients.as_ref().unwrap();
            c.dot(c).sqrt()
        };
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_refit_is_deterministic() {
        let (x, y) = overlapping_data();
        let mut a = LogisticRegression::new().with_class_weight(ClassWeight::Balanced);
        let mut b = LogisticRegression::new().with_class_weight(ClassWeight::Balanced);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.intercept, b.intercept);
    }

    #[test]
    fn test_balanced_weights() {
        let y = array![1.0, 0.0, 0.0, 0.0];
        let w = balanced_sample_weights(&y).unwrap();
        assert!((w[0] - 2.0).abs() < 1e-12);
        assert!((w[1] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w.sum() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_c() {
        let (x, y) = overlapping_data();
        for c in [0.0, -1.0, f64::NAN] {
            let mut model = LogisticRegression::new().with_c(c);
            assert!(matches!(
                model.fit(&x, &y),
                Err(PropensityError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = LogisticRegression::new();
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PropensityError::ModelNotFitted)
        ));
    }
}
