//! Limited-memory BFGS minimizer
//!
//! Two-loop recursion over the last `history` curvature pairs with a
//! backtracking Armijo line search. Convergence is declared when the largest
//! absolute gradient component drops to `tol`.

use crate::error::{PropensityError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Differentiable objective
pub trait Objective {
    /// Objective value and gradient at `x`
    fn evaluate(&self, x: &Array1<f64>) -> (f64, Array1<f64>);
}

/// Solver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbfgsConfig {
    /// Number of stored curvature pairs
    pub history: usize,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Gradient max-norm tolerance
    pub tol: f64,
    /// Maximum backtracking steps per iteration
    pub max_line_search: usize,
    /// Sufficient decrease constant
    pub c1: f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            history: 10,
            max_iter: 100,
            tol: 1e-4,
            max_line_search: 40,
            c1: 1e-4,
        }
    }
}

/// Outcome of a minimization
#[derive(Debug, Clone)]
pub struct LbfgsResult {
    pub x: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
    pub grad_max_norm: f64,
}

/// L-BFGS minimizer
#[derive(Debug, Clone, Default)]
pub struct Lbfgs {
    config: LbfgsConfig,
}

struct CurvaturePair {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64,
}

impl Lbfgs {
    pub fn new(config: LbfgsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LbfgsConfig {
        &self.config
    }

    /// Minimize `objective` starting from `x0`
    pub fn minimize<O: Objective>(&self, objective: &O, x0: Array1<f64>) -> Result<LbfgsResult> {
        let (mut value, mut grad) = objective.evaluate(&x0);
        if !value.is_finite() {
            return Err(PropensityError::TrainingError(
                "Objective is not finite at the starting point".to_string(),
            ));
        }

        let mut x = x0;
        let mut pairs: VecDeque<CurvaturePair> = VecDeque::with_capacity(self.config.history);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iter {
            if max_abs(&grad) <= self.config.tol {
                converged = true;
                break;
            }

            let mut direction = self.search_direction(&grad, &pairs);
            let mut slope = grad.dot(&direction);
            if slope >= 0.0 {
                // Lost descent; restart from steepest descent
                pairs.clear();
                direction = self.search_direction(&grad, &pairs);
                slope = grad.dot(&direction);
            }

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..self.config.max_line_search {
                let candidate = &x + &(step * &direction);
                let (candidate_value, candidate_grad) = objective.evaluate(&candidate);
                if candidate_value.is_finite()
                    && candidate_value <= value + self.config.c1 * step * slope
                {
                    accepted = Some((candidate, candidate_value, candidate_grad));
                    break;
                }
                step *= 0.5;
            }

            let Some((x_new, value_new, grad_new)) = accepted else {
                tracing::debug!(iteration = iterations, "Line search failed to make progress");
                break;
            };

            let s = &x_new - &x;
            let y = &grad_new - &grad;
            let sy = s.dot(&y);
            if sy > f64::EPSILON * y.dot(&y) && sy > 0.0 {
                if pairs.len() == self.config.history {
                    pairs.pop_front();
                }
                pairs.push_back(CurvaturePair { s, y, rho: 1.0 / sy });
            }

            x = x_new;
            value = value_new;
            grad = grad_new;
            iterations += 1;
        }

        let grad_max_norm = max_abs(&grad);
        if !converged && grad_max_norm <= self.config.tol {
            converged = true;
        }

        Ok(LbfgsResult {
            x,
            value,
            iterations,
            converged,
            grad_max_norm,
        })
    }

    /// Two-loop recursion: approximate `-H * grad`
    fn search_direction(&self, grad: &Array1<f64>, pairs: &VecDeque<CurvaturePair>) -> Array1<f64> {
        let mut q = grad.clone();
        let mut alphas = Vec::with_capacity(pairs.len());

        for pair in pairs.iter().rev() {
            let alpha = pair.rho * pair.s.dot(&q);
            q.scaled_add(-alpha, &pair.y);
            alphas.push(alpha);
        }

        let gamma = match pairs.back() {
            Some(last) => last.s.dot(&last.y) / last.y.dot(&last.y),
            None => {
                let norm = grad.dot(grad).sqrt();
                if norm > 0.0 { 1.0 / norm } else { 1.0 }
            }
        };
        let mut r = q * gamma;

        for (pair, alpha) in pairs.iter().zip(alphas.iter().rev()) {
            let beta = pair.rho * pair.y.dot(&r);
            r.scaled_add(alpha - beta, &pair.s);
        }

        -r
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0f64, |acc, x| acc.max(x.abs()))
}
