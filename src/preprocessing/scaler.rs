//! Feature scaling on dense matrices

use crate::error::{PropensityError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for a fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Column mean
    pub center: f64,
    /// Population standard deviation, 1.0 for constant columns
    pub scale: f64,
}

/// Standard scaling (z-score): (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned per-column parameters
    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    /// Number of columns seen during fit
    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    /// Learn per-column mean and population standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(PropensityError::InvalidInput(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mean: Array1<f64> = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PropensityError::InvalidInput("Empty matrix".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        self.params = mean
            .iter()
            .zip(std.iter())
            .map(|(&center, &scale)| ScalerParams {
                center,
                scale: if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale },
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale a matrix with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PropensityError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(PropensityError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut scaled = x.clone();
        for (mut column, params) in scaled.columns_mut().into_iter().zip(self.params.iter()) {
            column.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(scaled)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
