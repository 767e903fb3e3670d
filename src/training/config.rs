//! Training configuration

use crate::error::{PropensityError, Result};
use crate::scoring::DEFAULT_MODEL_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Folder holding the `datasets/` directory
    pub data_folder: PathBuf,

    /// CSV file name inside `datasets/`
    pub filename: String,

    /// Inverse regularization strength
    pub c: f64,

    /// Solver iteration cap
    pub max_iter: usize,

    /// Gradient tolerance for the solver
    pub tol: f64,

    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Shuffle folds with this seed; unshuffled when `None`
    pub seed: Option<u64>,

    /// Where the fitted artifact is written
    pub output_path: PathBuf,

    /// Directory of the local experiment store
    pub tracking_dir: PathBuf,

    /// Experiment the run is recorded under
    pub experiment_name: String,

    /// Register the artifact under this name after training
    pub register_as: Option<String>,

    /// Root of the model registry
    pub registry_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("."),
            filename: "banking_train.csv".to_string(),
            c: 1.0,
            max_iter: 300,
            tol: 1e-4,
            cv_folds: 10,
            seed: None,
            output_path: PathBuf::from("outputs").join("model.bin"),
            tracking_dir: PathBuf::from("mlruns"),
            experiment_name: DEFAULT_MODEL_NAME.to_string(),
            register_as: None,
            registry_dir: PathBuf::from("models"),
        }
    }
}

impl TrainingConfig {
    /// Configuration for `{data_folder}/datasets/{filename}` with strength `c`
    pub fn new(data_folder: impl AsRef<Path>, filename: impl Into<String>, c: f64) -> Self {
        Self {
            data_folder: data_folder.as_ref().to_path_buf(),
            filename: filename.into(),
            c,
            ..Default::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.tracking_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    /// Register the artifact after training
    pub fn with_registration(mut self, name: impl Into<String>, registry_dir: impl AsRef<Path>) -> Self {
        self.register_as = Some(name.into());
        self.registry_dir = registry_dir.as_ref().to_path_buf();
        self
    }

    /// Reject settings the trainer cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(PropensityError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(PropensityError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(PropensityError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.filename.is_empty() {
            return Err(PropensityError::ConfigError("filename is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.max_iter, 300);
        assert_eq!(config.cv_folds, 10);
        assert_eq!(config.output_path, PathBuf::from("outputs/model.bin"));
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_c() {
        for c in [0.0, -0.5, f64::INFINITY, f64::NAN] {
            let config = TrainingConfig::new("data", "train.csv", c);
            assert!(matches!(
                config.validate(),
                Err(PropensityError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_builders() {
        let config = TrainingConfig::new("data", "train.csv", 0.1)
            .with_cv_folds(5)
            .with_seed(42)
            .with_registration("buyers", "reg");
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.register_as.as_deref(), Some("buyers"));
        assert_eq!(config.registry_dir, PathBuf::from("reg"));
    }
}
