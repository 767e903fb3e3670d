//! Data provider for automated model search
//!
//! Hands the raw selected features and labels to an external search tool.
//! The data directory comes from the environment the tool's runtime sets up.

use ndarray::Array1;
use polars::prelude::DataFrame;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{PropensityError, Result};
use crate::preprocessing::FeatureSelector;
use crate::utils::DataLoader;

/// Environment variable naming the mounted data directory
pub const DATA_DIR_ENV: &str = "AZUREML_DATAREFERENCE_workspaceblobstore";

/// File read from the data directory
pub const TRAINING_FILE: &str = "banking_train.csv";

/// Unencoded features and flattened labels
#[derive(Debug, Clone)]
pub struct AutoMlData {
    /// The selected feature columns, as read
    pub x: DataFrame,
    pub y: Array1<f64>,
}

/// Load `banking_train.csv` from the directory named by [`DATA_DIR_ENV`]
pub fn get_data() -> Result<AutoMlData> {
    let dir = resolve_data_dir(env::var(DATA_DIR_ENV).ok())?;
    get_data_from(dir)
}

/// Load `banking_train.csv` from `dir`
pub fn get_data_from(dir: impl AsRef<Path>) -> Result<AutoMlData> {
    let path = dir.as_ref().join(TRAINING_FILE);
    let df = DataLoader::new().load_csv(&path)?;
    let (x, y) = FeatureSelector::banking().select(&df)?;

    tracing::info!(path = %path.display(), rows = x.height(), "Prepared automated search data");
    Ok(AutoMlData { x, y })
}

fn resolve_data_dir(value: Option<String>) -> Result<PathBuf> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v)),
        _ => Err(PropensityError::ConfigError(format!(
            "Environment variable {} is not set",
            DATA_DIR_ENV
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir() {
        assert_eq!(resolve_data_dir(Some("/mnt/data".to_string())).unwrap(), PathBuf::from("/mnt/data"));
        assert!(matches!(resolve_data_dir(None), Err(PropensityError::ConfigError(_))));
        assert!(resolve_data_dir(Some("  ".to_string())).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(get_data_from(dir.path()).is_err());
    }
}
