//! Error types for the propensity pipeline

use thiserror::Error;

/// Result type alias for propensity operations
pub type Result<T> = std::result::Result<T, PropensityError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum PropensityError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Unknown category '{category}' in column '{column}'")]
    UnknownCategory { column: String, category: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Model not initialized: call init() and check its diagnostics before run()")]
    ModelNotInitialized,

    #[error("Model not found in registry: {0}")]
    ModelNotFound(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for PropensityError {
    fn from(err: polars::error::PolarsError) -> Self {
        PropensityError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PropensityError {
    fn from(err: serde_json::Error) -> Self {
        PropensityError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for PropensityError {
    fn from(err: bincode::Error) -> Self {
        PropensityError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PropensityError {
    fn from(err: ndarray::ShapeError) -> Self {
        PropensityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PropensityError::FeatureNotFound("euribor3m".to_string());
        assert_eq!(err.to_string(), "Feature not found: euribor3m");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PropensityError = io_err.into();
        assert!(matches!(err, PropensityError::IoError(_)));
    }

    #[test]
    fn test_not_initialized_mentions_model() {
        let msg = PropensityError::ModelNotInitialized.to_string();
        assert!(msg.contains("Model not initialized"));
    }
}
