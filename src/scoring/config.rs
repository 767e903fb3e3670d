//! Scoring configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name the scorer resolves through the registry by default
pub const DEFAULT_MODEL_NAME: &str = "propensity_to_buy_predictor";

/// Configuration for the scoring service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Registered model name
    pub model_name: String,

    /// Root of the model registry
    pub registry_dir: PathBuf,

    /// Pin a registered version instead of the latest
    pub version: Option<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            registry_dir: PathBuf::from("models"),
            version: None,
        }
    }
}

impl ScoringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_registry_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.registry_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}
