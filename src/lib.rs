//! Propensity - propensity-to-buy model training and scoring
//!
//! This crate trains a binary classifier that predicts whether a banking
//! customer will buy a product after a marketing campaign, and serves it:
//! - Fixed feature selection and one-hot encoding of the raw table
//! - Standard scaling + balanced logistic regression (L-BFGS)
//! - Stratified k-fold cross-validation reported to an experiment tracker
//! - A versioned binary artifact and a file-backed model registry
//! - An `init` / `run` scoring service over JSON payloads
//!
//! # Modules
//!
//! - [`preprocessing`] - Feature selection, encoding, scaling
//! - [`training`] - Solver, model, cross-validation and the [`training::Trainer`]
//! - [`tracking`] - Experiment tracking
//! - [`export`] - Model artifact and registry
//! - [`scoring`] - Scoring service
//! - [`automl`] - Data provider for automated model search
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;

// Persistence and serving
pub mod export;
pub mod scoring;
pub mod tracking;

// Integrations
pub mod automl;
pub mod utils;

// Services
pub mod cli;

pub use error::{PropensityError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PropensityError, Result};

    pub use crate::preprocessing::{FeatureSchema, FeatureSelector, OneHotEncoder, StandardScaler};

    pub use crate::training::{
        ClassWeight, CrossValidator, LogisticRegression, Pipeline, Trainer, TrainingConfig,
        TrainingReport,
    };

    pub use crate::export::{ModelArtifact, ModelMetadata, ModelRegistry};

    pub use crate::scoring::{ScoringConfig, ScoringService};

    pub use crate::tracking::{ExperimentConfig, ExperimentTracker, RunStatus};

    pub use crate::automl::{get_data, AutoMlData};
}
