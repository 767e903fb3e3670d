//! Model training module
//!
//! - L2-regularized logistic regression fitted with L-BFGS
//! - Stratified k-fold cross-validation
//! - Scaler + classifier pipeline
//! - The end-to-end [`Trainer`]

mod config;
pub mod cross_validation;
pub mod linear_models;
pub mod metrics;
pub mod pipeline;
pub mod solver;
pub mod trainer;

pub use config::TrainingConfig;
pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use linear_models::{ClassWeight, LogisticRegression};
pub use metrics::{ClassificationMetrics, ConfusionCounts};
pub use pipeline::Pipeline;
pub use solver::{Lbfgs, LbfgsConfig, LbfgsResult, Objective};
pub use trainer::{CrossValidationReport, TrainedModel, Trainer, TrainingReport};
