//! Experiment Tracking Module
//!
//! Local, file-backed record of training runs: parameters, metrics and
//! artifact paths grouped by experiment.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend, EXPERIMENTS_FILE};
pub use tracker::{Experiment, ExperimentConfig, ExperimentTracker, Metric, Run, RunStatus};
