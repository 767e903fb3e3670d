//! Experiment Tracker Implementation
//!
//! An experiment groups runs; a run collects params, metrics and artifact
//! paths until it is ended, at which point it is appended to its experiment
//! and the store is written.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::{LocalStorage, StorageBackend};
use crate::error::{PropensityError, Result};

/// Configuration for experiment tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Directory of the experiment store
    pub output_dir: PathBuf,
    /// Experiment used when a run starts without one
    pub experiment_name: String,
    /// Keep every logged value, not just the latest
    pub enable_metrics_history: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("mlruns"),
            experiment_name: "default".to_string(),
            enable_metrics_history: true,
        }
    }
}

impl ExperimentConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }
}

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, step: u64) -> Self {
        Self {
            name: name.into(),
            value,
            step,
            timestamp: Utc::now(),
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

/// A run within an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    /// None while running
    pub end_time: Option<DateTime<Utc>>,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
    pub artifacts: Vec<String>,
    pub status: RunStatus,
}

impl Run {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            run_name: run_name.into(),
            start_time: Utc::now(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Run duration in seconds
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// An experiment containing multiple runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub runs: Vec<Run>,
    pub tags: BTreeMap<String, String>,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment_id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            runs: Vec::new(),
            tags: BTreeMap::new(),
        }
    }
}

/// Experiment tracker
pub struct ExperimentTracker {
    config: ExperimentConfig,
    storage: Box<dyn StorageBackend + Send + Sync>,
    experiments: RwLock<Vec<Experiment>>,
    current_experiment: RwLock<Option<String>>,
    current_run: RwLock<Option<Run>>,
}

impl ExperimentTracker {
    /// Open the local store under `config.output_dir`, loading past experiments
    pub fn open(config: ExperimentConfig) -> Result<Self> {
        let storage = LocalStorage::new(config.output_dir.clone());
        Self::with_storage(config, Box::new(storage))
    }

    /// Use a custom storage backend
    pub fn with_storage(
        config: ExperimentConfig,
        storage: Box<dyn StorageBackend + Send + Sync>,
    ) -> Result<Self> {
        let experiments = storage.load_experiments()?;
        Ok(Self {
            config,
            storage,
            experiments: RwLock::new(experiments),
            current_experiment: RwLock::new(None),
            current_run: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Select an experiment by name, creating it if needed; returns its id
    pub fn create_experiment(&self, name: impl Into<String>) -> String {
        let name = name.into();
        let mut experiments = self.experiments.write();

        let experiment_id = match experiments.iter().find(|e| e.name == name) {
            Some(existing) => existing.experiment_id.clone(),
            None => {
                let experiment = Experiment::new(&name);
                let id = experiment.experiment_id.clone();
                experiments.push(experiment);
                id
            }
        };

        *self.current_experiment.write() = Some(experiment_id.clone());
        experiment_id
    }

    /// Start a new run; an active run is an error
    pub fn start_run(&self, run_name: impl Into<String>) -> Result<String> {
        if self.current_experiment.read().is_none() {
            self.create_experiment(self.config.experiment_name.clone());
        }

        let mut current = self.current_run.write();
        if let Some(active) = current.as_ref() {
            return Err(PropensityError::ValidationError(format!(
                "Run {} is still active",
                active.run_id
            )));
        }

        let run = Run::new(run_name);
        let run_id = run.run_id.clone();
        tracing::info!(run_id = %run_id, run_name = %run.run_name, "Started tracking run");
        *current = Some(run);
        Ok(run_id)
    }

    fn with_run<F: FnOnce(&mut Run)>(&self, f: F) -> Result<()> {
        let mut current = self.current_run.write();
        let run = current
            .as_mut()
            .ok_or_else(|| PropensityError::ValidationError("No active run".to_string()))?;
        f(run);
        Ok(())
    }

    /// Log a parameter
    pub fn log_param(&self, key: impl Into<String>, value: impl ToString) -> Result<()> {
        let key = key.into();
        let value = value.to_string();
        self.with_run(|r| {
            r.params.insert(key, value);
        })
    }

    /// Log a metric
    pub fn log_metric(&self, name: impl Into<String>, value: f64, step: Option<u64>) -> Result<()> {
        let name = name.into();
        let history = self.config.enable_metrics_history;
        tracing::debug!(metric = %name, value, "Logged metric");
        self.with_run(|r| {
            r.metrics.insert(name.clone(), value);
            if history {
                r.metrics_history.push(Metric::new(name, value, step.unwrap_or(0)));
            }
        })
    }

    /// `log(key, value)` on the active run
    pub fn log(&self, key: impl Into<String>, value: f64) -> Result<()> {
        self.log_metric(key, value, None)
    }

    /// Log a tag
    pub fn log_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        self.with_run(|r| {
            r.tags.insert(key, value);
        })
    }

    /// Log an artifact path
    pub fn log_artifact(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.with_run(|r| r.artifacts.push(path))
    }

    /// End the active run, attach it to its experiment and persist the store
    pub fn end_run(&self, status: RunStatus) -> Result<Run> {
        let mut run = self
            .current_run
            .write()
            .take()
            .ok_or_else(|| PropensityError::ValidationError("No active run".to_string()))?;
        run.end_time = Some(Utc::now());
        run.status = status;

        let experiment_id = self
            .current_experiment
            .read()
            .clone()
            .ok_or_else(|| PropensityError::ValidationError("No active experiment".to_string()))?;

        {
            let mut experiments = self.experiments.write();
            let experiment = experiments
                .iter_mut()
                .find(|e| e.experiment_id == experiment_id)
                .ok_or_else(|| {
                    PropensityError::ValidationError(format!("Unknown experiment {}", experiment_id))
                })?;
            experiment.runs.push(run.clone());
        }

        tracing::info!(
            run_id = %run.run_id,
            status = ?status,
            duration_secs = run.duration_secs(),
            "Ended tracking run"
        );
        self.save()?;
        Ok(run)
    }

    pub fn list_experiments(&self) -> Vec<Experiment> {
        self.experiments.read().clone()
    }

    /// Write all experiments to storage
    pub fn save(&self) -> Result<()> {
        let experiments = self.experiments.read();
        self.storage.save_experiments(&experiments)
    }
}
