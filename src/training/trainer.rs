//! End-to-end training run
//!
//! Load the dataset, select and encode features, cross-validate the
//! scaler + logistic regression pipeline, report to the experiment tracker,
//! refit on every row and persist the artifact.

use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

use super::config::TrainingConfig;
use super::cross_validation::{CVResults, CrossValidator};
use super::linear_models::{ClassWeight, LogisticRegression};
use super::metrics::ClassificationMetrics;
use super::pipeline::Pipeline;
use crate::error::{PropensityError, Result};
use crate::export::{ModelArtifact, ModelMetadata, ModelRegistry, RegistryEntry};
use crate::preprocessing::{FeatureSelector, OneHotEncoder};
use crate::scoring::DEFAULT_MODEL_NAME;
use crate::tracking::{ExperimentConfig, ExperimentTracker, RunStatus};
use crate::utils::DataLoader;

/// Metric names reported to the tracker
pub const METRIC_C: &str = "C";
pub const METRIC_CV_ACCURACY: &str = "CV Accuracy";
pub const METRIC_CV_RECALL: &str = "CV Recall";

/// Per-fold and mean cross-validation scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub accuracy: CVResults,
    pub recall: CVResults,
}

/// Fitted encoder + pipeline with their cross-validation scores
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub encoder: OneHotEncoder,
    pub pipeline: Pipeline,
    pub cv: CrossValidationReport,
    pub n_samples: usize,
}

/// Outcome of a full training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub c: f64,
    pub cv_accuracy: f64,
    pub cv_recall: f64,
    pub cv: CrossValidationReport,
    pub artifact_path: PathBuf,
    pub n_samples: usize,
    /// Width of the encoded feature matrix
    pub n_features: usize,
    pub iterations: usize,
    pub converged: bool,
    pub run_id: String,
    pub registered: Option<RegistryEntry>,
    pub duration_secs: f64,
}

/// Trains the propensity model
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    selector: FeatureSelector,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            selector: FeatureSelector::banking(),
        }
    }

    /// Use a different feature selection
    pub fn with_selector(mut self, selector: FeatureSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn classifier(&self) -> LogisticRegression {
        LogisticRegression::new()
            .with_c(self.config.c)
            .with_max_iter(self.config.max_iter)
            .with_tol(self.config.tol)
            .with_class_weight(ClassWeight::Balanced)
    }

    fn cross_validator(&self) -> CrossValidator {
        let cv = CrossValidator::new(self.config.cv_folds);
        match self.config.seed {
            Some(seed) => cv.with_shuffle(true).with_random_state(seed),
            None => cv,
        }
    }

    /// Read `{data_folder}/datasets/{filename}`
    pub fn load_dataset(&self) -> Result<DataFrame> {
        let path = DataLoader::training_path(&self.config.data_folder, &self.config.filename);
        DataLoader::new().load_csv(&path)
    }

    /// Evaluate a fresh pipeline on every fold, folds in parallel
    pub fn cross_validate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<CrossValidationReport> {
        if y.len() != x.nrows() {
            return Err(PropensityError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        let splits = self.cross_validator().split(y)?;

        let fold_metrics: Vec<Option<ClassificationMetrics>> = splits
            .par_iter()
            .map(|split| {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_test = x.select(Axis(0), &split.test_indices);
                let y_test = y.select(Axis(0), &split.test_indices);

                // A fold that cannot be fitted scores NaN instead of failing the run
                let mut pipeline = Pipeline::new(self.classifier());
                if let Err(e) = pipeline.fit(&x_train, &y_train) {
                    tracing::warn!(fold = split.fold_idx, error = %e, "Fold fit failed; scored as NaN");
                    return Ok(None);
                }
                let y_pred = pipeline.predict(&x_test)?;
                let metrics = ClassificationMetrics::compute(&y_test, &y_pred)?;

                tracing::debug!(
                    fold = split.fold_idx,
                    accuracy = metrics.accuracy,
                    recall = metrics.recall,
                    "Evaluated fold"
                );
                Ok(Some(metrics))
            })
            .collect::<Result<_>>()?;

        if fold_metrics.iter().all(Option::is_none) {
            return Err(PropensityError::TrainingError(
                "No cross-validation fold could be fitted".to_string(),
            ));
        }

        let scores = |metric: fn(&ClassificationMetrics) -> f64| -> Vec<f64> {
            fold_metrics
                .iter()
                .map(|m| m.as_ref().map_or(f64::NAN, metric))
                .collect()
        };

        Ok(CrossValidationReport {
            accuracy: CVResults::from_scores(scores(|m| m.accuracy)),
            recall: CVResults::from_scores(scores(|m| m.recall)),
        })
    }

    /// Select, encode, cross-validate and refit on an in-memory dataset
    pub fn fit_frame(&self, df: &DataFrame) -> Result<TrainedModel> {
        self.config.validate()?;

        let (features, y) = self.selector.select(df)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&features)?;
        let x = encoder.transform_to_array(&features)?;

        tracing::info!(
            rows = x.nrows(),
            encoded_features = x.ncols(),
            positives = y.iter().filter(|&&v| v == 1.0).count(),
            "Encoded training data"
        );

        let cv = self.cross_validate(&x, &y)?;
        tracing::info!(
            folds = cv.accuracy.n_folds,
            cv_accuracy = cv.accuracy.mean_score,
            cv_recall = cv.recall.mean_score,
            "Cross-validation finished"
        );

        let mut pipeline = Pipeline::new(self.classifier());
        pipeline.fit(&x, &y)?;

        Ok(TrainedModel {
            encoder,
            pipeline,
            cv,
            n_samples: x.nrows(),
        })
    }

    fn model_name(&self) -> String {
        self.config
            .register_as
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string())
    }

    /// Package a fitted model with its metadata and CV scores
    pub fn build_artifact(&self, trained: &TrainedModel) -> Result<ModelArtifact> {
        let metadata = ModelMetadata::new(self.model_name())
            .with_features(self.selector.feature_columns().to_vec())
            .with_target(self.selector.label_column())
            .add_hyperparameter("C", self.config.c)
            .add_hyperparameter("max_iter", self.config.max_iter)
            .add_hyperparameter("tol", self.config.tol)
            .add_hyperparameter("solver", "lbfgs")
            .add_hyperparameter("class_weight", "balanced")
            .add_hyperparameter("cv_folds", self.config.cv_folds)
            .add_metric(METRIC_CV_ACCURACY, trained.cv.accuracy.mean_score)
            .add_metric(METRIC_CV_RECALL, trained.cv.recall.mean_score);

        ModelArtifact::new(metadata, trained.encoder.clone(), trained.pipeline.clone())
    }

    /// Full run: load, train, track, save and optionally register
    pub fn run(&self) -> Result<TrainingReport> {
        self.config.validate()?;
        let start = Instant::now();

        let tracker = ExperimentTracker::open(
            ExperimentConfig::default()
                .with_output_dir(&self.config.tracking_dir)
                .with_experiment_name(&self.config.experiment_name),
        )?;
        tracker.create_experiment(&self.config.experiment_name);
        let run_id = tracker.start_run(format!("train-C{}", self.config.c))?;

        match self.run_tracked(&tracker, &run_id, start) {
            Ok(report) => {
                tracker.end_run(RunStatus::Finished)?;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Training failed");
                if let Err(end_err) = tracker.end_run(RunStatus::Failed) {
                    tracing::warn!(error = %end_err, "Could not record failed run");
                }
                Err(e)
            }
        }
    }

    fn run_tracked(&self, tracker: &ExperimentTracker, run_id: &str, start: Instant) -> Result<TrainingReport> {
        let df = self.load_dataset()?;
        let trained = self.fit_frame(&df)?;
        let cv_accuracy = trained.cv.accuracy.mean_score;
        let cv_recall = trained.cv.recall.mean_score;
        let n_features = trained.pipeline.n_features();

        tracker.log(METRIC_C, self.config.c)?;
        tracker.log(METRIC_CV_ACCURACY, cv_accuracy)?;
        tracker.log(METRIC_CV_RECALL, cv_recall)?;
        tracker.log_param("max_iter", self.config.max_iter)?;
        tracker.log_param("cv_folds", self.config.cv_folds)?;
        tracker.log_param("n_samples", trained.n_samples)?;
        tracker.log_param("n_features", n_features)?;
        tracker.log_tag("data_file", self.config.filename.clone())?;

        let classifier = trained.pipeline.classifier();
        let iterations = classifier.n_iter;
        let converged = classifier.converged;

        tracker.log_tag("model_name", self.model_name())?;
        let artifact = self.build_artifact(&trained)?;
        artifact.save(&self.config.output_path)?;
        tracker.log_artifact(self.config.output_path.display().to_string())?;

        let registered = match &self.config.register_as {
            Some(name) => {
                let mut registry = ModelRegistry::open(&self.config.registry_dir)?;
                Some(registry.register(name, &self.config.output_path)?)
            }
            None => None,
        };

        Ok(TrainingReport {
            c: self.config.c,
            cv_accuracy,
            cv_recall,
            cv: trained.cv,
            artifact_path: self.config.output_path.clone(),
            n_samples: trained.n_samples,
            n_features,
            iterations,
            converged,
            run_id: run_id.to_string(),
            registered,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}
