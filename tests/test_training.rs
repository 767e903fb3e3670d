//! Integration test: Training pipeline end-to-end

mod common;

use common::{banking_frame, write_training_csv, TRAINING_FILE};
use propensity::export::{ModelArtifact, ModelRegistry};
use propensity::preprocessing::FeatureSelector;
use propensity::scoring::{ScoringConfig, ScoringService};
use propensity::tracking::{ExperimentConfig, ExperimentTracker, RunStatus};
use propensity::training::{Trainer, TrainingConfig};
use propensity::PropensityError;
use tempfile::TempDir;

fn config(dir: &TempDir) -> TrainingConfig {
    TrainingConfig::new(dir.path(), TRAINING_FILE, 1.0)
        .with_output_path(dir.path().join("outputs").join("model.bin"))
        .with_tracking_dir(dir.path().join("mlruns"))
        .with_experiment_name("propensity")
}

#[test]
fn test_end_to_end_training() {
    let dir = TempDir::new().unwrap();
    let df = banking_frame(100);
    write_training_csv(dir.path(), &df);

    let report = Trainer::new(config(&dir)).run().unwrap();

    assert_eq!(report.c, 1.0);
    assert_eq!(report.n_samples, 100);
    assert_eq!(report.cv.accuracy.n_folds, 10);
    assert!(report.cv_accuracy > 0.5, "CV accuracy {}", report.cv_accuracy);
    assert!((0.0..=1.0).contains(&report.cv_accuracy));
    assert!((0.0..=1.0).contains(&report.cv_recall));
    assert!(report.artifact_path.exists());
    assert!(report.registered.is_none());

    // Every training row scored through the service matches the saved model
    let artifact = ModelArtifact::load(&report.artifact_path).unwrap();
    assert_eq!(artifact.n_features(), report.n_features);

    let loaded = Trainer::new(config(&dir)).load_dataset().unwrap();
    assert_eq!(loaded.height(), df.height());
    let features = FeatureSelector::banking().select_features(&loaded).unwrap();
    let x = artifact.encoder.transform_to_array(&features).unwrap();
    let rows: Vec<Vec<f64>> = x.outer_iter().map(|r| r.to_vec()).collect();

    let service = ScoringService::new(ScoringConfig::default());
    service.load_path(&report.artifact_path).unwrap();
    let out = service.run(&serde_json::to_string(&rows).unwrap());
    let scored: Vec<f64> = serde_json::from_str(&out).unwrap();
    assert_eq!(scored.len(), 100);
    assert_eq!(scored, artifact.predict_frame(&features).unwrap().to_vec());
}

#[test]
fn test_saved_artifact_reproduces_refit_model() {
    let dir = TempDir::new().unwrap();
    write_training_csv(dir.path(), &banking_frame(100));

    let trainer = Trainer::new(config(&dir));
    let df = trainer.load_dataset().unwrap();
    let trained = trainer.fit_frame(&df).unwrap();

    let path = dir.path().join("outputs").join("refit.bin");
    trainer.build_artifact(&trained).unwrap().save(&path).unwrap();
    let artifact = ModelArtifact::load(&path).unwrap();

    let features = FeatureSelector::banking().select_features(&df).unwrap();
    let x = trained.encoder.transform_to_array(&features).unwrap();
    assert_eq!(
        artifact.predict_frame(&features).unwrap(),
        trained.pipeline.predict(&x).unwrap()
    );
    assert_eq!(
        artifact.pipeline.classifier().coefficients,
        trained.pipeline.classifier().coefficients
    );
    assert_eq!(artifact.metadata.metrics["CV Accuracy"], trained.cv.accuracy.mean_score);
}

#[test]
fn test_metrics_reported_to_tracker() {
    let dir = TempDir::new().unwrap();
    write_training_csv(dir.path(), &banking_frame(60));

    let report = Trainer::new(config(&dir).with_cv_folds(5)).run().unwrap();

    let tracker = ExperimentTracker::open(
        ExperimentConfig::default().with_output_dir(dir.path().join("mlruns")),
    )
    .unwrap();
    let experiments = tracker.list_experiments();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].name, "propensity");

    let run = &experiments[0].runs[0];
    assert_eq!(run.run_id, report.run_id);
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.metrics.get("C"), Some(&1.0));
    assert!((run.metrics["CV Accuracy"] - report.cv_accuracy).abs() < 1e-12);
    assert!((run.metrics["CV Recall"] - report.cv_recall).abs() < 1e-12);
    assert_eq!(run.params.get("cv_folds").map(String::as_str), Some("5"));
    assert_eq!(run.artifacts.len(), 1);
    assert_eq!(run.tags.get("data_file").map(String::as_str), Some(TRAINING_FILE));
    assert_eq!(
        run.tags.get("model_name").map(String::as_str),
        Some("propensity_to_buy_predictor")
    );
}

#[test]
fn test_failed_run_is_recorded() {
    let dir = TempDir::new().unwrap();

    let result = Trainer::new(config(&dir)).run();
    assert!(matches!(result, Err(PropensityError::DataError(_))));

    let tracker = ExperimentTracker::open(
        ExperimentConfig::default().with_output_dir(dir.path().join("mlruns")),
    )
    .unwrap();
    let experiments = tracker.list_experiments();
    assert_eq!(experiments[0].runs.len(), 1);
    assert_eq!(experiments[0].runs[0].status, RunStatus::Failed);
    assert!(!dir.path().join("outputs").join("model.bin").exists());
}

#[test]
fn test_missing_feature_column() {
    let dir = TempDir::new().unwrap();
    let df = banking_frame(40).drop("euribor3m").unwrap();
    write_training_csv(dir.path(), &df);

    let err = Trainer::new(config(&dir)).run().unwrap_err();
    assert!(matches!(err, PropensityError::FeatureNotFound(ref c) if c == "euribor3m"));
}

#[test]
fn test_invalid_c() {
    let dir = TempDir::new().unwrap();
    write_training_csv(dir.path(), &banking_frame(40));

    let mut cfg = config(&dir);
    cfg.c = -1.0;
    assert!(matches!(
        Trainer::new(cfg).run(),
        Err(PropensityError::InvalidParameter { .. })
    ));
}

#[test]
fn test_registration_versions() {
    let dir = TempDir::new().unwrap();
    write_training_csv(dir.path(), &banking_frame(50));
    let registry_dir = dir.path().join("models");

    let cfg = config(&dir)
        .with_cv_folds(5)
        .with_registration("propensity_to_buy_predictor", &registry_dir);
    let first = Trainer::new(cfg.clone()).run().unwrap();
    let second = Trainer::new(cfg.with_seed(3)).run().unwrap();

    assert_eq!(first.registered.as_ref().map(|e| e.version), Some(1));
    assert_eq!(second.registered.as_ref().map(|e| e.version), Some(2));

    let registry = ModelRegistry::open(&registry_dir).unwrap();
    assert_eq!(registry.list_models(), vec!["propensity_to_buy_predictor".to_string()]);
    assert_eq!(registry.list_versions("propensity_to_buy_predictor"), vec![1, 2]);

    let latest = registry.get_model_path("propensity_to_buy_predictor").unwrap();
    assert!(latest.ends_with("propensity_to_buy_predictor/v2.bin"));
    assert!(ModelArtifact::load(&latest).is_ok());

    let pinned = registry
        .get_model_path_version("propensity_to_buy_predictor", 1)
        .unwrap();
    assert!(pinned.ends_with("propensity_to_buy_predictor/v1.bin"));
}
