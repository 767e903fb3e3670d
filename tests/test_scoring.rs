//! Integration test: registered model scored through the service

mod common;

use common::{banking_frame, write_training_csv, TRAINING_FILE};
use ndarray::Array2;
use propensity::export::ModelArtifact;
use propensity::preprocessing::{ColumnKind, FeatureSelector};
use propensity::scoring::{ScoringConfig, ScoringService, DEFAULT_MODEL_NAME};
use propensity::training::{Trainer, TrainingConfig, TrainingReport};
use propensity::PropensityError;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn train_and_register(dir: &TempDir) -> TrainingReport {
    write_training_csv(dir.path(), &banking_frame(80));
    let config = TrainingConfig::new(dir.path(), TRAINING_FILE, 1.0)
        .with_cv_folds(5)
        .with_output_path(dir.path().join("outputs").join("model.bin"))
        .with_tracking_dir(dir.path().join("mlruns"))
        .with_registration(DEFAULT_MODEL_NAME, dir.path().join("models"));
    Trainer::new(config).run().unwrap()
}

fn service(dir: &TempDir) -> ScoringService {
    ScoringService::new(ScoringConfig::default().with_registry_dir(dir.path().join("models")))
}

/// Encoded rows for the first `n` training records
fn encoded_rows(artifact: &ModelArtifact, n: usize) -> Array2<f64> {
    let features = FeatureSelector::banking()
        .select_features(&banking_frame(80))
        .unwrap()
        .head(Some(n));
    artifact.encoder.transform_to_array(&features).unwrap()
}

fn to_json_rows(x: &Array2<f64>) -> String {
    let rows: Vec<Vec<f64>> = x.outer_iter().map(|r| r.to_vec()).collect();
    serde_json::to_string(&rows).unwrap()
}

#[test]
fn test_init_and_score_positional_rows() {
    let dir = TempDir::new().unwrap();
    let report = train_and_register(&dir);

    let service = service(&dir);
    service.try_init().unwrap();
    assert!(service.is_ready());

    let artifact = ModelArtifact::load(&report.artifact_path).unwrap();
    let x = encoded_rows(&artifact, 6);
    let expected = artifact.predict_matrix(&x).unwrap().to_vec();

    let out = service.run(&to_json_rows(&x));
    let parsed: Vec<f64> = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.len(), 6);
    assert_eq!(parsed, expected);
}

#[test]
fn test_labels_rendered_as_floats() {
    let dir = TempDir::new().unwrap();
    let report = train_and_register(&dir);
    let artifact = ModelArtifact::load(&report.artifact_path).unwrap();
    // First two fixture rows are a buyer and a non-buyer
    let x = encoded_rows(&artifact, 2);

    let service = service(&dir);
    service.try_init().unwrap();
    let out = service.run(&to_json_rows(&x));

    let labels = artifact.predict_matrix(&x).unwrap();
    let rendered: Vec<String> = labels.iter().map(|&p| format!("{:.1}", p)).collect();
    assert_eq!(out, format!("[{}]", rendered.join(",")));
    assert!(!out.contains("[0,") && !out.contains("[1,"), "{}", out);
}

#[test]
fn test_object_payload_matches_positional() {
    let dir = TempDir::new().unwrap();
    let report = train_and_register(&dir);
    let artifact = ModelArtifact::load(&report.artifact_path).unwrap();
    let x = encoded_rows(&artifact, 4);
    let columns = artifact.schema.columns().to_vec();

    // Keyed rows leave out indicators that are off
    let objects: Vec<Value> = x
        .outer_iter()
        .map(|row| {
            let map: Map<String, Value> = columns
                .iter()
                .zip(row.iter())
                .filter(|(c, v)| matches!(c.kind, ColumnKind::Numeric) || **v != 0.0)
                .map(|(c, &v)| (c.name.clone(), json!(v)))
                .collect();
            Value::Object(map)
        })
        .collect();

    let service = ScoringService::new(ScoringConfig::default());
    service.load_path(&report.artifact_path).unwrap();
    assert!(service.is_ready());
    let positional = service.run(&to_json_rows(&x));
    let keyed = service.run(&Value::Array(objects).to_string());
    assert!(positional.starts_with('['), "{}", positional);
    assert_eq!(positional, keyed);
}

#[test]
fn test_pinned_version() {
    let dir = TempDir::new().unwrap();
    train_and_register(&dir);

    let pinned = ScoringService::new(
        ScoringConfig::default()
            .with_registry_dir(dir.path().join("models"))
            .with_version(1),
    );
    assert!(pinned.try_init().is_ok());

    let missing = ScoringService::new(
        ScoringConfig::default()
            .with_registry_dir(dir.path().join("models"))
            .with_version(7),
    );
    assert!(missing.try_init().is_err());
    assert!(!missing.is_ready());
}

#[test]
fn test_errors_are_returned_as_text() {
    let dir = TempDir::new().unwrap();
    train_and_register(&dir);
    let service = service(&dir);
    service.init();
    assert!(service.is_ready());

    let out = service.run("not json");
    assert!(serde_json::from_str::<Vec<f64>>(&out).is_err());
    assert!(!out.is_empty());

    let out = service.run(r#"[{"salary": 1000}]"#);
    assert!(out.contains("salary"), "{}", out);

    let out = service.run("[[1.0, 2.0]]");
    assert!(serde_json::from_str::<Vec<f64>>(&out).is_err(), "{}", out);
}

#[test]
fn test_uninitialized_service() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.init();
    assert!(!service.is_ready());
    assert!(matches!(
        service.predict_json("[[1.0]]"),
        Err(PropensityError::ModelNotInitialized)
    ));
}
