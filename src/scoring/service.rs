//! Scoring service
//!
//! `init` resolves the configured model through the registry and loads it;
//! `run` turns a JSON payload into a JSON array of 0.0/1.0 predictions. Errors
//! stay typed inside the service and are only turned into text by `run`.

use ndarray::Array2;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use super::config::ScoringConfig;
use crate::error::{PropensityError, Result};
use crate::export::{ModelArtifact, ModelRegistry};
use crate::preprocessing::{ColumnKind, FeatureSchema};

/// Loads a registered model once and answers prediction requests
pub struct ScoringService {
    config: ScoringConfig,
    model: RwLock<Option<Arc<ModelArtifact>>>,
}

impl ScoringService {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            model: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Load the model; failures are logged and leave the service unready
    pub fn init(&self) {
        if let Err(e) = self.try_init() {
            tracing::error!(model = %self.config.model_name, error = %e, "Exception during init");
        }
    }

    /// Load the model, returning any failure
    pub fn try_init(&self) -> Result<()> {
        let registry = ModelRegistry::open(&self.config.registry_dir)?;
        let path = match self.config.version {
            Some(version) => registry.get_model_path_version(&self.config.model_name, version)?,
            None => registry.get_model_path(&self.config.model_name)?,
        };
        self.load_path(&path)
    }

    /// Load an artifact file directly, bypassing the registry
    pub fn load_path(&self, path: &Path) -> Result<()> {
        let artifact = ModelArtifact::load(path)?;
        tracing::info!(
            model = %self.config.model_name,
            path = %path.display(),
            features = artifact.n_features(),
            "Scoring model loaded"
        );
        *self.model.write() = Some(Arc::new(artifact));
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.model.read().is_some()
    }

    fn model(&self) -> Result<Arc<ModelArtifact>> {
        self.model
            .read()
            .as_ref()
            .cloned()
            .ok_or(PropensityError::ModelNotInitialized)
    }

    /// Predict 0.0/1.0 labels for a JSON payload
    pub fn predict_json(&self, payload: &str) -> Result<Vec<f64>> {
        let model = self.model()?;
        let value: Value = serde_json::from_str(payload)?;
        let x = parse_payload(&value, &model.schema)?;
        let predictions = model.predict_matrix(&x)?;
        Ok(predictions.iter().map(|&p| if p > 0.5 { 1.0 } else { 0.0 }).collect())
    }

    /// Predict and render the result as JSON; errors come back as their message
    pub fn run(&self, payload: &str) -> String {
        match self.predict_json(payload).and_then(|p| Ok(serde_json::to_string(&p)?)) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Scoring request failed");
                e.to_string()
            }
        }
    }
}

/// Build the encoded matrix from any accepted payload shape
fn parse_payload(value: &Value, schema: &FeatureSchema) -> Result<Array2<f64>> {
    let items = value.as_array().ok_or_else(|| {
        PropensityError::InvalidInput("Payload must be a JSON array".to_string())
    })?;
    if items.is_empty() {
        return Err(PropensityError::InvalidInput("Payload contains no rows".to_string()));
    }

    let width = schema.len();
    let rows: Vec<Vec<f64>> = if items.iter().all(Value::is_number) {
        vec![numeric_row(items, width, 0)?]
    } else if items.iter().all(Value::is_array) {
        items
            .iter()
            .enumerate()
            .map(|(i, row)| numeric_row(row.as_array().map(Vec::as_slice).unwrap_or_default(), width, i))
            .collect::<Result<_>>()?
    } else if items.iter().all(Value::is_object) {
        items
            .iter()
            .enumerate()
            .map(|(i, row)| match row.as_object() {
                Some(obj) => object_row(obj, schema, i),
                None => Err(PropensityError::InvalidInput(format!("Row {} is not an object", i))),
            })
            .collect::<Result<_>>()?
    } else {
        return Err(PropensityError::InvalidInput(
            "Payload rows must all be arrays of numbers or all be objects".to_string(),
        ));
    };

    let n_rows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, width), flat)?)
}

fn as_finite(value: &Value, row: usize, what: &str) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(PropensityError::InvalidInput(format!(
            "Row {}: {} must be a finite number, got {}",
            row, what, value
        ))),
    }
}

fn numeric_row(values: &[Value], width: usize, row: usize) -> Result<Vec<f64>> {
    if values.len() != width {
        return Err(PropensityError::ShapeError {
            expected: format!("{} features", width),
            actual: format!("{} features in row {}", values.len(), row),
        });
    }
    values
        .iter()
        .enumerate()
        .map(|(j, v)| as_finite(v, row, &format!("feature {}", j)))
        .collect()
}

/// Align a keyed row against the schema; absent indicators mean "not this category"
fn object_row(obj: &Map<String, Value>, schema: &FeatureSchema, row: usize) -> Result<Vec<f64>> {
    if let Some(unknown) = obj.keys().find(|k| schema.position(k).is_none()) {
        return Err(PropensityError::FeatureNotFound(format!(
            "{} (row {} is not part of the model schema)",
            unknown, row
        )));
    }

    schema
        .columns()
        .iter()
        .map(|column| match (obj.get(&column.name), &column.kind) {
            (Some(v), _) => as_finite(v, row, &column.name),
            (None, ColumnKind::Indicator { .. }) => Ok(0.0),
            (None, ColumnKind::Numeric) => Err(PropensityError::InvalidInput(format!(
                "Row {}: missing numeric feature '{}'",
                row, column.name
            ))),
        })
        .collect()
}
