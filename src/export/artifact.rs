//! Model artifact serialization
//!
//! The fitted encoder, its feature schema and the scaler + classifier
//! pipeline are stored together so scoring can rebuild the exact training
//! transformation. On disk the payload is bincode inside an envelope with
//! magic bytes, a format version and an FNV-1a checksum.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{PropensityError, Result};
use crate::preprocessing::{FeatureSchema, OneHotEncoder};
use crate::training::Pipeline;

/// Descriptive metadata stored with the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,
    /// Training timestamp
    pub trained_at: DateTime<Utc>,
    /// Raw input columns, in selection order
    pub feature_columns: Vec<String>,
    /// Target name
    pub target_name: String,
    /// Model type
    pub model_type: String,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Training metrics
    pub metrics: BTreeMap<String, f64>,
    /// Version of the crate that wrote the artifact
    pub crate_version: String,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "model".to_string(),
            trained_at: Utc::now(),
            feature_columns: Vec::new(),
            target_name: "y".to_string(),
            model_type: "logistic_regression".to_string(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_columns = features;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = target.into();
        self
    }

    pub fn add_hyperparameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.hyperparameters.insert(key.into(), value.to_string());
        self
    }

    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// Everything scoring needs to reproduce training-time predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub schema: FeatureSchema,
    pub encoder: OneHotEncoder,
    pub pipeline: Pipeline,
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    payload: Vec<u8>,
    checksum: u64,
}

impl ModelArtifact {
    /// Magic bytes for artifact files
    pub const MAGIC: [u8; 4] = *b"PTBM";
    /// Current format version
    pub const FORMAT_VERSION: u32 = 1;

    /// Bundle a fitted encoder and pipeline
    pub fn new(metadata: ModelMetadata, encoder: OneHotEncoder, pipeline: Pipeline) -> Result<Self> {
        let schema = encoder.schema()?.clone();
        if !pipeline.is_fitted() {
            return Err(PropensityError::ModelNotFitted);
        }
        if schema.len() != pipeline.n_features() {
            return Err(PropensityError::ShapeError {
                expected: format!("{} encoded features", schema.len()),
                actual: format!("{} pipeline inputs", pipeline.n_features()),
            });
        }
        Ok(Self {
            metadata,
            schema,
            encoder,
            pipeline,
        })
    }

    /// Width of the encoded feature matrix
    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    /// Predict 0/1 for an already encoded matrix in schema order
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.pipeline.predict(x)
    }

    /// Encode raw feature rows with the persisted encoder, then predict
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.encoder.transform_to_array(df)?;
        self.pipeline.predict(&x)
    }

    /// Probability of class 1 for raw feature rows
    pub fn predict_proba_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.encoder.transform_to_array(df)?;
        self.pipeline.predict_proba(&x)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let envelope = Envelope {
            magic: Self::MAGIC,
            format_version: Self::FORMAT_VERSION,
            checksum: fnv1a(&payload),
            payload,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = bincode::deserialize(bytes).map_err(|e| {
            PropensityError::SerializationError(format!("Not a model artifact: {}", e))
        })?;

        if envelope.magic != Self::MAGIC {
            return Err(PropensityError::SerializationError(
                "Not a model artifact: bad magic bytes".to_string(),
            ));
        }
        if envelope.format_version != Self::FORMAT_VERSION {
            return Err(PropensityError::SerializationError(format!(
                "Unsupported artifact format version {}",
                envelope.format_version
            )));
        }
        if fnv1a(&envelope.payload) != envelope.checksum {
            return Err(PropensityError::SerializationError(
                "Artifact checksum mismatch".to_string(),
            ));
        }

        Ok(bincode::deserialize(&envelope.payload)?)
    }

    /// Write to `path` through a temporary sibling, creating parent dirs
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = self.to_bytes()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved model artifact");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            PropensityError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read artifact {}: {}", path.display(), e),
            ))
        })?;
        let artifact = Self::from_bytes(&bytes)?;
        tracing::debug!(path = %path.display(), features = artifact.n_features(), "Loaded model artifact");
        Ok(artifact)
    }
}

/// FNV-1a 64-bit hash
fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
