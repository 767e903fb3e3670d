//! Model registry
//!
//! Maps a model name to versioned artifact files under a root directory:
//! `{root}/{name}/v{n}.bin`, indexed by `{root}/index.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::artifact::ModelArtifact;
use crate::error::{PropensityError, Result};

const INDEX_FILE: &str = "index.json";

/// Registry entry (metadata only, without model data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    /// 1-based, incremented per registration
    pub version: u32,
    /// File path relative to registry root
    pub path: String,
    pub registered_at: DateTime<Utc>,
    /// Metrics copied from the artifact metadata
    pub metrics: BTreeMap<String, f64>,
}

/// Registry index
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RegistryIndex {
    models: BTreeMap<String, Vec<RegistryEntry>>,
}

/// Model registry for managing versioned artifacts
#[derive(Debug)]
pub struct ModelRegistry {
    root: PathBuf,
    index: RegistryIndex,
}

impl ModelRegistry {
    /// Create or open registry at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let file = File::open(&index_path)?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                PropensityError::SerializationError(format!("Failed to read registry index: {}", e))
            })?
        } else {
            RegistryIndex::default()
        };

        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn save_index(&self) -> Result<()> {
        let tmp = self.root.join(format!("{}.tmp", INDEX_FILE));
        {
            let file = File::create(&tmp)?;
            serde_json::to_writer_pretty(BufWriter::new(file), &self.index)?;
        }
        fs::rename(&tmp, self.root.join(INDEX_FILE))?;
        Ok(())
    }

    /// Copy a saved artifact into the registry as the next version of `name`
    pub fn register(&mut self, name: &str, artifact_path: impl AsRef<Path>) -> Result<RegistryEntry> {
        validate_name(name)?;
        let artifact_path = artifact_path.as_ref();

        // Refuse files that are not loadable artifacts
        let artifact = ModelArtifact::load(artifact_path)?;

        let version = self
            .index
            .models
            .get(name)
            .and_then(|entries| entries.iter().map(|e| e.version).max())
            .unwrap_or(0)
            + 1;

        let model_dir = self.root.join(name);
        fs::create_dir_all(&model_dir)?;

        let file_name = format!("v{}.bin", version);
        fs::copy(artifact_path, model_dir.join(&file_name))?;

        let entry = RegistryEntry {
            name: name.to_string(),
            version,
            path: format!("{}/{}", name, file_name),
            registered_at: Utc::now(),
            metrics: artifact.metadata.metrics.clone(),
        };

        self.index
            .models
            .entry(name.to_string())
            .or_default()
            .push(entry.clone());
        self.save_index()?;

        tracing::info!(model = name, version, path = %entry.path, "Registered model");
        Ok(entry)
    }

    /// Path of the latest version of `name`
    pub fn get_model_path(&self, name: &str) -> Result<PathBuf> {
        let latest = self
            .entries(name)?
            .iter()
            .max_by_key(|e| e.version)
            .ok_or_else(|| PropensityError::ModelNotFound(name.to_string()))?;
        Ok(self.root.join(&latest.path))
    }

    /// Path of a specific version of `name`
    pub fn get_model_path_version(&self, name: &str, version: u32) -> Result<PathBuf> {
        let entry = self
            .entries(name)?
            .iter()
            .find(|e| e.version == version)
            .ok_or_else(|| PropensityError::ModelNotFound(format!("{} v{}", name, version)))?;
        Ok(self.root.join(&entry.path))
    }

    fn entries(&self, name: &str) -> Result<&Vec<RegistryEntry>> {
        self.index
            .models
            .get(name)
            .ok_or_else(|| PropensityError::ModelNotFound(name.to_string()))
    }

    /// Registered model names, sorted
    pub fn list_models(&self) -> Vec<String> {
        self.index.models.keys().cloned().collect()
    }

    /// Versions of a model, ascending
    pub fn list_versions(&self, name: &str) -> Vec<u32> {
        let mut versions: Vec<u32> = self
            .index
            .models
            .get(name)
            .map(|entries| entries.iter().map(|e| e.version).collect())
            .unwrap_or_default();
        versions.sort_unstable();
        versions
    }
}

/// Names become directory names
fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && name != "."
        && name != "..";
    if ok {
        Ok(())
    } else {
        Err(PropensityError::InvalidParameter {
            name: "model name".to_string(),
            value: name.to_string(),
            reason: "use letters, digits, '_', '-' or '.'".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_model() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        assert!(matches!(
            registry.get_model_path("propensity_to_buy_predictor"),
            Err(PropensityError::ModelNotFound(_))
        ));
        assert!(registry.list_models().is_empty());
        assert!(registry.list_versions("x").is_empty());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "..", "a/b", "with space"] {
            assert!(validate_name(name).is_err(), "{}", name);
        }
        assert!(validate_name("propensity_to_buy_predictor").is_ok());
    }

    #[test]
    fn test_register_rejects_non_artifact() {
        let dir = TempDir::new().unwrap();
        let junk = dir.path().join("junk.bin");
        fs::write(&junk, b"junk").unwrap();

        let mut registry = ModelRegistry::open(dir.path().join("registry")).unwrap();
        assert!(registry.register("model", &junk).is_err());
        assert!(registry.list_models().is_empty());
    }
}
