//! Storage Backend for Experiment Tracking

use std::fs;
use std::path::{Path, PathBuf};

use super::tracker::Experiment;
use crate::error::Result;

/// File holding all experiments of a tracking directory
pub const EXPERIMENTS_FILE: &str = "experiments.json";

/// Storage backend trait
pub trait StorageBackend {
    /// Save experiments to storage
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()>;

    /// Load experiments from storage
    fn load_experiments(&self) -> Result<Vec<Experiment>>;
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend; the directory is created on save
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn experiments_file(&self) -> PathBuf {
        self.base_dir.join(EXPERIMENTS_FILE)
    }
}

impl StorageBackend for LocalStorage {
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        let json = serde_json::to_string_pretty(experiments)?;
        let tmp = self.base_dir.join(format!("{}.tmp", EXPERIMENTS_FILE));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.experiments_file())?;

        tracing::debug!(
            path = %self.experiments_file().display(),
            experiments = experiments.len(),
            "Saved experiment store"
        );
        Ok(())
    }

    fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let file_path = self.experiments_file();

        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&file_path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
