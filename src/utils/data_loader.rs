//! Data loading utilities

use crate::error::{PropensityError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Sub-directory of the data folder that holds the training datasets
pub const DATASETS_DIR: &str = "datasets";

/// CSV loader for the banking datasets.
///
/// Schema inference scans the whole file so late non-integer values do not
/// break numeric columns.
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    /// Path of a training file: `{data_folder}/datasets/{filename}`
    pub fn training_path(data_folder: impl AsRef<Path>, filename: &str) -> PathBuf {
        data_folder.as_ref().join(DATASETS_DIR).join(filename)
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| {
            PropensityError::DataError(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                PropensityError::DataError(format!("Failed to parse {}: {}", path.display(), e))
            })?;

        tracing::debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );

        Ok(df)
    }
}

/// Save DataFrames back to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PropensityError::DataError(e.to_string()))
    }
}
