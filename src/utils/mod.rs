//! Utility functions and types

pub mod data_loader;

pub use data_loader::{DataLoader, DataSaver, DATASETS_DIR};

use crate::error::{PropensityError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Every column is cast to Float64; nulls are rejected rather than filled.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| PropensityError::FeatureNotFound(col_name.clone()))?;
            let casted = column
                .cast(&DataType::Float64)
                .map_err(|e| PropensityError::DataError(e.to_string()))?;
            casted
                .f64()
                .map_err(|e| PropensityError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        PropensityError::DataError(format!("Null value in column '{}'", col_name))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}
