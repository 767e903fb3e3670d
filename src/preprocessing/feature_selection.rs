//! Fixed feature selection for the banking-marketing dataset
//!
//! Selects the demographic, campaign-history and economic-indicator columns
//! plus the binary label. The same selector feeds both the trainer and the
//! automated-search data provider.

use crate::error::{PropensityError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Demographic columns
pub const DEMOGRAPHIC_COLUMNS: [&str; 6] = ["age", "job", "education", "marital", "housing", "loan"];

/// Previous-campaign columns
pub const CAMPAIGN_COLUMNS: [&str; 3] = ["month", "campaign", "poutcome"];

/// Economic-indicator columns
pub const ECONOMIC_COLUMNS: [&str; 5] = [
    "emp_var_rate",
    "cons_price_idx",
    "cons_conf_idx",
    "euribor3m",
    "nr_employed",
];

/// Name of the label column
pub const LABEL_COLUMN: &str = "y";

/// Feature columns and label column picked out of a raw table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    feature_columns: Vec<String>,
    label_column: String,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self::banking()
    }
}

impl FeatureSelector {
    /// Create a selector over arbitrary columns
    pub fn new(feature_columns: Vec<String>, label_column: impl Into<String>) -> Self {
        Self {
            feature_columns,
            label_column: label_column.into(),
        }
    }

    /// The banking-marketing column set
    pub fn banking() -> Self {
        let feature_columns = DEMOGRAPHIC_COLUMNS
            .iter()
            .chain(CAMPAIGN_COLUMNS.iter())
            .chain(ECONOMIC_COLUMNS.iter())
            .map(|s| s.to_string())
            .collect();
        Self::new(feature_columns, LABEL_COLUMN)
    }

    /// Selected feature column names, in output order
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Label column name
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Required columns (features, then label) absent from `df`
    pub fn missing_columns(&self, df: &DataFrame) -> Vec<String> {
        let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        self.feature_columns
            .iter()
            .chain(std::iter::once(&self.label_column))
            .filter(|name| !present.contains(&name.as_str()))
            .cloned()
            .collect()
    }

    /// Fail with the first required column that is absent
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        match self.missing_columns(df).into_iter().next() {
            Some(missing) => Err(PropensityError::FeatureNotFound(missing)),
            None => Ok(()),
        }
    }

    /// Only the feature columns, for tables without labels
    pub fn select_features(&self, df: &DataFrame) -> Result<DataFrame> {
        if let Some(missing) = self
            .feature_columns
            .iter()
            .find(|name| df.column(name.as_str()).is_err())
        {
            return Err(PropensityError::FeatureNotFound(missing.clone()));
        }
        Ok(df.select(self.feature_columns.iter().map(|s| s.as_str()))?)
    }

    /// Split a raw table into `(features, labels)`.
    ///
    /// `features` holds exactly the selected columns in order; `labels` is the
    /// flattened label column as 0/1 values, one per input row.
    pub fn select(&self, df: &DataFrame) -> Result<(DataFrame, Array1<f64>)> {
        self.validate(df)?;

        let features = df.select(self.feature_columns.iter().map(|s| s.as_str()))?;

        let label = df
            .column(&self.label_column)
            .map_err(|_| PropensityError::FeatureNotFound(self.label_column.clone()))?;
        let labels = labels_from_column(&self.label_column, label.as_materialized_series())?;

        Ok((features, labels))
    }
}

/// Convert a label column into 0/1 floats.
///
/// Numeric columns must only hold 0 and 1. String columns accept
/// `yes`/`no`, `true`/`false` and `1`/`0` (case-insensitive).
pub fn labels_from_column(name: &str, series: &Series) -> Result<Array1<f64>> {
    let values: Vec<f64> = match series.dtype() {
        DataType::String => series
            .str()
            .map_err(|e| PropensityError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
                Some("yes") | Some("true") | Some("1") => Ok(1.0),
                Some("no") | Some("false") | Some("0") => Ok(0.0),
                Some(other) => Err(PropensityError::InvalidInput(format!(
                    "Label '{}' at row {} is not binary: {}",
                    name, row, other
                ))),
                None => Err(PropensityError::InvalidInput(format!(
                    "Label '{}' is null at row {}",
                    name, row
                ))),
            })
            .collect::<Result<_>>()?,
        DataType::Boolean => series
            .bool()
            .map_err(|e| PropensityError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.map(|b| if b { 1.0 } else { 0.0 }).ok_or_else(|| {
                    PropensityError::InvalidInput(format!("Label '{}' is null at row {}", name, row))
                })
            })
            .collect::<Result<_>>()?,
        _ => {
            let casted = series
                .cast(&DataType::Float64)
                .map_err(|e| PropensityError::DataError(e.to_string()))?;
            casted
                .f64()
                .map_err(|e| PropensityError::DataError(e.to_string()))?
                .into_iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Some(x) if x == 0.0 || x == 1.0 => Ok(x),
                    Some(x) => Err(PropensityError::InvalidInput(format!(
                        "Label '{}' at row {} is not binary: {}",
                        name, row, x
                    ))),
                    None => Err(PropensityError::InvalidInput(format!(
                        "Label '{}' is null at row {}",
                        name, row
                    ))),
                })
                .collect::<Result<_>>()?
        }
    };

    Ok(Array1::from_vec(values))
}
