//! Categorical encoding with reference-category dropping
//!
//! String columns are expanded into one indicator column per category seen
//! during `fit`. Categories are sorted and the first one becomes the
//! reference level, which gets no column. Numeric columns come first
//! in their original order, followed by the indicator blocks in column order.

use crate::error::{PropensityError, Result};
use crate::utils::columns_to_array2;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of an encoded column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Numeric column passed through as f64
    Numeric,
    /// 0/1 indicator for `source == category`
    Indicator { source: String, category: String },
}

/// One column of the encoded feature matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered layout of the encoded feature matrix, fixed at fit time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<SchemaColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    /// Encoded column names in matrix order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in the matrix
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Per-column category universe learned during fit
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoryLevels {
    column: String,
    /// Sorted, including the dropped reference level
    levels: Vec<String>,
}

/// One-hot encoder that drops the reference category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    numeric_columns: Vec<String>,
    categorical: Vec<CategoryLevels>,
    schema: FeatureSchema,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    /// Create an encoder that drops the reference category
    pub fn new() -> Self {
        Self {
            numeric_columns: Vec::new(),
            categorical: Vec::new(),
            schema: FeatureSchema::default(),
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned layout of the encoded matrix
    pub fn schema(&self) -> Result<&FeatureSchema> {
        if !self.is_fitted {
            return Err(PropensityError::ModelNotFitted);
        }
        Ok(&self.schema)
    }

    /// Learn numeric columns and the category universe of string columns
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let mut numeric_columns = Vec::new();
        let mut categorical = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if is_categorical(column.dtype()) {
                let levels = collect_levels(column.as_materialized_series())?;
                categorical.push(CategoryLevels { column: name, levels });
            } else if is_numeric(column.dtype()) {
                numeric_columns.push(name);
            } else {
                return Err(PropensityError::PreprocessingError(format!(
                    "Column '{}' has unsupported dtype {}",
                    name,
                    column.dtype()
                )));
            }
        }

        let mut schema_columns: Vec<SchemaColumn> = numeric_columns
            .iter()
            .map(|name| SchemaColumn {
                name: name.clone(),
                kind: ColumnKind::Numeric,
            })
            .collect();

        for cat in &categorical {
            for level in cat.levels.iter().skip(1) {
                schema_columns.push(SchemaColumn {
                    name: format!("{}_{}", cat.column, level),
                    kind: ColumnKind::Indicator {
                        source: cat.column.clone(),
                        category: level.clone(),
                    },
                });
            }
        }

        tracing::debug!(
            numeric = numeric_columns.len(),
            categorical = categorical.len(),
            encoded = schema_columns.len(),
            "Fitted one-hot encoder"
        );

        self.numeric_columns = numeric_columns;
        self.categorical = categorical;
        self.schema = FeatureSchema::new(schema_columns);
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode a table into the fitted layout, all columns Float64.
    ///
    /// Categories not seen during fit are rejected; nulls in categorical
    /// columns encode as all-zero indicators.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PropensityError::ModelNotFitted);
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.schema.len());

        for name in &self.numeric_columns {
            let column = df
                .column(name)
                .map_err(|_| PropensityError::FeatureNotFound(name.clone()))?;
            let casted = column
                .cast(&DataType::Float64)
                .map_err(|e| PropensityError::PreprocessingError(e.to_string()))?;
            columns.push(casted);
        }

        for cat in &self.categorical {
            let column = df
                .column(&cat.column)
                .map_err(|_| PropensityError::FeatureNotFound(cat.column.clone()))?;
            let casted = column
                .cast(&DataType::String)
                .map_err(|e| PropensityError::PreprocessingError(e.to_string()))?;
            let ca = casted
                .str()
                .map_err(|e| PropensityError::PreprocessingError(e.to_string()))?;

            // Level index per row, None for nulls
            let indices: Vec<Option<usize>> = ca
                .into_iter()
                .map(|v| match v {
                    Some(s) => cat
                        .levels
                        .binary_search_by(|level| level.as_str().cmp(s))
                        .map(Some)
                        .map_err(|_| PropensityError::UnknownCategory {
                            column: cat.column.clone(),
                            category: s.to_string(),
                        }),
                    None => Ok(None),
                })
                .collect::<Result<_>>()?;

            for (level_idx, level) in cat.levels.iter().enumerate().skip(1) {
                let values: Vec<f64> = indices
                    .iter()
                    .map(|idx| if *idx == Some(level_idx) { 1.0 } else { 0.0 })
                    .collect();
                let name = format!("{}_{}", cat.column, level);
                columns.push(Series::new(name.into(), values).into());
            }
        }

        DataFrame::new(columns).map_err(|e| PropensityError::PreprocessingError(e.to_string()))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Encode straight into a row-major matrix in schema order
    pub fn transform_to_array(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let encoded = self.transform(df)?;
        columns_to_array2(&encoded, &self.schema.names())
    }
}

fn is_categorical(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String)
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
        DataType::Float32 | DataType::Float64 | DataType::Boolean
    )
}

/// Sorted unique non-null values of a string column
fn collect_levels(series: &Series) -> Result<Vec<String>> {
    let ca = series
        .str()
        .map_err(|e| PropensityError::PreprocessingError(e.to_string()))?;

    let levels: BTreeSet<&str> = ca.into_iter().flatten().collect();
    Ok(levels.into_iter().map(str::to_string).collect())
}
