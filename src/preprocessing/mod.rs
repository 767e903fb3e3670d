//! Data preprocessing module
//!
//! - Fixed feature selection for the banking dataset
//! - One-hot encoding with reference-category dropping and a persisted schema
//! - Standard scaling

pub mod encoder;
pub mod feature_selection;
pub mod scaler;

pub use encoder::{ColumnKind, FeatureSchema, OneHotEncoder, SchemaColumn};
pub use feature_selection::{labels_from_column, FeatureSelector, LABEL_COLUMN};
pub use scaler::{ScalerParams, StandardScaler};
