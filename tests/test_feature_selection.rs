//! Integration test: feature selection and the automated-search data provider

mod common;

use common::{banking_frame, TRAINING_FILE};
use polars::prelude::*;
use propensity::automl::get_data_from;
use propensity::preprocessing::FeatureSelector;
use propensity::utils::DataSaver;
use propensity::PropensityError;
use tempfile::TempDir;

const EXPECTED: [&str; 14] = [
    "age",
    "job",
    "education",
    "marital",
    "housing",
    "loan",
    "month",
    "campaign",
    "poutcome",
    "emp_var_rate",
    "cons_price_idx",
    "cons_conf_idx",
    "euribor3m",
    "nr_employed",
];

/// Raw table with an extra column the selector must drop
fn raw_frame(n: usize) -> DataFrame {
    let mut df = banking_frame(n);
    let duration = Series::new("duration".into(), (0..n as i64).collect::<Vec<_>>());
    df.with_column(duration).unwrap();
    df
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_selects_fourteen_columns_in_order() {
    let (x, y) = FeatureSelector::banking().select(&raw_frame(25)).unwrap();

    assert_eq!(column_names(&x), EXPECTED.to_vec());
    assert_eq!(x.height(), 25);
    assert_eq!(y.len(), 25);
    assert_eq!(y[0], 1.0);
    assert_eq!(y[1], 0.0);
}

#[test]
fn test_missing_column_named() {
    let df = raw_frame(10).drop("poutcome").unwrap();
    let err = FeatureSelector::banking().select(&df).unwrap_err();
    assert!(matches!(err, PropensityError::FeatureNotFound(ref c) if c == "poutcome"));

    let df = raw_frame(10).drop("y").unwrap();
    assert!(FeatureSelector::banking().select(&df).is_err());
    assert_eq!(FeatureSelector::banking().select_features(&df).unwrap().width(), 14);
}

#[test]
fn test_automl_data_from_directory() {
    let dir = TempDir::new().unwrap();
    let mut df = raw_frame(30);
    DataSaver::save_csv(&mut df, dir.path().join(TRAINING_FILE)).unwrap();

    let data = get_data_from(dir.path()).unwrap();
    assert_eq!(column_names(&data.x), EXPECTED.to_vec());
    assert_eq!(data.x.height(), 30);
    assert_eq!(data.y.len(), 30);
    assert_eq!(data.y.sum(), 15.0);
}
