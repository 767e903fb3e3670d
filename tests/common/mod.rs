//! Shared fixtures for integration tests

#![allow(dead_code)]

use polars::prelude::*;
use propensity::utils::{DataSaver, DATASETS_DIR};
use std::path::Path;

pub const TRAINING_FILE: &str = "banking_train.csv";

/// Deterministic banking-marketing table with a learnable label.
///
/// Buyers have a low euribor rate and mostly a successful previous outcome;
/// exactly half the rows are buyers.
pub fn banking_frame(n: usize) -> DataFrame {
    let jobs = ["admin.", "blue-collar", "technician", "services"];
    let educations = ["basic.9y", "high.school", "university.degree"];
    let maritals = ["married", "single", "divorced"];
    let months = ["may", "jun", "jul", "aug"];

    let buyer = |i: usize| i % 2 == 0;

    let age: Vec<i64> = (0..n).map(|i| 22 + ((i * 7) % 50) as i64).collect();
    let job: Vec<&str> = (0..n).map(|i| jobs[i % jobs.len()]).collect();
    let education: Vec<&str> = (0..n).map(|i| educations[(i / 2) % educations.len()]).collect();
    let marital: Vec<&str> = (0..n).map(|i| maritals[(i / 3) % maritals.len()]).collect();
    let housing: Vec<&str> = (0..n).map(|i| if (i / 2) % 2 == 0 { "yes" } else { "no" }).collect();
    let loan: Vec<&str> = (0..n).map(|i| if i % 5 == 0 { "yes" } else { "no" }).collect();
    let month: Vec<&str> = (0..n).map(|i| months[(i / 4) % months.len()]).collect();
    let campaign: Vec<i64> = (0..n).map(|i| 1 + (i % 4) as i64).collect();
    let poutcome: Vec<&str> = (0..n)
        .map(|i| match (buyer(i), i % 10) {
            (true, 0) => "failure",
            (true, _) => "success",
            (false, 1) => "success",
            (false, _) => "nonexistent",
        })
        .collect();
    let emp_var_rate: Vec<f64> = (0..n)
        .map(|i| (if buyer(i) { -1.8 } else { 1.1 }) + (i % 3) as f64 * 0.1)
        .collect();
    let cons_price_idx: Vec<f64> = (0..n).map(|i| 92.5 + (i % 9) as f64 * 0.15).collect();
    let cons_conf_idx: Vec<f64> = (0..n).map(|i| -46.0 + (i % 11) as f64).collect();
    let euribor3m: Vec<f64> = (0..n)
        .map(|i| (if buyer(i) { 0.9 } else { 4.8 }) + (i % 7) as f64 * 0.05)
        .collect();
    let nr_employed: Vec<f64> = (0..n).map(|i| 5000.0 + (i % 13) as f64 * 17.5).collect();
    let y: Vec<i64> = (0..n).map(|i| i64::from(buyer(i))).collect();

    df!(
        "age" => age,
        "job" => job,
        "education" => education,
        "marital" => marital,
        "housing" => housing,
        "loan" => loan,
        "month" => month,
        "campaign" => campaign,
        "poutcome" => poutcome,
        "emp_var_rate" => emp_var_rate,
        "cons_price_idx" => cons_price_idx,
        "cons_conf_idx" => cons_conf_idx,
        "euribor3m" => euribor3m,
        "nr_employed" => nr_employed,
        "y" => y
    )
    .unwrap()
}

/// Write `df` to `{folder}/datasets/banking_train.csv`
pub fn write_training_csv(folder: &Path, df: &DataFrame) {
    let dir = folder.join(DATASETS_DIR);
    std::fs::create_dir_all(&dir).unwrap();
    let mut df = df.clone();
    DataSaver::save_csv(&mut df, dir.join(TRAINING_FILE)).unwrap();
}
