//! Propensity CLI Module
//!
//! Command-line interface for training, scoring and data inspection.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::automl;
use crate::export::{ModelArtifact, ModelRegistry};
use crate::preprocessing::{labels_from_column, FeatureSelector, OneHotEncoder};
use crate::scoring::{ScoringConfig, ScoringService, DEFAULT_MODEL_NAME};
use crate::training::{Trainer, TrainingConfig};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "propensity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Propensity-to-buy model training and scoring")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train, cross-validate and save the propensity model
    Train {
        /// Folder containing datasets/<filename>
        #[arg(long)]
        data_folder: PathBuf,

        /// Training CSV inside datasets/
        #[arg(long)]
        filename: String,

        /// Inverse regularization strength
        #[arg(long = "C", default_value = "1.0")]
        c: f64,

        /// Output artifact path
        #[arg(short, long, default_value = "outputs/model.bin")]
        output: PathBuf,

        /// Experiment store directory
        #[arg(long, default_value = "mlruns")]
        tracking_dir: PathBuf,

        /// Experiment name
        #[arg(long, default_value = DEFAULT_MODEL_NAME)]
        experiment: String,

        /// Number of cross-validation folds
        #[arg(long, default_value = "10")]
        cv_folds: usize,

        /// Shuffle folds with this seed
        #[arg(long)]
        seed: Option<u64>,

        /// Register the artifact under this name
        #[arg(long)]
        register: Option<String>,

        /// Model registry directory
        #[arg(long, default_value = "models")]
        registry_dir: PathBuf,
    },

    /// Serve init/run over stdin/stdout, one JSON payload per line
    Score {
        /// Registered model name
        #[arg(long, default_value = DEFAULT_MODEL_NAME)]
        model_name: String,

        /// Model registry directory
        #[arg(long, default_value = "models")]
        registry_dir: PathBuf,

        /// Exit when the model cannot be loaded
        #[arg(long)]
        fail_fast: bool,
    },

    /// Predict a raw CSV with a saved artifact
    Predict {
        /// Artifact file
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV with the raw feature columns
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add an artifact to the model registry
    Register {
        /// Artifact file
        #[arg(short, long)]
        model: PathBuf,

        /// Registered model name
        #[arg(short, long, default_value = DEFAULT_MODEL_NAME)]
        name: String,

        /// Model registry directory
        #[arg(long, default_value = "models")]
        registry_dir: PathBuf,
    },

    /// Load the automated-search dataset from the environment
    AutomlData {
        /// Write X.csv and y.csv here
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config: TrainingConfig) -> anyhow::Result<()> {
    section("Train");

    let path = DataLoader::training_path(&config.data_folder, &config.filename);
    println!("  {}", kv("Dataset", &path.display().to_string()));
    println!("  {}", kv("C      ", &config.c.to_string()));
    println!("  {}", kv("Folds  ", &config.cv_folds.to_string()));
    println!();

    step_run(&format!("Cross-validating and fitting {}", "logistic regression".cyan()));
    let start = Instant::now();
    let report = Trainer::new(config).run()?;
    step_done(&format!("{:.2?}", start.elapsed()));

    println!();
    line_box_top();
    line_box(&kv("C          ", &format!("{}", report.c)));
    line_box(&kv("CV Accuracy", &format!("{:.4} ± {:.4}", report.cv_accuracy, report.cv.accuracy.std_score)));
    line_box(&kv("CV Recall  ", &format!("{:.4} ± {:.4}", report.cv_recall, report.cv.recall.std_score)));
    line_box_sep();
    line_box(&kv("Rows       ", &report.n_samples.to_string()));
    line_box(&kv("Features   ", &report.n_features.to_string()));
    line_box(&kv("Iterations ", &format!(
        "{}{}",
        report.iterations,
        if report.converged { "" } else { " (not converged)" }
    )));
    line_box(&kv("Artifact   ", &report.artifact_path.display().to_string()));
    if let Some(entry) = &report.registered {
        line_box(&kv("Registered ", &format!("{} v{}", entry.name, entry.version)));
    }
    line_box(&kv("Run        ", &report.run_id));
    line_box_bottom();
    println!();

    Ok(())
}

/// Responses go to stdout, one per line; everything else goes to the log
pub fn cmd_score(config: ScoringConfig, fail_fast: bool) -> anyhow::Result<()> {
    let service = ScoringService::new(config);
    if fail_fast {
        service.try_init()?;
    } else {
        service.init();
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(out, "{}", service.run(&line))?;
        out.flush()?;
    }

    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let artifact = ModelArtifact::load(model_path)?;
    step_done(&format!("{} encoded features", artifact.n_features()));

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let selector = FeatureSelector::new(
        artifact.metadata.feature_columns.clone(),
        artifact.metadata.target_name.clone(),
    );
    let features = selector.select_features(&df)?;

    step_run("Predicting");
    let start = Instant::now();
    let predictions = artifact.predict_frame(&features)?;
    let probabilities = artifact.predict_proba_frame(&features)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    let positives = predictions.iter().filter(|&&p| p > 0.5).count();
    println!();
    println!("  {:<16} {}", muted("Rows"), predictions.len());
    println!("  {:<16} {}", muted("Predicted buy"), positives.to_string().white().bold());

    if let Some(path) = output {
        let labels: Vec<i32> = predictions.iter().map(|&p| i32::from(p > 0.5)).collect();
        let mut out = df!(
            "prediction" => labels,
            "probability" => probabilities.to_vec()
        )?;
        DataSaver::save_csv(&mut out, path)?;
        println!("  {:<16} {}", muted("Saved"), path.display());
    }

    println!();
    Ok(())
}

pub fn cmd_register(model_path: &Path, name: &str, registry_dir: &Path) -> anyhow::Result<()> {
    section("Register");

    let mut registry = ModelRegistry::open(registry_dir)?;
    let entry = registry.register(name, model_path)?;

    println!("  {} {} v{}", ok("✓"), entry.name.white().bold(), entry.version);
    println!("  {:<12} {}", muted("Path"), registry.root().join(&entry.path).display());
    for (metric, value) in &entry.metrics {
        println!("  {:<12} {:.4}", muted(metric), value);
    }
    println!();
    Ok(())
}

pub fn cmd_automl_data(output_dir: Option<&Path>) -> anyhow::Result<()> {
    section("Automated search data");

    let data = automl::get_data()?;
    let positives = data.y.iter().filter(|&&v| v == 1.0).count();

    println!("  {:<12} {} × {}", muted("X"), data.x.height(), data.x.width());
    println!("  {:<12} {} ({} positive)", muted("y"), data.y.len(), positives);

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let mut x = data.x.clone();
        DataSaver::save_csv(&mut x, dir.join("X.csv"))?;
        let mut y = df!("y" => data.y.to_vec())?;
        DataSaver::save_csv(&mut y, dir.join("y.csv"))?;
        println!("  {:<12} {}", muted("Saved"), dir.display());
    }

    println!();
    Ok(())
}

/// How a selected column enters the model
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRole {
    Numeric,
    /// One-hot encoded; holds the distinct level count
    Categorical(usize),
}

#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub name: String,
    pub role: ColumnRole,
    pub nulls: usize,
}

/// Training-readiness summary of a raw banking table
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    /// Required columns (features, then label) that are absent
    pub missing: Vec<String>,
    /// Buyers in the label column, when it is present and valid
    pub positives: Option<usize>,
    /// Width of the one-hot encoded matrix, when every feature is present
    pub encoded_width: Option<usize>,
}

/// Profile the selected columns of `df` as the trainer would see them
pub fn profile_dataset(df: &DataFrame, selector: &FeatureSelector) -> DatasetProfile {
    let columns = selector
        .feature_columns()
        .iter()
        .filter_map(|name| df.column(name.as_str()).ok())
        .map(|col| ColumnProfile {
            name: col.name().to_string(),
            role: if col.dtype() == &DataType::String {
                ColumnRole::Categorical(col.n_unique().unwrap_or(0))
            } else {
                ColumnRole::Numeric
            },
            nulls: col.null_count(),
        })
        .collect();

    let positives = df
        .column(selector.label_column())
        .ok()
        .and_then(|col| labels_from_column(selector.label_column(), col.as_materialized_series()).ok())
        .map(|y| y.iter().filter(|&&v| v == 1.0).count());

    let encoded_width = selector.select_features(df).ok().and_then(|features| {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&features).ok()?;
        encoder.schema().ok().map(|schema| schema.len())
    });

    DatasetProfile {
        rows: df.height(),
        columns,
        missing: selector.missing_columns(df),
        positives,
        encoded_width,
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Dataset Profile");

    let df = DataLoader::new().load_csv(data_path)?;
    let profile = profile_dataset(&df, &FeatureSelector::banking());

    println!("  {:<14} {}", muted("File"), data_path.display());
    println!("  {:<14} {}", muted("Rows"), profile.rows);
    if let Some(positives) = profile.positives {
        let share = if profile.rows > 0 { 100.0 * positives as f64 / profile.rows as f64 } else { 0.0 };
        println!("  {:<14} {} ({:.1}%)", muted("Buyers"), positives, share);
    }
    if let Some(width) = profile.encoded_width {
        println!("  {:<14} {}", muted("Encoded width"), width);
    }
    println!();

    println!("  {:<16} {:<12} {:>6} {:>7}", muted("Feature"), muted("Role"), muted("Nulls"), muted("Levels"));
    println!("  {}", dim(&"─".repeat(44)));

    for column in &profile.columns {
        let (role, levels) = match column.role {
            ColumnRole::Numeric => ("numeric", "-".to_string()),
            ColumnRole::Categorical(n) => ("categorical", n.to_string()),
        };
        let nulls = if column.nulls > 0 {
            column.nulls.to_string().yellow()
        } else {
            column.nulls.to_string().normal()
        };
        println!("  {:<16} {:<12} {:>6} {:>7}", column.name, muted(role), nulls, levels);
    }

    println!();
    if profile.missing.is_empty() {
        println!("  {} ready for training", ok("✓"));
    } else {
        println!("  {} missing: {}", "!".yellow(), profile.missing.join(", "));
    }

    println!();
    Ok(())
}
