//! Propensity - Main Entry Point
//!
//! Train, register and serve the propensity-to-buy model.

use clap::Parser;
use propensity::cli::{
    cmd_automl_data, cmd_info, cmd_predict, cmd_register, cmd_score, cmd_train, Cli, Commands,
};
use propensity::scoring::ScoringConfig;
use propensity::training::TrainingConfig;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `score` keeps stdout for responses
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propensity=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data_folder,
            filename,
            c,
            output,
            tracking_dir,
            experiment,
            cv_folds,
            seed,
            register,
            registry_dir,
        } => {
            let mut config = TrainingConfig::new(data_folder, filename, c)
                .with_output_path(output)
                .with_tracking_dir(tracking_dir)
                .with_experiment_name(experiment)
                .with_cv_folds(cv_folds);
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(name) = register {
                config = config.with_registration(name, registry_dir);
            }
            cmd_train(config)?;
        }
        Commands::Score { model_name, registry_dir, fail_fast } => {
            let config = ScoringConfig::new()
                .with_model_name(model_name)
                .with_registry_dir(registry_dir);
            cmd_score(config, fail_fast)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Commands::Register { model, name, registry_dir } => {
            cmd_register(&model, &name, &registry_dir)?;
        }
        Commands::AutomlData { output_dir } => {
            cmd_automl_data(output_dir.as_deref())?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
