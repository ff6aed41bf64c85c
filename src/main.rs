use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use steam_ownership::trainer::feature_vector;
use steam_ownership::{AppConfig, AppId, Collector, OwnershipModel, Trainer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Steps
// 1. collect: fetch store, review and chart stats into the CSV store
// 2. label the `ownership` column by hand
// 3. train: fit the boosted-tree model on labeled rows and save it
// 4. estimate: predict ownership for one app from live stats

#[derive(Parser)]
#[command(name = "steam-ownership", version, about)]
struct Cli {
    /// Path to the TOML run configuration
    #[arg(short, long, default_value = "steam-ownership.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch statistics for every configured app and update the store
    Collect,
    /// Train the ownership model from the labeled rows of the store
    Train,
    /// Predict ownership for one app with the saved model
    Estimate { app_id: AppId },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Collect => {
            let collector = Collector::from_settings(config.collector)?;
            collector.run(&config.identifiers, &config.store_path)?;
        }
        Command::Train => {
            let trainer = Trainer::new(config.trainer);
            let report = trainer.run(&config.store_path, &config.model_path)?;
            info!(
                labeled = report.labeled_rows,
                trained_on = report.training_rows,
                "training complete"
            );
        }
        Command::Estimate { app_id } => {
            let collector = Collector::from_settings(config.collector)?;
            let row = collector.collect_app(app_id).into_row();
            let Some(features) = feature_vector(&row) else {
                bail!("app {app_id} is listed as paid but has no price; nothing to estimate");
            };

            let model = OwnershipModel::load(&config.model_path)?;
            let estimate = model.predict(&features);
            println!("{app_id}\t{estimate:.0}");
        }
    }

    Ok(())
}
