mod config;
mod data;
mod engine;
mod error;
mod ml;
mod types;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;
use data::CsvLoader;
use engine::{evaluate, infer, TrainRequest, Trainer};
use ml::persistence::ModelStore;
use ml::{CancelToken, PersistenceBaseline, RecurrentRegressor, SequenceRegressor};

#[derive(Parser)]
#[command(name = "oil-price-forecast")]
#[command(version = "0.1.0")]
#[command(about = "Windowed sequence-model forecasting for Brent oil prices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "forecast.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on a CSV price series and persist the artifact
    Train {
        /// Input CSV with date and price columns
        #[arg(short, long)]
        data: String,

        /// Window length (overrides config)
        #[arg(short, long)]
        time_step: Option<usize>,

        /// Training epochs (overrides config)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Base name for the saved artifact (overrides config)
        #[arg(short, long)]
        model_name: Option<String>,

        /// Regressor to train: recurrent or baseline
        #[arg(short, long, default_value = "recurrent")]
        regressor: String,

        /// Write y_test/test_predict/metrics JSON to this path
        #[arg(long)]
        export: Option<String>,
    },
    /// Score a saved model against new raw data
    Predict {
        /// Path to a saved model artifact
        #[arg(short, long)]
        artifact: String,

        /// Input CSV with date and price columns
        #[arg(short, long)]
        data: String,

        /// Write y_true/predictions/metrics JSON to this path
        #[arg(long)]
        export: Option<String>,
    },
    /// List saved model artifacts
    Models {
        /// Artifact folder (overrides config)
        #[arg(short, long)]
        folder: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let app_config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Train {
            data,
            time_step,
            epochs,
            model_name,
            regressor,
            export,
        } => {
            run_train(
                &app_config,
                &data,
                time_step,
                epochs,
                model_name,
                &regressor,
                export.as_deref(),
            )?;
        }
        Commands::Predict {
            artifact,
            data,
            export,
        } => {
            run_predict(&app_config, &artifact, &data, export.as_deref())?;
        }
        Commands::Models { folder } => {
            let folder = folder.unwrap_or_else(|| app_config.pipeline.model_folder.clone());
            let store = ModelStore::new(folder);
            let paths = store.list()?;
            if paths.is_empty() {
                info!("No saved models in {}", store.folder().display());
            }
            for path in paths {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn select_regressor(name: &str) -> Result<Box<dyn SequenceRegressor>> {
    match name {
        ml::recurrent::KIND => Ok(Box::new(RecurrentRegressor::new())),
        ml::baseline::KIND => Ok(Box::new(PersistenceBaseline::new())),
        other => Err(anyhow!("unknown regressor '{}'", other)),
    }
}

fn run_train(
    app_config: &AppConfig,
    data_path: &str,
    time_step: Option<usize>,
    epochs: Option<usize>,
    model_name: Option<String>,
    regressor_name: &str,
    export: Option<&str>,
) -> Result<()> {
    let loader = CsvLoader::new(
        app_config.data.date_column.clone(),
        app_config.data.price_column.clone(),
    );
    let (series, report) = loader.load_path(data_path)?;
    info!(
        "Series: {} points from {} to {} ({} rows dropped)",
        series.len(),
        series.first_date(),
        series.last_date(),
        report.dropped
    );

    let mut training = app_config.training.clone();
    if let Some(epochs) = epochs {
        training.epochs = epochs;
    }
    let request = TrainRequest {
        time_step: time_step.unwrap_or(app_config.pipeline.time_step),
        model_name: model_name.unwrap_or_else(|| app_config.pipeline.model_name.clone()),
        training,
    };

    let regressor = select_regressor(regressor_name)?;
    let trainer = Trainer::new(ModelStore::new(&app_config.pipeline.model_folder));
    let outcome = trainer.run(&series, regressor.as_ref(), &request, &CancelToken::new())?;

    let metrics = evaluate(&outcome.y_test, &outcome.test_predict)?;
    outcome.print_summary(&metrics);

    if let Some(export_path) = export {
        std::fs::write(export_path, outcome.export_json(&metrics)?)?;
        info!("Diagnostics written to {}", export_path);
    }

    Ok(())
}

fn run_predict(
    app_config: &AppConfig,
    artifact_path: &str,
    data_path: &str,
    export: Option<&str>,
) -> Result<()> {
    let artifact = ModelStore::load(artifact_path)?;
    let regressor = select_regressor(&artifact.model.kind)?;

    let loader = CsvLoader::new(
        app_config.data.date_column.clone(),
        app_config.data.price_column.clone(),
    );
    let (series, _) = loader.load_path(data_path)?;

    let inference = infer(&artifact, regressor.as_ref(), &series)?;
    let metrics = evaluate(&inference.y_true, &inference.predictions)?;

    println!("\n{}", "=".repeat(60));
    println!("                 INFERENCE RESULTS");
    println!("{}", "=".repeat(60));
    println!("Model:              {}", artifact.model.kind);
    println!("Trained at:         {}", artifact.trained_at);
    println!("Windows scored:     {}", inference.predictions.len());
    println!("{}", "-".repeat(60));
    for (name, value) in metrics.to_map() {
        println!("  {:<10} {:.4}", name, value);
    }
    println!("{}", "=".repeat(60));

    if let Some(export_path) = export {
        let export_json = serde_json::json!({
            "y_true": inference.y_true,
            "predictions": inference.predictions,
            "metrics": metrics,
        });
        std::fs::write(export_path, serde_json::to_string_pretty(&export_json)?)?;
        info!("Diagnostics written to {}", export_path);
    }

    Ok(())
}
