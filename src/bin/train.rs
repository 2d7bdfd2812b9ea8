//! Offline model management against the same store the server uses.
//!
//! ```sh
//! cargo run --bin train -- train --input data/credit_card_transactions.csv --c 0.5
//! cargo run --bin train -- predict --model LogisticRegression_20240101_120000 --input batch.csv
//! cargo run --bin train -- list
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraudscope::application::ml::{PredictionService, TrainingService};
use fraudscope::config::Config;
use fraudscope::domain::ml::ModelParams;
use fraudscope::domain::repositories::ArtifactStore;
use fraudscope::infrastructure::csv_source;
use fraudscope::infrastructure::observability::Metrics;
use fraudscope::infrastructure::persistence::FsArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model store directory (overrides MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a model on a labelled CSV and store it
    Train {
        /// Path to training data CSV (defaults to LOCAL_DATA_PATH)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Maximum solver iterations
        #[arg(long, default_value_t = 1000)]
        max_iter: usize,

        /// Inverse regularization strength
        #[arg(long = "c", default_value_t = 1.0)]
        c: f64,
    },
    /// Score a CSV with a stored model and print the rows as JSON lines
    Predict {
        #[arg(long)]
        model: String,

        #[arg(long)]
        input: PathBuf,
    },
    /// Print the metrics of a stored model
    Info { model: String },
    /// List stored models
    List,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let model_dir = args.model_dir.unwrap_or(config.storage.model_dir.clone());

    let store: Arc<dyn ArtifactStore> = Arc::new(
        FsArtifactStore::init(&model_dir).context("Failed to initialise model store")?,
    );
    let metrics = Metrics::new()?;
    let prediction = PredictionService::new(store.clone(), metrics.clone());

    match args.command {
        Command::Train { input, max_iter, c } => {
            let input = input.unwrap_or(config.storage.local_data_path);
            info!("Loading training data from {:?}", input);
            let df = csv_source::read_csv_path(&input)?;

            let training = TrainingService::new(store, metrics);
            let name = training.train(df, ModelParams { max_iter, c })?;
            let info = prediction.get_model_info(&name)?;

            println!("Model {} trained and saved.", name);
            for (key, value) in info.metrics.entries() {
                println!("  {:<16} {:.4}", key, value);
            }
        }
        Command::Predict { model, input } => {
            let df = csv_source::read_csv_path(&input)?;
            let rows = prediction.predict(&model, df)?;
            for row in rows {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Command::Info { model } => {
            let info = prediction.get_model_info(&model)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::List => {
            for name in prediction.list_models()? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
