mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "graphlens-cli")]
#[command(about = "Graphlens chart insight command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a chart image and print the outcome as JSON
    Analyze {
        /// Path to a PNG, JPEG, GIF, BMP or WEBP image
        path: PathBuf,
    },
    /// Show recently stored data points
    History {
        /// Restrict output to one metric
        #[arg(long)]
        metric: Option<String>,

        /// Maximum number of rows to print
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Apply pending database migrations
    Migrate,
    /// Send a trivial prompt to the configured text model
    CheckModel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("graphlens-cli: run with --help to list commands");
        return Ok(());
    };

    let log_level = std::env::var("GRAPHLENS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // check-model only talks to the model API, so it loads no database settings.
    match command {
        Commands::Analyze { path } => {
            commands::run_analyze(&graphlens_core::load_app_config()?, &path).await
        }
        Commands::History { metric, limit } => {
            let config = graphlens_core::load_app_config()?;
            commands::run_history(&config, metric.as_deref(), limit).await
        }
        Commands::Migrate => commands::run_migrate(&graphlens_core::load_app_config()?).await,
        Commands::CheckModel => {
            commands::run_check_model(&graphlens_core::load_model_config()?).await
        }
    }
}
