use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendlens::config::EngineConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "trendlens",
    version,
    about = "Trend and search analytics engine over crawled news headline batches",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML); environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one named operation with JSON parameters
    Query {
        /// Operation name, e.g. search_news or analyze_topic_trend
        operation: String,

        /// Operation parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Show the current attention-word ranking
    Trending {
        /// Number of topics to show
        #[arg(short = 'n', long, default_value = "10")]
        top_n: usize,

        /// Scope mode (current, daily)
        #[arg(short, long, default_value = "current")]
        mode: String,
    },

    /// Show engine and corpus health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    if let Err(e) = trendlens::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env()?,
    };

    match cli.command {
        Commands::Query { operation, params } => {
            tracing::info!(operation = %operation, "Starting query command");
            commands::query::query(config, operation, params).await?;
        }

        Commands::Trending { top_n, mode } => {
            tracing::info!(top_n = %top_n, mode = %mode, "Starting trending command");
            commands::trending::trending(config, top_n, mode).await?;
        }

        Commands::Status => {
            commands::status::status(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("trendlens=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("trendlens=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
