//! covcast CLI - serve, train and query COVID case-count forecasts.
//!
//! The `covcast` binary runs the REST server or drives the forecast service
//! directly against the configured model store.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use covcast_core::Config;

/// covcast - COVID case-count forecasting
#[derive(Parser, Debug)]
#[command(
    name = "covcast",
    author,
    version,
    about = "covcast - COVID case-count forecasting service",
    long_about = "covcast fits seasonal autoregressive models on public case-count datasets,\nkeeps the most recently used ones in memory and serves forecasts over REST."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Config file (defaults to ./covcast.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST server
    Serve {
        /// Address to bind (overrides config and COVCAST_ADDR)
        #[arg(long)]
        address: Option<SocketAddr>,
    },

    /// Fit and persist models for regions
    ///
    /// Downloads the full history of each region, fits a model and saves it
    /// to the model store. Without regions, every available region is trained.
    Train {
        /// Region codes (e.g. FRA, 59, 62)
        regions: Vec<String>,
    },

    /// Print a forecast for a region
    Predict {
        /// Region code
        #[arg(short, long, default_value = "FRA")]
        region: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD), defaults to start plus the configured horizon
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List persisted models
    Library {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Serve { address } => commands::serve::execute(config, address).await,
        Command::Train { regions } => commands::train::execute(&config, regions).await,
        Command::Predict { region, start, end, json } => {
            commands::predict::execute(&config, &region, start, end, json).await
        }
        Command::Library { json } => commands::library::execute(&config, json),
    }
}
