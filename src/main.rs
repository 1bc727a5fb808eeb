mod api;
mod cli;
mod config;
mod error;
mod models;
mod services;
mod store;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "scoreforge")]
#[command(about = "Exact-score football predictions from bookmaker odds")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict the exact score of one match
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(short, long)]
        date: String,
        /// Score odds as SCORE=COEF, e.g. 1-0=6.5
        #[arg(short, long, num_args = 1.., required = true)]
        odds: Vec<String>,
        /// Skip the enhanced predictor
        #[arg(long)]
        baseline_only: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Rank score odds without generating a stored prediction
    Analyze {
        #[arg(short, long, num_args = 1.., required = true)]
        odds: Vec<String>,
        #[arg(long)]
        enhanced_tiers: bool,
    },
    /// List the built-in team coefficient profiles
    Profiles,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                settings.port = port;
            }
            tracing::info!("Starting ScoreForge API server on port {}", settings.port);
            api::serve(&settings).await?;
        }
        Some(Commands::Predict { home, away, date, odds, baseline_only, seed }) => {
            if seed.is_some() {
                settings.seed = seed;
            }
            cli::predict_match(&settings, &home, &away, &date, &odds, baseline_only).await?;
        }
        Some(Commands::Analyze { odds, enhanced_tiers }) => {
            cli::analyze_odds(&odds, enhanced_tiers)?;
        }
        Some(Commands::Profiles) => cli::show_profiles(),
        None => {
            // Default to serving
            tracing::info!("Starting ScoreForge API server on port {}", settings.port);
            api::serve(&settings).await?;
        }
    }

    Ok(())
}
