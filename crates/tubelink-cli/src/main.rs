//! Tubelink CLI - Bridge protocol toolkit
//!
//! Features:
//! - Encode host method calls into player driver scripts
//! - Decode raw player event payloads
//! - Replay recorded sessions through the readiness state machine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Tubelink CLI - Embedded player bridge toolkit
#[derive(Parser)]
#[command(name = "tubelink")]
#[command(version)]
#[command(about = "Inspect and replay embedded player bridge traffic", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Bridge configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a host method call into driver scripts
    Encode {
        /// Method name (initialize, play, seekTo, ...)
        method: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Decode a raw player event payload
    Decode {
        /// Payload as JSON, e.g. '{"event":"onStateChange","state":1}'
        payload: String,
    },

    /// Replay a JSON-lines session script
    Replay {
        /// Script file: one {"call": {...}} or {"event": {...}} per line
        script: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    tubelink_core::init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encode { method, args } => {
            commands::encode(&method, args.as_deref(), &config, &cli.format)?;
        }
        Commands::Decode { payload } => {
            commands::decode(&payload, &cli.format)?;
        }
        Commands::Replay { script } => {
            commands::replay(&script, config, &cli.format)?;
        }
    }

    Ok(())
}
