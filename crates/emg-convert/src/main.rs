//! CLI entry point for the EMG tools
//!
//! Convert a directory of `.mat` recordings to CSV:
//! ```bash
//! emg-convert convert recordings/ --recursive
//! ```
//!
//! Merge and preprocess two recordings:
//! ```bash
//! emg-convert process a.mat b.csv --output processed.csv --chart chart.json
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{AppConfig, ColumnPatterns, ProcessOutputs};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emg-convert")]
#[command(about = "Convert and preprocess EMG recordings", long_about = None)]
struct Cli {
    /// JSON file with adapter, table and processing settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every container in a directory into a sibling CSV file
    Convert {
        /// Directory to scan
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// File name fragment selecting containers (overrides the config file)
        #[arg(long)]
        extension: Option<String>,
    },

    /// Load one or more recordings, merge them and run the preprocessing chain
    Process {
        /// Input files (.mat containers or CSV)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Processed table output (CSV)
        #[arg(short, long)]
        output: PathBuf,

        /// Chart description output (JSON)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Quantile summary output (text)
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Substring identifying channel columns
        #[arg(long, default_value = "CH")]
        channel_pattern: String,

        /// Substring identifying the time column
        #[arg(long, default_value = "Timestamp")]
        time_pattern: String,

        /// Substring identifying the event column
        #[arg(long, default_value = "Event")]
        event_pattern: String,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            dir,
            recursive,
            extension,
        } => {
            if let Some(extension) = extension {
                config.adapter.extension = extension;
            }
            let report = commands::convert(&config, &dir, recursive)?;
            info!(
                converted = report.converted.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Done"
            );
        }
        Commands::Process {
            inputs,
            output,
            chart,
            summary,
            channel_pattern,
            time_pattern,
            event_pattern,
        } => {
            let patterns = ColumnPatterns {
                channel: channel_pattern,
                time: time_pattern,
                event: event_pattern,
            };
            let outputs = ProcessOutputs {
                table: output,
                chart,
                summary,
            };
            let processed = commands::process(&config, &inputs, &patterns, &outputs)?;
            println!("{}", processed);
        }
    }

    Ok(())
}
