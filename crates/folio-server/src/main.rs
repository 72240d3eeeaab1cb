//! Folio server binary
//!
//! Starts the HTTP server. Secrets are read from the environment
//! (`FOLIO_REASONING_API_KEY`, `FOLIO_OCR_API_KEY`, and the `FOLIO_DRIVE_*`
//! variables for the drive backend).

use anyhow::Context;
use clap::Parser;
use folio_server::{config::FolioConfig, start_server};
use std::path::PathBuf;
use std::process;

/// Folio - document ingestion server
#[derive(Debug, Parser)]
#[command(name = "folio-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FolioConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            eprintln!("Warning: No config file specified, using defaults");
            eprintln!("Usage: folio-server --config <path-to-config.toml>");
            FolioConfig::default()
        }
    };

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    start_server(config).await?;
    Ok(())
}
