//! layerkv batch binary
//!
//! Runs commands from a file or standard input and prints replies to stdout

use clap::Parser;
use layerkv::{logging, OutputFormat, Result, Session, SessionConfig, TransactionalStore};
use std::path::PathBuf;
use tokio::io::{self, AsyncBufRead, BufReader};
use tokio::signal;
use tracing::{error, info};

/// Transactional key-value store driven by a line protocol.
#[derive(Parser)]
#[command(name = "layerkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command file to execute (defaults to standard input)
    input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    logging::init_logging(&config.log_level)?;

    let reader: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => {
            info!(path = %path.display(), "reading commands from file");
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut session = Session::new(TransactionalStore::new(), config);

    // Setup graceful shutdown on SIGINT (Ctrl+C)
    let shutdown = session.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        info!("Received Ctrl+C, initiating graceful shutdown");
        if let Err(e) = shutdown.shutdown() {
            error!("Failed to initiate shutdown: {}", e);
        }
    });

    session.run(reader, io::stdout()).await?;

    Ok(())
}
