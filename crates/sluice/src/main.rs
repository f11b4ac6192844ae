//! Sluice - Singer target for S3 data lakes
//!
//! Reads Singer messages from stdin, lands the records as Parquet objects
//! in S3, and prints the final checkpoint to stdout.
//!
//! # Usage
//!
//! ```bash
//! some-tap --config tap.json | sluice --config config.json
//! some-tap --config tap.json | sluice -c config.json -l debug
//! ```
//!
//! Stdout carries nothing but the checkpoint, so the output can be captured
//! by a pipeline runner; all diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use sluice_config::Config;
use sluice_target::Router;
use sluice_upload::{ObjectStore, Pipeline, S3Store};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sluice - Singer target for S3 data lakes
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let checkpoint = run(config).await?;
    if let Some(checkpoint) = checkpoint {
        println!("{checkpoint}");
    }

    Ok(())
}

/// Consume stdin to exhaustion and return the checkpoint to emit
async fn run(config: Config) -> Result<Option<Value>> {
    let store = S3Store::connect(&config).await;
    tracing::info!(bucket = %store.bucket(), "connected to object store");

    let pipeline = Pipeline::new(Arc::new(store) as Arc<dyn ObjectStore>, config.compression);
    let mut router = Router::new(config, pipeline);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let message = sluice_protocol::parse_message(&line)?;
        router.handle(message).await?;
    }

    let checkpoint = router.finish().await?;
    tracing::info!("all buffers flushed, exiting normally");
    Ok(checkpoint)
}

/// Initialize the tracing subscriber for logging
///
/// Stdout is reserved for the checkpoint, so everything goes to stderr.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}
