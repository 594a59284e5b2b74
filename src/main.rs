use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use sqlsink_lib::channel::StdinChannel;
use sqlsink_lib::db::SqlxSession;
use sqlsink_lib::security::redact_sensitive_text;
use sqlsink_lib::{SinkConfig, SqlSink};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Reads delimited records from standard input and writes them to SQL tables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Overrides `batch.size` from the configuration
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = SinkConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    let settings = config.validate().context("invalid configuration")?;

    info!(
        "Writing to {} ({}), batch size {}",
        redact_sensitive_text(&settings.connection.url),
        settings.connection.db_type.as_str(),
        settings.batch_size
    );

    let session = SqlxSession::connect(settings.connection.clone())
        .await
        .context("connecting to the database")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing the current batch");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for interrupts: {}", e),
        }
    });

    let mut sink = SqlSink::new(settings, StdinChannel::spawn(), session);
    let stats = sink.run(shutdown_rx).await?;

    info!("Sink {} finished: {}", sink.id(), serde_json::to_string(&stats)?);
    Ok(())
}
