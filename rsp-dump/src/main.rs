use anyhow::Context;
use clap::Parser;
use rsp_dump::config::{Args, Config};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Log to stdout, and append to the configured log file as well
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut open_error = None;
    let file_layer = config.log_file().and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            ),
            Err(e) => {
                open_error = Some(format!("cannot open log file {}: {}", path.display(), e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if let Some(message) = open_error {
        tracing::warn!("{}", message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args
        .load_config()
        .with_context(|| format!("loading {}", args.config_file.display()))?;
    init_logging(&config);
    // Config::load warned before a subscriber existed
    if !args.config_file.exists() {
        tracing::warn!("{} not found, using default configuration", args.config_file.display());
    }
    tracing::info!(listen = %config.listen, registry = %config.registry_file.display(), "Starting");

    let relay = config.build_relay().context("building relay")?;
    config.build_listener(relay).start().await?;
    Ok(())
}
