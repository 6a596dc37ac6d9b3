//! GSM Channel Service (`gsmsrv`)
//!
//! Standalone runner for the GSM channel. When embedded next to the alarm
//! engine, register the engine via [`gsmsrv::GsmChannel::set_alarm`] instead;
//! this binary wires a tracing-backed audit notifier only, so inbound SMS
//! commands are logged and ignored.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use tracing::info;

use gsmsrv::transport::SerialTransport;
use gsmsrv::{GsmChannel, GsmConfig, NotificationHandler, Severity};

#[derive(Parser, Debug)]
#[command(name = "gsmsrv", about = "GSM notification and command channel")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/gsmsrv.yaml", env = "GSMSRV_CONFIG")]
    config: String,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,
}

/// Audit notifier that mirrors every notification into the service log.
struct LogNotifier;

#[async_trait]
impl NotificationHandler for LogNotifier {
    async fn notify(&self, source: &str, message: &str, severity: Severity) {
        info!("[{severity}] {source}: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = GsmConfig::load(&args.config)?;
    if args.validate {
        info!("Configuration valid: {}", args.config);
        return Ok(());
    }

    info!("Starting GSM channel service");
    if config.contacts.is_empty() {
        tracing::warn!("No contacts configured: commands and notifications are disabled");
    }

    let transport = SerialTransport::new(&config.device, config.baud_rate, config.read_timeout());

    let mut channel = GsmChannel::new(config);
    channel.set_notifier(Arc::new(LogNotifier));

    let worker = channel.spawn(transport);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    channel.stop();
    worker.await?;

    Ok(())
}
