use anyhow::Result;
use beacon_server::config::MonitoringConfig;
use beacon_server::{logging, MonitoringService};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

const DEFAULT_CONFIG_PATH: &str = "config/beacon.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  beacon [config.toml]    Start monitoring (default: {DEFAULT_CONFIG_PATH})");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }
    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);

    let config_found = Path::new(config_path).exists();
    let config = if config_found {
        MonitoringConfig::load(config_path)?
    } else {
        MonitoringConfig::default()
    };

    logging::init(&config.logging)?;
    beacon_common::id::init(1, 1);
    if !config_found {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
    }

    let service = Arc::new(MonitoringService::new(config)?);

    if let Some(mut notifications) = service.take_notifications() {
        tokio::spawn(async move {
            while let Some(message) = notifications.recv().await {
                tracing::info!(
                    channel = %message.channel,
                    phase = %message.notice.phase,
                    rule_id = %message.notice.event.rule_id,
                    "{}",
                    message.notice.headline()
                );
            }
        });
    }

    service.start()?;
    tracing::info!(
        rules = service.get_all_alert_rules().len(),
        checkers = service.health_checker_names().len(),
        "Beacon started"
    );

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    service.shutdown();

    let stats = service.get_stats();
    tracing::info!(
        metrics_recorded = stats.metrics_recorded,
        alerts_triggered = stats.alerts_triggered,
        "Beacon stopped"
    );
    Ok(())
}
