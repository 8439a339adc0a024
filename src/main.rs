mod config;
mod connection;
mod filter;
mod mavlink;
mod metrics;

use std::sync::Arc;

use anyhow::Context;
use config::Config;
use connection::serial::SerialInterface;
use connection::udp::UdpInterface;
use connection::ConnectionPool;
use metrics::Metrics;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (before logging, so we can use config log level)
    let path = std::env::args()
        .nth(1)
        .context("usage: mav-gate <config.toml>")?;
    let config = Config::from_file(&path)?;

    // Initialize tracing with config log level (RUST_LOG env var overrides if set)
    let log_filter = std::env::var("RUST_LOG")
        .ok()
        .unwrap_or_else(|| config.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("mav-gate starting...");
    info!("Configuration loaded from {}:", path);
    info!("  Log level: {}", config.log_level);
    info!("  UDP endpoints: {}", config.udp.len());
    info!("  Serial devices: {}", config.serial.len());
    info!("  Filter chains: {}", config.chains.len());
    info!(
        "  Default policy: {}",
        if config.accept_by_default { "accept" } else { "reject" }
    );
    info!("  Address TTL: {}s", config.address_ttl_secs);
    info!("  Stats interval: {}s", config.stats_interval_secs);

    let filter = Arc::new(config.build_filter()?);
    let pool = Arc::new(ConnectionPool::new());
    let metrics = Metrics::new();

    if config.stats_interval_secs > 0 {
        metrics.clone().start_stats_logger(config.stats_interval_secs);
    } else {
        info!("Performance monitoring disabled (stats_interval_secs = 0)");
    }

    for serial_config in &config.serial {
        let interface = SerialInterface::new(
            serial_config,
            Arc::clone(&filter),
            Arc::clone(&pool),
            metrics.clone(),
            config.address_ttl(),
        )?;
        tokio::spawn(interface.run());
    }

    for udp_config in &config.udp {
        let interface = UdpInterface::bind(
            udp_config,
            Arc::clone(&filter),
            Arc::clone(&pool),
            metrics.clone(),
            config.address_ttl(),
        )
        .await?;
        tokio::spawn(interface.run());
    }

    info!("mav-gate ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    pool.close();

    Ok(())
}
