//! Driftwatch Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - DRIFTWATCH_HOST: Bind address (default: 0.0.0.0)
//! - DRIFTWATCH_PORT: Port number (default: 3000)
//! - DRIFTWATCH_CACHE_TTL_SECS: Cache lifetime for model info and EDA data (default: 300)
//! - RUST_LOG: Log level (default: info)
//!
//! Backend:
//! - DRIFTWATCH_BACKEND_URL: Serving backend base URL (default: http://127.0.0.1:8000)
//! - DRIFTWATCH_BACKEND_TIMEOUT_SECS: Request timeout (default: none)
//!
//! Drift alerts (all editable at runtime via PUT /alerts/config):
//! - DRIFTWATCH_ALERTS_ENABLED: Start polling on boot (default: false)
//! - DRIFTWATCH_ALERT_THRESHOLD: Drift threshold (default: 2.0)
//! - DRIFTWATCH_CHECK_INTERVAL_SECS: Polling interval (default: 60)
//! - DRIFTWATCH_NOTIFY_ON_DRIFT: Record and notify detected drift (default: true)
//! - DRIFTWATCH_AUTO_BASELINE: Set a baseline when none exists (default: false)
//! - DRIFTWATCH_WEBHOOKS: Comma-separated webhook URLs notified on drift

use driftwatch::alerts::{AlertConfig, NotifyTarget};
use driftwatch::api::{run_server, ServerConfig};
use driftwatch::backend::BackendConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse basic configuration from environment
    let host = std::env::var("DRIFTWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("DRIFTWATCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let cache_ttl_secs = std::env::var("DRIFTWATCH_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);

    let config = ServerConfig {
        host,
        port,
        backend: BackendConfig::from_env(),
        alerts: AlertConfig::from_env(),
        notify_targets: NotifyTarget::from_env(),
        cache_ttl_secs,
    };

    tracing::info!("Driftwatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Backend: {}", config.backend.base_url);
    match config.backend.timeout {
        Some(timeout) => tracing::info!("  Backend timeout: {} seconds", timeout.as_secs()),
        None => tracing::info!("  Backend timeout: none"),
    }
    tracing::info!("  Cache TTL: {} seconds", config.cache_ttl_secs);
    tracing::info!(
        "  Alerts: {} (threshold {}, every {} seconds)",
        if config.alerts.enabled { "ENABLED" } else { "DISABLED" },
        config.alerts.threshold,
        config.alerts.check_interval_seconds
    );
    tracing::info!("  Auto baseline: {}", config.alerts.auto_set_baseline);
    tracing::info!("  Notify targets: {}", config.notify_targets.len());
    for target in &config.notify_targets {
        if let NotifyTarget::Webhook { url, .. } = target {
            tracing::info!("    - webhook @ {}", url);
        }
    }

    println!(
        r#"
      _      _  __ _                    _       _
   __| |_ __(_)/ _| |___      ____ _| |_ ___| |__
  / _` | '__| | |_| __\ \ /\ / / _` | __/ __| '_ \
 | (_| | |  | |  _| |_ \ V  V / (_| | || (__| | | |
  \__,_|_|  |_|_|  \__| \_/\_/ \__,_|\__\___|_| |_|

 Model Serving Dashboard & Drift Watcher
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
