//! `soilguard-ingest`: subscribe to the soil telemetry topic and store readings
//!
//! Configuration comes from the environment (see [`IngestConfig::from_env`]),
//! plus `SOILGUARD_STORE` (`memory`, `sqlite:<path>` or `jsonl:<path>`,
//! default `sqlite:soilguard.db`). Logs go to stderr; set `RUST_LOG` to filter
//! and `SOILGUARD_LOG_JSON=1` for JSON lines.

use std::env;

use anyhow::Context;
use soilguard_connectors::{IngestConfig, IngestService};
use soilguard_store::{open_store, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_STORE: &str = "sqlite:soilguard.db";

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("SOILGUARD_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = IngestConfig::from_env().context("invalid ingest configuration")?;
    let store_uri = env::var("SOILGUARD_STORE").unwrap_or_else(|_| DEFAULT_STORE.to_string());
    let store_config = StoreConfig::from_uri(&store_uri)
        .with_context(|| format!("invalid SOILGUARD_STORE '{}'", store_uri))?;
    let store = open_store(&store_config).context("failed to open reading store")?;

    let mut service = IngestService::new(store);
    service.start(config).await.context("failed to start ingestion")?;

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    log::info!("Shutdown requested");

    service.stop().await;
    let stats = service.stats();
    log::info!(
        "Received {} messages: {} stored, {} rejected, {} undecodable, {} store failures, {} dropped",
        stats.messages_received,
        stats.messages_accepted,
        stats.rejections.total(),
        stats.decode_failures,
        stats.store_failures,
        stats.queue_drops
    );
    Ok(())
}
