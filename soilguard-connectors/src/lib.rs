//! Broker Connectivity for Soil Telemetry Ingestion
//!
//! ## Overview
//!
//! Field nodes publish one JSON object per reading to a topic on an MQTT
//! broker. This crate keeps a subscription to that topic alive for as long as
//! the host process runs and pushes every message through decode, validation
//! and storage.
//!
//! ## Why MQTT?
//!
//! Soil nodes sit on farm WiFi or cellular links that drop for minutes at a
//! time. MQTT fits that well:
//!
//! - Header overhead: 2-5 bytes minimum
//! - One long-lived connection per node instead of a handshake per reading
//! - Topic hierarchy (`farm/soil/<node>/data`) lets one ingest service follow
//!   one node or, with a wildcard, all of them
//!
//! ## Connector Design Patterns
//!
//! ### 1. Never Block the Network Loop
//!
//! Keep-alive pings must go out on time or the broker drops the session. The
//! network loop therefore only polls and enqueues. Decoding, validation and
//! the (possibly slow) store write happen on a separate worker:
//!
//! ```text
//! if queue.try_send(payload).is_err() {
//!     drop(payload);            // newest loses, keep-alive wins
//!     stats.queue_drops += 1;
//! }
//! ```
//!
//! ### 2. Retry Logic
//!
//! Exponential backoff, reset on every successful connect:
//! ```text
//! retry_delay = min(reconnect_delay * 2^attempt, max_reconnect_delay)
//! ```
//! There is no retry limit. A broker outage is something to wait out, not a
//! reason to exit.
//!
//! ### 3. Resubscribe on Every Connect
//!
//! Sessions are clean, so the broker forgets subscriptions when the connection
//! drops. The service subscribes again each time the transport reports
//! `Connected`.
//!
//! ## Security Considerations
//!
//! - Username/password authentication via `MQTT_USERNAME` / `MQTT_PASSWORD`
//! - Credentials are never serialized back out of [`IngestConfig`]
//! - Never hard-code credentials
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use soilguard_connectors::{IngestConfig, IngestService};
//! use soilguard_store::{open_store, StoreConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IngestConfig::from_env()?;
//! let store = open_store(&StoreConfig::from_uri("sqlite:/var/lib/soilguard/soil.db")?)?;
//!
//! let mut service = IngestService::new(Arc::clone(&store));
//! service.start(config).await?;
//!
//! // ... run until shutdown ...
//!
//! service.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod service;
pub mod stats;
pub mod transport;

// Re-export common types
pub use config::IngestConfig;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;
pub use service::IngestService;
pub use stats::{ConnectionStats, RejectionCounts};
pub use transport::{Transport, TransportError, TransportEvent};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// `start` called on a running service
    #[error("Already running")]
    AlreadyRunning,

    /// Configuration rejected before connecting
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
