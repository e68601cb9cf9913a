//! Broker transport abstraction
//!
//! The ingest service never talks to a broker library directly. It drives a
//! [`Transport`]: poll for the next event, subscribe after every connect,
//! unsubscribe and disconnect on the way out. Reconnecting after a lost
//! connection is the transport's job on its next `poll`; the service only
//! decides how long to wait before polling again.

use async_trait::async_trait;
use thiserror::Error;

/// Something that happened on the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Session established; subscriptions from earlier sessions may be gone
    Connected,

    /// Broker answered a subscribe request
    Subscribed {
        /// False when the broker refused the topic
        granted: bool,
    },

    /// Application message on a subscribed topic
    Message {
        /// Topic the message was published to
        topic: String,
        /// Raw payload bytes
        payload: Vec<u8>,
    },

    /// Broker closed the session
    Disconnected,

    /// Protocol traffic with nothing for the service to do (pings, acks)
    Idle,
}

/// Transport failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connect attempt failed or the connection dropped
    #[error("connection error: {0}")]
    Connection(String),

    /// A request could not be queued to the broker
    #[error("request error: {0}")]
    Request(String),

    /// Operation did not complete in time
    #[error("transport timed out")]
    Timeout,
}

/// Connection to a publish/subscribe broker
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next event, connecting or reconnecting as needed
    ///
    /// Must be cancel safe: the service drops a pending `poll` on shutdown.
    async fn poll(&mut self) -> Result<TransportEvent, TransportError>;

    /// Request a subscription to `topic`
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Drop the subscription to `topic`
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Close the connection and release its resources
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
