//! MQTT transport over rumqttc
//!
//! rumqttc splits a connection into an [`AsyncClient`] (requests) and an
//! [`EventLoop`] (network I/O). The transport owns both. Requests are queued
//! with the non-blocking `try_*` calls so they never wait on the same task that
//! has to poll them out.
//!
//! Sessions are clean: the broker forgets subscriptions on disconnect, and the
//! service subscribes again on every `Connected`. After a connection error the
//! next `poll` starts a fresh connect attempt.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode};

use crate::config::IngestConfig;
use crate::transport::{Transport, TransportError, TransportEvent};
use crate::ConnectorError;

/// Requests buffered between client and event loop
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// How long `disconnect` waits for the DISCONNECT packet to go out
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// rumqttc-backed [`Transport`]
pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    qos: QoS,
    connected: bool,
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("qos", &self.qos)
            .field("connected", &self.connected)
            .finish()
    }
}

impl MqttTransport {
    /// Build a transport; nothing touches the network until the first poll
    pub fn new(config: &IngestConfig) -> Result<Self, ConnectorError> {
        config.validate()?;

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);
        if let Some(username) = &config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            eventloop,
            qos: qos_from_level(config.qos)?,
            connected: false,
        })
    }
}

fn qos_from_level(level: u8) -> Result<QoS, ConnectorError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ConnectorError::ConfigError(format!("invalid qos {}", other))),
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn poll(&mut self) -> Result<TransportEvent, TransportError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                self.connected = true;
                Ok(TransportEvent::Connected)
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => Ok(TransportEvent::Subscribed {
                granted: ack
                    .return_codes
                    .iter()
                    .all(|code| !matches!(code, SubscribeReasonCode::Failure)),
            }),
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(TransportEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.connected = false;
                Ok(TransportEvent::Disconnected)
            }
            Ok(_) => Ok(TransportEvent::Idle),
            Err(err) => {
                self.connected = false;
                Err(TransportError::Connection(err.to_string()))
            }
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.client
            .try_subscribe(topic, self.qos)
            .map_err(|e| TransportError::Request(e.to_string()))
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Ok(());
        }
        self.client
            .try_unsubscribe(topic)
            .map_err(|e| TransportError::Request(e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Ok(());
        }
        self.client
            .try_disconnect()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        // Queued requests only reach the broker while the event loop is polled
        let eventloop = &mut self.eventloop;
        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                    Ok(event) => debug!("Flushing before disconnect: {:?}", event),
                    Err(err) => return Err(TransportError::Connection(err.to_string())),
                }
            }
        };

        let result = tokio::time::timeout(DISCONNECT_TIMEOUT, flush)
            .await
            .map_err(|_| TransportError::Timeout)?;
        self.connected = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_qos_levels() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert!(qos_from_level(3).is_err());
    }

    #[tokio::test]
    async fn disconnect_before_connect_is_noop() {
        let mut transport = MqttTransport::new(&IngestConfig::default()).unwrap();
        assert!(transport.unsubscribe("farm/soil/node01/data").await.is_ok());
        assert!(transport.disconnect().await.is_ok());
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(MqttTransport::new(&IngestConfig::default().queue_capacity(0)).is_err());
    }
}
