//! Ingest configuration
//!
//! Loaded once by the host before `start()`, never changed while running.
//! Recalibrating or moving to another broker means `stop()` and `start()` with
//! a new value.
//!
//! ## Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `MQTT_BROKER` | `broker_host` |
//! | `MQTT_PORT` | `broker_port` |
//! | `MQTT_TOPIC` | `topic` |
//! | `MQTT_CLIENT_ID` | `client_id` |
//! | `MQTT_USERNAME` / `MQTT_PASSWORD` | credentials |
//! | `SOIL_RAW_SCALE` | `calibration.raw_scale` |
//! | `SOIL_SPIKE_CEILING` | `calibration.spike_ceiling` |
//! | `INGEST_QUEUE_CAPACITY` | `queue_capacity` |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use soilguard_core::CalibrationConfig;

use crate::ConnectorError;

/// Default broker host
pub const DEFAULT_BROKER_HOST: &str = "localhost";
/// Default broker port (plain MQTT)
pub const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default telemetry topic
pub const DEFAULT_TOPIC: &str = "farm/soil/node01/data";
/// Default client identifier
pub const DEFAULT_CLIENT_ID: &str = "soilguard-ingest";

/// Broker, queue and calibration settings for one ingest service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Broker hostname or address
    #[serde(default = "default_broker_host")]
    pub broker_host: String,

    /// Broker port
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,

    /// Topic carrying sensor payloads
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Client identifier presented to the broker
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Username, if the broker requires one
    #[serde(default)]
    pub username: Option<String>,

    /// Password for `username`
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Subscription QoS (0, 1 or 2)
    #[serde(default)]
    pub qos: u8,

    /// Payloads buffered between the network loop and the worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// First reconnect delay (ms)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Reconnect delay cap (ms)
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Calibration applied by the validator
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

fn default_broker_host() -> String {
    DEFAULT_BROKER_HOST.to_string()
}

const fn default_broker_port() -> u16 {
    DEFAULT_BROKER_PORT
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

const fn default_keep_alive_secs() -> u64 {
    60
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_reconnect_delay_ms() -> u64 {
    1_000
}

const fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT, DEFAULT_TOPIC)
    }
}

impl IngestConfig {
    /// Create configuration for one broker and topic
    pub fn new(broker_host: impl Into<String>, broker_port: u16, topic: impl Into<String>) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port,
            topic: topic.into(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
            username: None,
            password: None,
            qos: 0,
            queue_capacity: default_queue_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            calibration: CalibrationConfig::default(),
        }
    }

    /// Set client identifier
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set username/password authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Set subscription QoS
    pub fn qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    /// Set queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set first and maximum reconnect delay in milliseconds
    pub fn reconnect_delay_ms(mut self, initial: u64, max: u64) -> Self {
        self.reconnect_delay_ms = initial;
        self.max_reconnect_delay_ms = max;
        self
    }

    /// Set calibration
    pub fn calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// First reconnect delay
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Reconnect delay cap
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConnectorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConnectorError> {
        let mut config = Self::default();

        if let Some(host) = lookup("MQTT_BROKER") {
            config.broker_host = host;
        }
        if let Some(port) = parse_var(&lookup, "MQTT_PORT")? {
            config.broker_port = port;
        }
        if let Some(topic) = lookup("MQTT_TOPIC") {
            config.topic = topic;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.client_id = client_id;
        }
        config.username = lookup("MQTT_USERNAME");
        config.password = lookup("MQTT_PASSWORD");
        if let Some(scale) = parse_var(&lookup, "SOIL_RAW_SCALE")? {
            config.calibration.raw_scale = scale;
        }
        if let Some(ceiling) = parse_var(&lookup, "SOIL_SPIKE_CEILING")? {
            config.calibration.spike_ceiling = ceiling;
        }
        if let Some(capacity) = parse_var(&lookup, "INGEST_QUEUE_CAPACITY")? {
            config.queue_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.broker_host.trim().is_empty() {
            return Err(ConnectorError::ConfigError("broker_host must not be empty".into()));
        }
        if self.broker_port == 0 {
            return Err(ConnectorError::ConfigError("broker_port must not be zero".into()));
        }
        if self.topic.trim().is_empty() {
            return Err(ConnectorError::ConfigError("topic must not be empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(ConnectorError::ConfigError("client_id must not be empty".into()));
        }
        if self.qos > 2 {
            return Err(ConnectorError::ConfigError(format!("qos must be 0, 1 or 2, got {}", self.qos)));
        }
        if self.queue_capacity == 0 {
            return Err(ConnectorError::ConfigError("queue_capacity must be greater than zero".into()));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ConnectorError::ConfigError("reconnect_delay_ms must be greater than zero".into()));
        }
        if self.max_reconnect_delay_ms < self.reconnect_delay_ms {
            return Err(ConnectorError::ConfigError(
                "max_reconnect_delay_ms must not be smaller than reconnect_delay_ms".into(),
            ));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConnectorError::ConfigError("password given without username".into()));
        }
        self.calibration
            .validate()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConnectorError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConnectorError::ConfigError(format!("{}='{}': {}", name, raw, e))),
    }
}
