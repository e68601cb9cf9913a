//! Connection Manager
//!
//! ## Task Layout
//!
//! ```text
//!   broker ──► network loop ──try_send──► bounded queue ──► worker ──spawn_blocking──► store
//!              (poll, subscribe,                            (decode, validate)
//!               reconnect backoff)
//! ```
//!
//! The network loop only polls the transport and hands payloads over. It never
//! waits on the worker: when the queue is full the newest payload is dropped
//! with a warning, so keep-alive traffic keeps flowing however slow the store
//! is. The worker handles one payload at a time, which keeps store writes in
//! broker delivery order.
//!
//! ## Lifecycle
//!
//! `start` spawns both tasks and returns. Connect failures are retried forever
//! with exponential backoff (`reconnect_delay_ms` doubling up to
//! `max_reconnect_delay_ms`, reset on every successful connect).
//!
//! `stop` signals the network loop, which unsubscribes, disconnects and drops
//! its queue sender. The worker then drains what was already queued and exits.
//! `stop` returns once both tasks are gone. Calling it again, or before
//! `start`, does nothing.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use soilguard_core::{IngestPipeline, PipelineError, SharedClock, SystemClock};
use soilguard_store::ReadingStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::IngestConfig;
use crate::stats::{ConnectionStats, IngestCounters};
use crate::transport::{Transport, TransportEvent};
use crate::ConnectorError;

/// Exponential reconnect delay
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, current: initial }
    }

    /// Delay to wait now; doubles the next one up to the cap
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.initial;
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    network: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Subscribes to the broker and feeds accepted readings into a store
pub struct IngestService {
    store: Arc<dyn ReadingStore>,
    clock: SharedClock,
    counters: Arc<IngestCounters>,
    running: Option<Running>,
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("backend", &self.store.backend())
            .field("running", &self.is_running())
            .finish()
    }
}

impl IngestService {
    /// Service writing to `store`, stamping readings with the system clock
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Service with an injected clock
    pub fn with_clock(store: Arc<dyn ReadingStore>, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            counters: Arc::new(IngestCounters::default()),
            running: None,
        }
    }

    /// Connect to the configured MQTT broker and start ingesting
    #[cfg(feature = "mqtt")]
    pub async fn start(&mut self, config: IngestConfig) -> Result<(), ConnectorError> {
        if self.running.is_some() {
            return Err(ConnectorError::AlreadyRunning);
        }
        let transport = crate::mqtt::MqttTransport::new(&config)?;
        self.start_with_transport(config, transport).await
    }

    /// Start ingesting from an already-built transport
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start_with_transport<T>(&mut self, config: IngestConfig, transport: T) -> Result<(), ConnectorError>
    where
        T: Transport + 'static,
    {
        if self.running.is_some() {
            return Err(ConnectorError::AlreadyRunning);
        }
        config.validate()?;

        let pipeline = IngestPipeline::with_clock(config.calibration, Arc::clone(&self.clock));
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            "Starting ingestion from {}:{} topic '{}' into {} store (raw_scale {}, spike ceiling {})",
            config.broker_host,
            config.broker_port,
            config.topic,
            self.store.backend(),
            config.calibration.raw_scale,
            config.calibration.spike_ceiling
        );

        let network = tokio::spawn(run_network(
            transport,
            config.topic.clone(),
            Backoff::new(config.reconnect_delay(), config.max_reconnect_delay()),
            queue_tx,
            shutdown_rx,
            Arc::clone(&self.counters),
        ));
        let worker = tokio::spawn(run_worker(
            queue_rx,
            pipeline,
            Arc::clone(&self.store),
            Arc::clone(&self.counters),
        ));

        self.running = Some(Running {
            shutdown: shutdown_tx,
            network,
            worker,
        });
        Ok(())
    }

    /// Stop ingesting; safe to call at any time, any number of times
    ///
    /// When this returns the network connection is closed and the worker has
    /// dropped its store handle. The store itself stays open: it belongs to the
    /// host, which closes it (and any connection pool) by dropping its last
    /// `Arc` along with this service.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(err) = running.network.await {
            error!("Network task ended abnormally: {}", err);
        }
        if let Err(err) = running.worker.await {
            error!("Ingest worker ended abnormally: {}", err);
        }

        info!("Ingest service stopped");
    }

    /// Whether `start` has been called without a matching `stop`
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ConnectionStats {
        self.counters.snapshot()
    }

    /// Store this service writes to
    pub fn store(&self) -> &Arc<dyn ReadingStore> {
        &self.store
    }
}

impl Drop for IngestService {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            // Tasks wind down on their own once signalled
            let _ = running.shutdown.send(true);
        }
    }
}

/// Wait out one backoff step; false when shutdown arrived first
async fn wait_before_reconnect(backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) -> bool {
    let delay = backoff.next_delay();
    info!("Reconnecting in {} ms", delay.as_millis());
    tokio::select! {
        biased;
        _ = shutdown.changed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn run_network<T: Transport>(
    mut transport: T,
    topic: String,
    mut backoff: Backoff,
    queue: mpsc::Sender<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<IngestCounters>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = transport.poll() => event,
        };

        match event {
            Ok(TransportEvent::Connected) => {
                info!("Connected to broker");
                counters.set_connected(true);
                backoff.reset();
                match transport.subscribe(&topic).await {
                    Ok(()) => info!("Subscribing to '{}'", topic),
                    Err(err) => {
                        error!("Subscribe to '{}' failed: {}", topic, err);
                        counters.set_last_error(err.to_string());
                    }
                }
            }
            Ok(TransportEvent::Subscribed { granted: true }) => info!("Subscribed to '{}'", topic),
            Ok(TransportEvent::Subscribed { granted: false }) => {
                error!("Broker refused subscription to '{}'", topic);
                counters.set_last_error(format!("subscription to '{}' refused", topic));
            }
            Ok(TransportEvent::Message { topic: from, payload }) => {
                counters.received();
                if let Err(err) = queue.try_send(payload) {
                    match err {
                        mpsc::error::TrySendError::Full(payload) => {
                            counters.queue_dropped();
                            warn!(
                                "Ingest queue full, dropping {}-byte message from '{}'",
                                payload.len(),
                                from
                            );
                        }
                        mpsc::error::TrySendError::Closed(_) => {
                            error!("Ingest worker is gone, closing connection");
                            break;
                        }
                    }
                }
            }
            Ok(TransportEvent::Disconnected) => {
                info!("Broker closed the connection");
                counters.set_connected(false);
                counters.reconnecting();
                if !wait_before_reconnect(&mut backoff, &mut shutdown).await {
                    break;
                }
            }
            Ok(TransportEvent::Idle) => {}
            Err(err) => {
                error!("Broker connection failed: {}", err);
                counters.set_connected(false);
                counters.set_last_error(err.to_string());
                counters.reconnecting();
                if !wait_before_reconnect(&mut backoff, &mut shutdown).await {
                    break;
                }
            }
        }
    }

    if let Err(err) = transport.unsubscribe(&topic).await {
        debug!("Unsubscribe from '{}' failed: {}", topic, err);
    }
    if let Err(err) = transport.disconnect().await {
        warn!("Disconnect failed: {}", err);
    }
    counters.set_connected(false);
    info!("Disconnected from broker");
}

async fn run_worker(
    mut queue: mpsc::Receiver<Vec<u8>>,
    pipeline: IngestPipeline,
    store: Arc<dyn ReadingStore>,
    counters: Arc<IngestCounters>,
) {
    while let Some(payload) = queue.recv().await {
        // Failures were already logged by the pipeline
        let reading = match pipeline.process(&payload) {
            Ok(reading) => reading,
            Err(PipelineError::Decode(_)) => {
                counters.decode_failed();
                continue;
            }
            Err(PipelineError::Rejected(reason)) => {
                counters.rejected(&reason);
                continue;
            }
        };

        let store = Arc::clone(&store);
        let write = tokio::task::spawn_blocking(move || store.append(&reading).map(|id| (id, reading)));
        match write.await {
            Ok(Ok((id, reading))) => {
                counters.accepted();
                debug!("Stored reading {} from node '{}'", id, reading.node_id());
            }
            Ok(Err(err)) => {
                error!("Failed to store reading: {}", err);
                counters.store_failed(err.to_string());
            }
            Err(err) => {
                error!("Store write task failed: {}", err);
                counters.store_failed(err.to_string());
            }
        }
    }

    debug!("Ingest worker drained");
}
