//! Test transports and stores for the ingest service
//!
//! No broker is involved: a [`ScriptedTransport`] replays whatever events the
//! test pushes through its [`ScriptHandle`] and records the requests the
//! service makes.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use soilguard_connectors::{IngestConfig, Transport, TransportError, TransportEvent};
use soilguard_core::Reading;
use soilguard_store::{MemoryStore, ReadingId, ReadingStore, StoreError, StoreResult, StoredReading};
use tokio::sync::mpsc;

pub const TOPIC: &str = "farm/soil/node01/data";

/// Requests the service made of the transport
#[derive(Debug, Default, Clone)]
pub struct TransportLog {
    pub subscriptions: Vec<String>,
    pub unsubscriptions: Vec<String>,
    pub disconnects: usize,
}

pub struct ScriptedTransport {
    events: mpsc::UnboundedReceiver<Result<TransportEvent, TransportError>>,
    log: Arc<Mutex<TransportLog>>,
}

#[derive(Clone)]
pub struct ScriptHandle {
    events: mpsc::UnboundedSender<Result<TransportEvent, TransportError>>,
    log: Arc<Mutex<TransportLog>>,
}

pub fn scripted() -> (ScriptedTransport, ScriptHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = Arc::new(Mutex::new(TransportLog::default()));
    (
        ScriptedTransport { events: rx, log: Arc::clone(&log) },
        ScriptHandle { events: tx, log },
    )
}

impl ScriptHandle {
    pub fn connect(&self) {
        self.push(Ok(TransportEvent::Connected));
    }

    pub fn message(&self, payload: impl Into<Vec<u8>>) {
        self.push(Ok(TransportEvent::Message {
            topic: TOPIC.to_string(),
            payload: payload.into(),
        }));
    }

    pub fn drop_connection(&self) {
        self.push(Ok(TransportEvent::Disconnected));
    }

    pub fn fail(&self, reason: &str) {
        self.push(Err(TransportError::Connection(reason.to_string())));
    }

    pub fn log(&self) -> TransportLog {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, event: Result<TransportEvent, TransportError>) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn poll(&mut self) -> Result<TransportEvent, TransportError> {
        match self.events.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.log.lock().unwrap().subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.log.lock().unwrap().unsubscriptions.push(topic.to_string());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.log.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

/// Config with fast reconnects for tests
pub fn config() -> IngestConfig {
    IngestConfig::new("localhost", 1883, TOPIC).reconnect_delay_ms(5, 20)
}

pub fn payload(nitrogen: i64) -> Vec<u8> {
    format!(
        r#"{{"node_id":"node01","nitrogen":{},"phosphorus":20,"potassium":15,"ph":6.5,"moisture":35.0}}"#,
        nitrogen
    )
    .into_bytes()
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Run `future` with a two second limit
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("operation timed out")
}

/// Store whose every write fails
#[derive(Debug, Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
}

impl ReadingStore for FailingStore {
    fn append(&self, _reading: &Reading) -> StoreResult<ReadingId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    fn latest(&self, _require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>> {
        Ok(None)
    }

    fn history(&self, _limit: usize) -> StoreResult<Vec<StoredReading>> {
        Ok(Vec::new())
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Memory store whose writes block until the gate opens
#[derive(Debug, Default)]
pub struct GatedStore {
    pub inner: MemoryStore,
    pub entered: AtomicUsize,
    open: Mutex<bool>,
    opened: Condvar,
}

impl GatedStore {
    pub fn open_gate(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl ReadingStore for GatedStore {
    fn append(&self, reading: &Reading) -> StoreResult<ReadingId> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.append(reading)
    }

    fn latest(&self, require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>> {
        self.inner.latest(require_nonzero_npk)
    }

    fn history(&self, limit: usize) -> StoreResult<Vec<StoredReading>> {
        self.inner.history(limit)
    }

    fn backend(&self) -> &'static str {
        "gated"
    }
}
