//! Log output of dropped messages
//!
//! Runs in its own test binary because it installs a global logger. Records are
//! tagged with the emitting thread so parallel tests do not see each other.

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use log::{Level, LevelFilter, Log, Metadata, Record};

use soilguard_core::{CalibrationConfig, FixedTime, IngestPipeline};

struct CapturingLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((
            thread::current().id(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger { records: Mutex::new(Vec::new()) };
static INIT: Once = Once::new();

fn install() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

fn captured() -> Vec<(Level, String)> {
    let me = thread::current().id();
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(id, _, _)| *id == me)
        .map(|(_, level, msg)| (*level, msg.clone()))
        .collect()
}

fn pipeline() -> IngestPipeline {
    IngestPipeline::with_clock(CalibrationConfig::default(), std::sync::Arc::new(FixedTime::new(0)))
}

#[test]
fn malformed_payload_logs_one_warning() {
    install();

    assert!(pipeline().process(b"N=800,P=200,K=150").is_err());

    let records = captured();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Level::Warn);
    assert!(records[0].1.contains("N=800,P=200,K=150"));
}

#[test]
fn long_payload_is_truncated_in_log() {
    install();

    let mut payload = b"{\"node_id\": \"".to_vec();
    payload.extend(std::iter::repeat(b'a').take(4_096));

    assert!(pipeline().process(&payload).is_err());

    let records = captured();
    assert_eq!(records.len(), 1);
    assert!(records[0].1.len() < 512);
    assert!(records[0].1.contains("..."));
}

#[test]
fn rejection_logs_reason_code() {
    install();

    assert!(pipeline().process(br#"{"nitrogen":10,"ph":14.5}"#).is_err());

    let records = captured();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Level::Warn);
    assert!(records[0].1.contains("invalid_ph"));
}

#[test]
fn accepted_reading_is_silent() {
    install();

    assert!(pipeline().process(br#"{"nitrogen":10}"#).is_ok());
    assert!(captured().is_empty());
}
