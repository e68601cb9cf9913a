//! Connection Manager behaviour against a scripted transport

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use soilguard_connectors::{ConnectorError, IngestService};
use soilguard_core::{CalibrationConfig, FixedTime};
use soilguard_store::{MemoryStore, ReadingStore};

use common::{config, payload, scripted, wait_until, within, FailingStore, GatedStore, TOPIC};

fn memory_service() -> (IngestService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = IngestService::with_clock(store.clone(), Arc::new(FixedTime::new(1_700_000_000_000)));
    (service, store)
}

#[tokio::test]
async fn subscribes_on_connect_and_stores_readings() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();

    service
        .start_with_transport(config().calibration(CalibrationConfig::default().raw_scale(0.1)), transport)
        .await
        .unwrap();

    script.connect();
    script.message(payload(800));

    wait_until("reading stored", || store.len() == 1).await;
    assert_eq!(script.log().subscriptions, vec![TOPIC.to_string()]);

    let latest = store.latest(true).unwrap().unwrap();
    assert_eq!(latest.reading.nitrogen(), 80);
    assert_eq!(latest.reading.timestamp(), 1_700_000_000_000);

    let stats = service.stats();
    assert!(stats.connected);
    assert_eq!(stats.messages_received, 1);
    assert_eq!(stats.messages_accepted, 1);

    within(service.stop()).await;
}

#[tokio::test]
async fn malformed_payload_writes_nothing() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    script.message(b"N=800 P=200 K=150".to_vec());
    script.message(payload(10));

    wait_until("valid reading stored", || store.len() == 1).await;
    let stats = service.stats();
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.messages_accepted, 1);
    assert_eq!(store.history(10).unwrap()[0].reading.nitrogen(), 10);

    within(service.stop()).await;
}

#[tokio::test]
async fn rejected_readings_are_counted_not_stored() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    script.message(br#"{"nitrogen":0,"phosphorus":0,"potassium":0}"#.to_vec());
    script.message(br#"{"nitrogen":10,"ph":14.5}"#.to_vec());
    script.message(br#"{"nitrogen":5000}"#.to_vec());
    script.message(payload(10));

    wait_until("valid reading stored", || store.len() == 1).await;
    let stats = service.stats();
    assert_eq!(stats.rejections.dead_sensor, 1);
    assert_eq!(stats.rejections.invalid_ph, 1);
    assert_eq!(stats.rejections.sensor_spike, 1);
    assert_eq!(stats.rejections.total(), 3);

    within(service.stop()).await;
}

#[tokio::test]
async fn reconnect_resubscribes_and_resumes() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    script.message(payload(1));
    wait_until("first reading", || store.len() == 1).await;

    script.drop_connection();
    script.fail("connection refused");
    script.connect();
    script.message(payload(2));

    wait_until("second reading", || store.len() == 2).await;
    assert_eq!(script.log().subscriptions, vec![TOPIC.to_string(), TOPIC.to_string()]);

    let stats = service.stats();
    assert_eq!(stats.reconnect_attempts, 2);
    assert!(stats.connected);
    assert_eq!(stats.last_error.as_deref(), Some("connection error: connection refused"));

    within(service.stop()).await;
}

#[tokio::test]
async fn failed_connects_count_as_reconnect_attempts() {
    let (mut service, _store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    for _ in 0..3 {
        script.fail("connection refused");
    }
    wait_until("three attempts", || service.stats().reconnect_attempts == 3).await;
    assert!(!service.stats().connected);

    within(service.stop()).await;
}

#[tokio::test]
async fn stop_releases_worker_store_handle() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    script.message(payload(1));
    wait_until("reading stored", || store.len() == 1).await;

    within(service.stop()).await;
    // Only the test and the service itself still hold the store
    assert_eq!(Arc::strong_count(&store), 2);

    drop(service);
    assert_eq!(Arc::strong_count(&store), 1);
}

#[tokio::test]
async fn preserves_delivery_order() {
    let (mut service, store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    for n in 1..=50 {
        script.message(payload(n));
    }

    wait_until("all readings stored", || store.len() == 50).await;

    // Same timestamp everywhere, so history order is id order
    let mut nitrogen: Vec<_> = store.history(50).unwrap().iter().map(|r| r.reading.nitrogen()).collect();
    nitrogen.reverse();
    assert_eq!(nitrogen, (1..=50).collect::<Vec<_>>());

    within(service.stop()).await;
}

#[tokio::test]
async fn store_failure_does_not_stop_ingestion() {
    let store = Arc::new(FailingStore::default());
    let mut service = IngestService::new(store.clone());
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    script.message(payload(1));
    script.message(payload(2));

    wait_until("both writes attempted", || store.attempts.load(Ordering::SeqCst) == 2).await;
    wait_until("failures counted", || service.stats().store_failures == 2).await;
    assert!(service.is_running());
    assert_eq!(service.stats().messages_accepted, 0);

    within(service.stop()).await;
}

#[tokio::test]
async fn full_queue_drops_newest() {
    let store = Arc::new(GatedStore::default());
    let mut service = IngestService::new(store.clone());
    let (transport, script) = scripted();
    service.start_with_transport(config().queue_capacity(1), transport).await.unwrap();

    script.connect();
    script.message(payload(1));
    wait_until("worker blocked in store", || store.entered.load(Ordering::SeqCst) == 1).await;

    // One fits in the queue, the next is dropped
    script.message(payload(2));
    script.message(payload(3));
    wait_until("messages received", || service.stats().messages_received == 3).await;
    assert_eq!(service.stats().queue_drops, 1);

    store.open_gate();
    wait_until("queued reading stored", || store.inner.len() == 2).await;

    let nitrogen: Vec<_> = store.history(10).unwrap().iter().map(|r| r.reading.nitrogen()).collect();
    assert!(!nitrogen.contains(&3));

    within(service.stop()).await;
}

#[tokio::test]
async fn stop_drains_queued_messages() {
    let store = Arc::new(GatedStore::default());
    let mut service = IngestService::new(store.clone());
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    for n in 1..=5 {
        script.message(payload(n));
    }
    wait_until("all received", || service.stats().messages_received == 5).await;

    let gate = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        gate.open_gate();
    });

    within(service.stop()).await;
    assert_eq!(store.inner.len(), 5);
    assert!(!service.is_running());
}

#[tokio::test]
async fn stop_unsubscribes_and_disconnects() {
    let (mut service, _store) = memory_service();
    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();

    script.connect();
    wait_until("subscribed", || script.log().subscriptions.len() == 1).await;

    within(service.stop()).await;
    let log = script.log();
    assert_eq!(log.unsubscriptions, vec![TOPIC.to_string()]);
    assert_eq!(log.disconnects, 1);
    assert!(!service.stats().connected);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (mut service, _store) = memory_service();

    // Never started
    within(service.stop()).await;

    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();
    within(service.stop()).await;
    within(service.stop()).await;

    assert_eq!(script.log().disconnects, 1);
}

#[tokio::test]
async fn stop_interrupts_reconnect_wait() {
    let (mut service, _store) = memory_service();
    let (transport, script) = scripted();
    service
        .start_with_transport(config().reconnect_delay_ms(60_000, 60_000), transport)
        .await
        .unwrap();

    script.fail("broker unreachable");
    wait_until("reconnect pending", || service.stats().reconnect_attempts == 1).await;

    within(service.stop()).await;
    assert!(!service.is_running());
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let (mut service, _store) = memory_service();
    let (first, _script) = scripted();
    let (second, _unused) = scripted();

    service.start_with_transport(config(), first).await.unwrap();
    assert_eq!(
        service.start_with_transport(config(), second).await,
        Err(ConnectorError::AlreadyRunning)
    );

    within(service.stop()).await;
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let (mut service, _store) = memory_service();
    let (transport, _script) = scripted();

    let bad = config().calibration(CalibrationConfig::default().raw_scale(-1.0));
    assert!(matches!(
        service.start_with_transport(bad, transport).await,
        Err(ConnectorError::ConfigError(_))
    ));
    assert!(!service.is_running());
}

#[tokio::test]
async fn restart_with_new_calibration() {
    let (mut service, store) = memory_service();

    let (transport, script) = scripted();
    service.start_with_transport(config(), transport).await.unwrap();
    script.connect();
    script.message(payload(800));
    wait_until("first reading", || store.len() == 1).await;
    within(service.stop()).await;

    let (transport, script) = scripted();
    service
        .start_with_transport(config().calibration(CalibrationConfig::default().raw_scale(0.1)), transport)
        .await
        .unwrap();
    script.connect();
    script.message(payload(800));
    wait_until("second reading", || store.len() == 2).await;

    let nitrogen: Vec<_> = store.history(2).unwrap().iter().map(|r| r.reading.nitrogen()).collect();
    assert_eq!(nitrogen, vec![80, 800]);

    within(service.stop()).await;
}
