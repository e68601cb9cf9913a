//! Shared fixtures for store integration tests

#![allow(dead_code)]

use std::sync::Arc;

use soilguard_core::{Npk, Reading, ReadingParts, Timestamp};
use soilguard_store::{
    JsonLinesConfig, JsonLinesStore, MemoryStore, ReadingStore, SqliteConfig, SqliteStore,
};
use tempfile::TempDir;

/// Reading from `node01` with the given time and nitrogen value
pub fn reading(timestamp: Timestamp, nitrogen: i64) -> Reading {
    Reading::from_parts(ReadingParts {
        timestamp,
        node_id: "node01".into(),
        npk: Npk::new(nitrogen, 20, 15),
        ph: 6.5,
        moisture: 35.0,
        temperature: 21.0,
        ec: 1.2,
    })
}

/// A reading with every NPK channel at zero, as backfill may insert
pub fn zero_reading(timestamp: Timestamp) -> Reading {
    Reading::from_parts(ReadingParts {
        npk: Npk::default(),
        ..reading(timestamp, 0).into_parts()
    })
}

/// A store plus whatever keeps its files alive
pub struct Fixture {
    pub store: Arc<dyn ReadingStore>,
    _dir: Option<TempDir>,
}

/// One fresh instance of every backend
pub fn all_backends() -> Vec<Fixture> {
    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(&SqliteConfig::new(sqlite_dir.path().join("soil.db"))).unwrap();

    let jsonl_dir = tempfile::tempdir().unwrap();
    let jsonl = JsonLinesStore::open(&JsonLinesConfig::new(jsonl_dir.path().join("soil.jsonl"))).unwrap();

    vec![
        Fixture { store: Arc::new(MemoryStore::new()), _dir: None },
        Fixture { store: Arc::new(sqlite), _dir: Some(sqlite_dir) },
        Fixture { store: Arc::new(jsonl), _dir: Some(jsonl_dir) },
    ]
}
