//! Reading Persistence for SoilGuard
//!
//! ## Overview
//!
//! Accepted readings are written once and never changed. The store keeps them
//! in arrival order and answers the two questions dashboards ask: what is the
//! newest reading, and what are the last N.
//!
//! ## Design Philosophy
//!
//! ### One Capability, Many Backends
//!
//! Deployments have kept soil readings in a document store, in a relational
//! database and in flat files on the node itself. The [`ReadingStore`] trait
//! is the only thing the rest of the system sees; the backend is picked from
//! [`StoreConfig`] at startup.
//!
//! | Backend | Durability | Concurrent reads during write |
//! |---------|------------|-------------------------------|
//! | [`MemoryStore`] | none | yes (RwLock) |
//! | [`SqliteStore`] | WAL + fsync | yes (read connection pool) |
//! | [`JsonLinesStore`] | fsync per line | yes (readers reopen the file) |
//!
//! ### Single Writer, Many Readers
//!
//! Exactly one ingest worker appends. Any number of query handlers read at the
//! same time. No backend keeps a mutable cache shared between the two sides,
//! so a reader sees either a whole reading or nothing.
//!
//! ### No Retries Here
//!
//! `append` reports failure and returns. The caller decides; for telemetry the
//! caller logs and drops, since the next reading arrives within seconds.
//!
//! ## Ordering
//!
//! `latest` and `history` order by ingestion timestamp, newest first, with the
//! generated id as tiebreaker. Ids increase with every append.
//!
//! ## Example
//!
//! ```rust
//! use soilguard_store::{MemoryStore, ReadingStore};
//! use soilguard_core::{Npk, Reading, ReadingParts};
//!
//! let store = MemoryStore::new();
//! let reading = Reading::from_parts(ReadingParts {
//!     timestamp: 1_700_000_000_000,
//!     node_id: "node01".into(),
//!     npk: Npk::new(80, 20, 15),
//!     ph: 6.5,
//!     moisture: 35.0,
//!     temperature: 21.0,
//!     ec: 1.2,
//! });
//!
//! let id = store.append(&reading)?;
//! assert_eq!(store.latest(true)?.map(|r| r.id), Some(id));
//! # Ok::<(), soilguard_store::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use core::fmt;

use serde::{Deserialize, Serialize};
use soilguard_core::Reading;

pub mod config;
pub mod errors;
pub mod jsonl;
pub mod memory;
pub mod query;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{open_store, StoreConfig};
pub use errors::{QueryError, StoreError, StoreResult};
pub use jsonl::{JsonLinesConfig, JsonLinesStore};
pub use memory::MemoryStore;
pub use query::{QueryLimits, QueryService};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteStore};

/// Identifier assigned to a reading when it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub u64);

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reading together with its storage identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Generated identifier
    pub id: ReadingId,

    /// The reading as accepted
    #[serde(flatten)]
    pub reading: Reading,
}

impl StoredReading {
    /// Sort key: newest first means descending on this
    pub fn order_key(&self) -> (u64, ReadingId) {
        (self.reading.timestamp(), self.id)
    }
}

/// Append-only reading storage
///
/// Implementations must allow `latest` and `history` to run on other threads
/// while an `append` is in flight. All methods may block on I/O; async callers
/// run them on a blocking pool.
pub trait ReadingStore: Send + Sync {
    /// Persist one reading and return its new id
    fn append(&self, reading: &Reading) -> StoreResult<ReadingId>;

    /// Most recent reading
    ///
    /// With `require_nonzero_npk` set, readings whose N, P and K are all zero
    /// are skipped. Those can only arrive through paths that bypass the
    /// validator, such as backfill.
    fn latest(&self, require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>>;

    /// Up to `limit` readings, newest first
    fn history(&self, limit: usize) -> StoreResult<Vec<StoredReading>>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
