//! Backend selection
//!
//! The backend is deployment data. Hosts deserialize a [`StoreConfig`] from
//! their own configuration, or parse the short URI form used on the command
//! line and in environment variables:
//!
//! | URI | Backend |
//! |-----|---------|
//! | `memory` | [`MemoryStore`](crate::MemoryStore) |
//! | `sqlite:<path>` | [`SqliteStore`](crate::SqliteStore) |
//! | `jsonl:<path>` | [`JsonLinesStore`](crate::JsonLinesStore) |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::jsonl::{JsonLinesConfig, JsonLinesStore};
use crate::memory::MemoryStore;
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteConfig, SqliteStore};
use crate::{ReadingStore, StoreError, StoreResult};

/// Which backend to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Volatile in-process store
    Memory,

    /// SQLite database file
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConfig),

    /// JSON Lines file
    JsonLines(JsonLinesConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl StoreConfig {
    /// Parse the short URI form
    pub fn from_uri(uri: &str) -> StoreResult<Self> {
        let uri = uri.trim();
        if uri == "memory" {
            return Ok(Self::Memory);
        }

        let (scheme, path) = uri
            .split_once(':')
            .ok_or_else(|| StoreError::Invalid(format!("unrecognised store '{}'", uri)))?;
        if path.is_empty() {
            return Err(StoreError::Invalid(format!("store '{}' needs a path", scheme)));
        }

        match scheme {
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Self::Sqlite(SqliteConfig::new(path))),
            "jsonl" => Ok(Self::JsonLines(JsonLinesConfig::new(path))),
            other => Err(StoreError::Invalid(format!("unknown store backend '{}'", other))),
        }
    }
}

/// Open the configured backend
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ReadingStore>> {
    Ok(match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite(sqlite) => Arc::new(SqliteStore::open(sqlite)?),
        StoreConfig::JsonLines(jsonl) => Arc::new(JsonLinesStore::open(jsonl)?),
    })
}
