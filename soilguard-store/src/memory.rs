//! In-memory store
//!
//! Nothing survives a restart. Used in tests and when the host only needs the
//! query side for a dashboard preview.

use std::collections::BTreeMap;
use std::sync::RwLock;

use soilguard_core::{Reading, Timestamp};

use crate::{ReadingId, ReadingStore, StoreError, StoreResult, StoredReading};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<(Timestamp, ReadingId), Reading>,
    next_id: u64,
}

/// Store backed by an ordered map behind a read/write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored readings
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.rows.len()).unwrap_or(0)
    }

    /// True when nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: &Reading) -> StoreResult<ReadingId> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.next_id += 1;
        let id = ReadingId(state.next_id);
        state.rows.insert((reading.timestamp(), id), reading.clone());
        Ok(id)
    }

    fn latest(&self, require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .rows
            .iter()
            .rev()
            .find(|(_, reading)| !require_nonzero_npk || !reading.npk().is_all_zero())
            .map(|(&(_, id), reading)| StoredReading { id, reading: reading.clone() }))
    }

    fn history(&self, limit: usize) -> StoreResult<Vec<StoredReading>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .rows
            .iter()
            .rev()
            .take(limit)
            .map(|(&(_, id), reading)| StoredReading { id, reading: reading.clone() })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
