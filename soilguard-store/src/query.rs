//! Read-side façade for HTTP collaborators
//!
//! Handlers call [`QueryService::get_latest`] and
//! [`QueryService::get_history`] and map [`QueryError::NotFound`] to a 404.
//! The service caps every history request, so no caller can ask the store for
//! an unbounded result set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{QueryError, ReadingStore, StoredReading};

/// Default history length when the caller gives none
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Largest history length ever returned
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Bounds applied to history requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Used when no limit, or zero, is requested
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on any request
    #[serde(default = "max_limit")]
    pub max_limit: usize,
}

const fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

const fn max_limit() -> usize {
    MAX_HISTORY_LIMIT
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_HISTORY_LIMIT,
            max_limit: MAX_HISTORY_LIMIT,
        }
    }
}

impl QueryLimits {
    /// Build limits; `max_limit` is raised to at least 1 and the default is
    /// capped at the maximum
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// Limit actually sent to the store
    pub fn effective(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.default_limit.min(self.max_limit),
            Some(n) => n.min(self.max_limit),
        }
    }
}

/// Query façade over any [`ReadingStore`]
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn ReadingStore>,
    limits: QueryLimits,
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("backend", &self.store.backend())
            .field("limits", &self.limits)
            .finish()
    }
}

impl QueryService {
    /// Service with default limits
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self::with_limits(store, QueryLimits::default())
    }

    /// Service with explicit limits
    pub fn with_limits(store: Arc<dyn ReadingStore>, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    /// Active limits
    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Newest reading with non-zero NPK
    pub fn get_latest(&self) -> Result<StoredReading, QueryError> {
        self.store.latest(true)?.ok_or(QueryError::NotFound)
    }

    /// Newest readings first, at most the capped limit
    pub fn get_history(&self, limit: Option<usize>) -> Result<Vec<StoredReading>, QueryError> {
        Ok(self.store.history(self.limits.effective(limit))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use soilguard_core::{Npk, Reading, ReadingParts};

    fn service_with(count: u64) -> QueryService {
        let store = MemoryStore::new();
        for i in 0..count {
            store
                .append(&Reading::from_parts(ReadingParts {
                    timestamp: 1_000 + i,
                    node_id: "node01".into(),
                    npk: Npk::new(10, 10, 10),
                    ph: 7.0,
                    moisture: 20.0,
                    temperature: 15.0,
                    ec: 0.5,
                }))
                .unwrap();
        }
        QueryService::new(Arc::new(store))
    }

    #[test]
    fn latest_on_empty_is_not_found() {
        assert_eq!(service_with(0).get_latest(), Err(QueryError::NotFound));
    }

    #[test]
    fn history_defaults_and_caps() {
        let service = service_with(150);
        assert_eq!(service.get_history(None).unwrap().len(), 10);
        assert_eq!(service.get_history(Some(0)).unwrap().len(), 10);
        assert_eq!(service.get_history(Some(25)).unwrap().len(), 25);
        assert_eq!(service.get_history(Some(10_000)).unwrap().len(), 100);
    }

    #[test]
    fn limits_are_sanitised() {
        let limits = QueryLimits::new(50, 20);
        assert_eq!(limits.default_limit, 20);
        assert_eq!(limits.effective(None), 20);

        let limits = QueryLimits::new(0, 0);
        assert_eq!(limits.max_limit, 1);
        assert_eq!(limits.effective(Some(5)), 1);
    }
}
