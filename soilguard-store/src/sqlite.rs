//! SQLite store
//!
//! ## Layout
//!
//! ```sql
//! CREATE TABLE soil_readings (
//!     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//!     timestamp   INTEGER NOT NULL,   -- ms since epoch
//!     node_id     TEXT    NOT NULL,
//!     nitrogen    INTEGER NOT NULL,
//!     phosphorus  INTEGER NOT NULL,
//!     potassium   INTEGER NOT NULL,
//!     ph          REAL    NOT NULL,
//!     moisture    REAL    NOT NULL,
//!     temperature REAL    NOT NULL,
//!     ec          REAL    NOT NULL
//! );
//! CREATE INDEX idx_soil_readings_timestamp ON soil_readings (timestamp DESC, id DESC);
//! ```
//!
//! ## Concurrency
//!
//! The database runs in WAL mode. Appends go through one write connection
//! behind a mutex. Queries take a connection from a small round-robin pool, so
//! a slow fsync on the write side never blocks a dashboard request. Each append
//! is a single `INSERT`, which SQLite commits atomically.
//!
//! The path must name a file: an in-memory database would give every pooled
//! connection its own empty database.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::info;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use soilguard_core::{Npk, Reading, ReadingParts};

use crate::{ReadingId, ReadingStore, StoreError, StoreResult, StoredReading};

/// Default busy timeout (ms)
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default number of read connections
const DEFAULT_READ_POOL_SIZE: usize = 4;

const SELECT_COLUMNS: &str =
    "id, timestamp, node_id, nitrogen, phosphorus, potassium, ph, moisture, temperature, ec";

/// SQLite backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file
    pub path: PathBuf,

    /// How long a connection waits on a locked database (ms)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Number of read-only connections
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

impl SqliteConfig {
    /// Configuration with default timeouts for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }

    /// Set the busy timeout
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Set the read pool size
    pub fn read_pool_size(mut self, size: usize) -> Self {
        self.read_pool_size = size;
        self
    }

    /// Check the configuration before opening anything
    pub fn validate(&self) -> StoreResult<()> {
        if self.read_pool_size == 0 {
            return Err(StoreError::Invalid("read_pool_size must be greater than zero".to_string()));
        }
        let text = self.path.to_string_lossy();
        if text.is_empty() || text == ":memory:" {
            return Err(StoreError::Invalid("sqlite path must name a file".to_string()));
        }
        if self.path.is_dir() {
            return Err(StoreError::Invalid("sqlite path must be a file, not a directory".to_string()));
        }
        Ok(())
    }
}

/// Store backed by a SQLite database in WAL mode
pub struct SqliteStore {
    path: PathBuf,
    write_connection: Mutex<Connection>,
    read_connections: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("read_pool_size", &self.read_connections.len())
            .finish()
    }
}

impl SqliteStore {
    /// Open or create the database and its schema
    pub fn open(config: &SqliteConfig) -> StoreResult<Self> {
        config.validate()?;
        ensure_parent_dir(&config.path)?;

        let write_connection = open_connection(config)?;
        initialize_schema(&write_connection)?;

        let read_connections = (0..config.read_pool_size)
            .map(|_| open_connection(config).map(Mutex::new))
            .collect::<StoreResult<Vec<_>>>()?;

        info!(
            "Opened SQLite store at {} ({} read connections)",
            config.path.display(),
            config.read_pool_size
        );

        Ok(Self {
            path: config.path.clone(),
            write_connection: Mutex::new(write_connection),
            read_connections,
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_connection(&self) -> &Mutex<Connection> {
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.read_connections.len();
        &self.read_connections[index]
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .read_connection()
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite read mutex poisoned".to_string()))?;
        f(&guard)
    }
}

impl ReadingStore for SqliteStore {
    fn append(&self, reading: &Reading) -> StoreResult<ReadingId> {
        let timestamp = i64::try_from(reading.timestamp())
            .map_err(|_| StoreError::Invalid(format!("timestamp {} out of range", reading.timestamp())))?;
        let npk = reading.npk();

        let connection = self
            .write_connection
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite write mutex poisoned".to_string()))?;

        connection.execute(
            "INSERT INTO soil_readings
                (timestamp, node_id, nitrogen, phosphorus, potassium, ph, moisture, temperature, ec)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                timestamp,
                reading.node_id(),
                npk.nitrogen,
                npk.phosphorus,
                npk.potassium,
                reading.ph(),
                reading.moisture(),
                reading.temperature(),
                reading.ec(),
            ],
        )?;

        let rowid = connection.last_insert_rowid();
        u64::try_from(rowid)
            .map(ReadingId)
            .map_err(|_| StoreError::Invalid(format!("negative row id {}", rowid)))
    }

    fn latest(&self, require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>> {
        let filter = if require_nonzero_npk {
            "WHERE NOT (nitrogen = 0 AND phosphorus = 0 AND potassium = 0)"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {} FROM soil_readings {} ORDER BY timestamp DESC, id DESC LIMIT 1",
            SELECT_COLUMNS, filter
        );

        self.with_reader(|connection| {
            let row = connection.query_row(&sql, [], SqlRow::from_row).optional()?;
            row.map(SqlRow::into_stored).transpose()
        })
    }

    fn history(&self, limit: usize) -> StoreResult<Vec<StoredReading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {} FROM soil_readings ORDER BY timestamp DESC, id DESC LIMIT ?1",
            SELECT_COLUMNS
        );

        self.with_reader(|connection| {
            let mut statement = connection.prepare_cached(&sql)?;
            let rows = statement.query_map(params![limit], SqlRow::from_row)?;
            let readings = rows
                .map(|row| row.map_err(StoreError::from).and_then(SqlRow::into_stored))
                .collect::<StoreResult<Vec<_>>>();
            readings
        })
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// One row as SQLite returns it, before range checks
struct SqlRow {
    id: i64,
    timestamp: i64,
    node_id: String,
    npk: Npk,
    ph: f64,
    moisture: f64,
    temperature: f64,
    ec: f64,
}

impl SqlRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            node_id: row.get(2)?,
            npk: Npk::new(row.get(3)?, row.get(4)?, row.get(5)?),
            ph: row.get(6)?,
            moisture: row.get(7)?,
            temperature: row.get(8)?,
            ec: row.get(9)?,
        })
    }

    fn into_stored(self) -> StoreResult<StoredReading> {
        let id = u64::try_from(self.id)
            .map_err(|_| StoreError::Invalid(format!("negative row id {}", self.id)))?;
        let timestamp = u64::try_from(self.timestamp)
            .map_err(|_| StoreError::Invalid(format!("row {} has negative timestamp", self.id)))?;

        Ok(StoredReading {
            id: ReadingId(id),
            reading: Reading::from_parts(ReadingParts {
                timestamp,
                node_id: self.node_id,
                npk: self.npk,
                ph: self.ph,
                moisture: self.moisture,
                temperature: self.temperature,
                ec: self.ec,
            }),
        })
    }
}

fn ensure_parent_dir(path: &Path) -> StoreResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn open_connection(config: &SqliteConfig) -> StoreResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection.execute_batch("PRAGMA journal_mode = wal; PRAGMA synchronous = full;")?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS soil_readings (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   INTEGER NOT NULL,
            node_id     TEXT    NOT NULL,
            nitrogen    INTEGER NOT NULL,
            phosphorus  INTEGER NOT NULL,
            potassium   INTEGER NOT NULL,
            ph          REAL    NOT NULL,
            moisture    REAL    NOT NULL,
            temperature REAL    NOT NULL,
            ec          REAL    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_soil_readings_timestamp
            ON soil_readings (timestamp DESC, id DESC);",
    )?;
    Ok(())
}
