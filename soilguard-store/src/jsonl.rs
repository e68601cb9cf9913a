//! JSON Lines file store
//!
//! One reading per line, appended and synced before `append` returns. This is
//! the format field loggers have always written locally: readable with `tail`,
//! greppable, trivially shipped elsewhere.
//!
//! ## Format
//!
//! ```json
//! {"id":1,"timestamp":"2023-11-14T22:13:20.123Z","node_id":"node01","nitrogen":80,"phosphorus":20,"potassium":15,"ph":6.5,"moisture":35.0,"temperature":21.0,"ec":1.2}
//! ```
//!
//! ## Recovery
//!
//! - A line without its trailing newline at open time is the remains of an
//!   interrupted write. It is cut off before the first new append.
//! - Readers ignore an unterminated last line, which is an append in progress.
//! - A complete line that does not parse is skipped with a warning.
//! - A failed write or sync is rolled back to the length the file had before
//!   the append started. If even that fails, the tail is cut before the next
//!   append, so a successful append always starts on a fresh line.
//!
//! Queries scan the whole file. Fine for a node-local log; use SQLite for
//! anything long-lived.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use soilguard_core::Reading;

use crate::{ReadingId, ReadingStore, StoreError, StoreResult, StoredReading};

/// JSON Lines backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonLinesConfig {
    /// Log file, created if missing
    pub path: PathBuf,
}

impl JsonLinesConfig {
    /// Configuration for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// File operations the writer relies on
trait LogFile: Write + Send + fmt::Debug {
    fn size(&self) -> io::Result<u64>;
    fn sync(&self) -> io::Result<()>;
    fn truncate(&self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

#[derive(Debug)]
struct Writer {
    file: Box<dyn LogFile>,
    next_id: u64,
    /// Length to cut back to before the next append
    repair_to: Option<u64>,
}

impl Writer {
    fn append_line(&mut self, line: &[u8]) -> StoreResult<()> {
        if let Some(len) = self.repair_to {
            self.file.truncate(len)?;
            self.repair_to = None;
            info!("Removed partial record left by a failed append");
        }

        let start = self.file.size()?;
        let written = self.file.write_all(line).and_then(|()| self.file.sync());
        if let Err(err) = written {
            if let Err(rollback) = self.file.truncate(start) {
                warn!("Could not roll back failed append: {}", rollback);
                self.repair_to = Some(start);
            }
            return Err(err.into());
        }
        Ok(())
    }
}

/// Append-only store over a JSON Lines file
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    writer: Mutex<Writer>,
}

impl JsonLinesStore {
    /// Open or create the log file
    pub fn open(config: &JsonLinesConfig) -> StoreResult<Self> {
        if config.path.is_dir() {
            return Err(StoreError::Invalid("json lines path must be a file, not a directory".to_string()));
        }
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&config.path)?;

        truncate_partial_tail(&mut file, &config.path)?;

        let last_id = scan(&config.path)?.iter().map(|r| r.id.0).max().unwrap_or(0);

        info!(
            "Opened JSON Lines store at {} (last id {})",
            config.path.display(),
            last_id
        );

        Ok(Self {
            path: config.path.clone(),
            writer: Mutex::new(Writer {
                file: Box::new(file),
                next_id: last_id + 1,
                repair_to: None,
            }),
        })
    }

    /// Log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sorted(&self) -> StoreResult<Vec<StoredReading>> {
        let mut rows = scan(&self.path)?;
        rows.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
        Ok(rows)
    }
}

impl ReadingStore for JsonLinesStore {
    fn append(&self, reading: &Reading) -> StoreResult<ReadingId> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Unavailable("json lines writer mutex poisoned".to_string()))?;

        let id = ReadingId(writer.next_id);
        let mut line = serde_json::to_vec(&StoredReading { id, reading: reading.clone() })?;
        line.push(b'\n');

        writer.append_line(&line)?;
        writer.next_id += 1;
        Ok(id)
    }

    fn latest(&self, require_nonzero_npk: bool) -> StoreResult<Option<StoredReading>> {
        Ok(self
            .sorted()?
            .into_iter()
            .find(|row| !require_nonzero_npk || !row.reading.npk().is_all_zero()))
    }

    fn history(&self, limit: usize) -> StoreResult<Vec<StoredReading>> {
        let mut rows = self.sorted()?;
        rows.truncate(limit);
        Ok(rows)
    }

    fn backend(&self) -> &'static str {
        "json_lines"
    }
}

/// Read every complete, parseable line
fn scan(path: &Path) -> StoreResult<Vec<StoredReading>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    let mut line = Vec::new();
    let mut line_number = 0usize;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_number += 1;

        if line.last() != Some(&b'\n') {
            // Append in progress
            break;
        }
        let text = &line[..line.len() - 1];
        if text.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<StoredReading>(text) {
            Ok(row) => rows.push(row),
            Err(err) => warn!(
                "Skipping corrupt line {} in {}: {}",
                line_number,
                path.display(),
                err
            ),
        }
    }

    Ok(rows)
}

/// Drop bytes after the last newline left by an interrupted append
fn truncate_partial_tail(file: &mut File, path: &Path) -> StoreResult<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut contents = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut contents)?;

    if contents.last() == Some(&b'\n') {
        return Ok(());
    }

    let keep = contents.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1);
    warn!(
        "Discarding {} bytes of incomplete record at end of {}",
        contents.len() - keep,
        path.display()
    );
    file.set_len(keep as u64)?;
    file.sync_data()?;
    Ok(())
}
