//! Binary Snapshots
//!
//! Dumps the live entry map to a file and loads it back on startup. Each
//! record carries the expiry as nanoseconds since the Unix epoch plus the
//! variant-tagged payload, so a round trip preserves variants, values and
//! expiries exactly.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{
    Result, CLOSE_DUMP_FILE, DECODE_DUMP_FILE, ENCODE_ENTRIES, OPEN_DUMP_FILE,
};
use crate::store::entry::{Entry, Value};

// == Snapshotter ==
/// Dumps and loads the entry map. Implementations take no locks; the store
/// passes a stable view under its own lock.
pub trait Snapshotter: Send + Sync {
    /// Serialises the entire map to the backing file.
    fn dump(&self, entries: &HashMap<String, Entry>) -> Result<()>;

    /// Loads the map from the backing file. A missing file is a fresh
    /// start and yields the empty map without error.
    fn load(&self) -> Result<HashMap<String, Entry>>;
}

// == Snapshot Record ==
/// On-disk form of one entry: expiry in nanoseconds since the epoch plus
/// the tagged payload. The decoder rejects an unknown variant tag.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    expiry_ns: i64,
    value: Value,
}

// == File Snapshotter ==
/// Snapshotter backed by a single bincode-encoded file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileSnapshotter {
    path: PathBuf,
}

impl FileSnapshotter {
    /// Creates a snapshotter writing to and reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Snapshotter for FileSnapshotter {
    fn dump(&self, entries: &HashMap<String, Entry>) -> Result<()> {
        let mut records = HashMap::with_capacity(entries.len());
        for (key, entry) in entries {
            let expiry_ns = entry.expiry().timestamp_nanos_opt().ok_or_else(|| {
                ENCODE_ENTRIES.detailed(format!("expiry of {key:?} out of nanosecond range"))
            })?;
            records.insert(
                key.clone(),
                SnapshotRecord {
                    expiry_ns,
                    value: entry.value().clone(),
                },
            );
        }

        let file = File::create(&self.path).map_err(|e| OPEN_DUMP_FILE.caused_by(&e))?;
        let mut writer = BufWriter::new(&file);
        bincode::serialize_into(&mut writer, &records)
            .map_err(|e| ENCODE_ENTRIES.caused_by(&e))?;
        writer.flush().map_err(|e| ENCODE_ENTRIES.caused_by(&e))?;
        drop(writer);
        file.sync_all().map_err(|e| CLOSE_DUMP_FILE.caused_by(&e))?;
        Ok(())
    }

    fn load(&self) -> Result<HashMap<String, Entry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let file = File::open(&self.path).map_err(|e| OPEN_DUMP_FILE.caused_by(&e))?;
        let records: HashMap<String, SnapshotRecord> =
            bincode::deserialize_from(BufReader::new(file))
                .map_err(|e| DECODE_DUMP_FILE.caused_by(&e))?;

        let mut entries = HashMap::with_capacity(records.len());
        for (key, record) in records {
            let expiry = DateTime::from_timestamp_nanos(record.expiry_ns);
            entries.insert(key, Entry::from_parts(record.value, expiry));
        }
        Ok(entries)
    }
}
