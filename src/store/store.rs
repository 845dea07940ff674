//! Cache Store
//!
//! The concurrent entry map and its lifecycle machinery: lazy-expiry reads,
//! unconditional writes, a periodic sweeper reclaiming expired entries and a
//! periodic dumper snapshotting the live map to disk.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::error::{
    Result, DUMP_CREATE, DUMP_NOT_STARTED, DUMP_START, DUMP_STOP, INVALID_PARAMS, KEY_MISSING,
    SWEEP_CREATE, SWEEP_NOT_STARTED, SWEEP_START, SWEEP_STOP,
};
use crate::store::clock::Clock;
use crate::store::entry::Entry;
use crate::store::snapshot::Snapshotter;
use crate::store::ticker::{TickFn, Ticker};

// == Params ==
/// Smallest accepted sweep period.
pub const MIN_CLEANING_PERIOD: Duration = Duration::from_millis(100);

/// Smallest accepted snapshot period.
pub const MIN_DUMPING_PERIOD: Duration = Duration::from_secs(60);

/// Store parameters: the periods of the two background jobs.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Period of expired entry removal
    pub cleaning_period: Duration,
    /// Period of snapshot dumps
    pub dumping_period: Duration,
}

impl Params {
    /// Validates the periods against their floors.
    pub fn validate(&self) -> Result<()> {
        if self.cleaning_period < MIN_CLEANING_PERIOD {
            return Err(INVALID_PARAMS.detailed("cleaning period must be >= 100ms"));
        }
        if self.dumping_period < MIN_DUMPING_PERIOD {
            return Err(INVALID_PARAMS.detailed("dumping period must be >= 60s"));
        }
        Ok(())
    }
}

// == Store ==
/// In-memory entry map under a single reader/writer lock.
///
/// Reads take shared access and treat expired entries as absent; writes take
/// exclusive access and replace any prior entry regardless of variant. The
/// sweeper is a space reclaimer, not a correctness mechanism: an expired
/// entry may linger in the map between ticks but is never visible to reads.
pub struct Store {
    items: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
    snapshotter: Arc<dyn Snapshotter>,
    params: Params,
    sweeper: Mutex<Option<Ticker>>,
    dumper: Mutex<Option<Ticker>>,
}

impl Store {
    // == Constructor ==
    /// Creates a store, rehydrating the map from the snapshotter.
    ///
    /// Fails on invalid params or an unreadable snapshot; a missing
    /// snapshot file yields the empty map.
    pub fn new(
        params: Params,
        clock: Arc<dyn Clock>,
        snapshotter: Arc<dyn Snapshotter>,
    ) -> Result<Self> {
        params.validate()?;
        let items = snapshotter.load()?;
        if !items.is_empty() {
            info!(entries = items.len(), "store rehydrated from snapshot");
        }
        Ok(Self {
            items: Arc::new(RwLock::new(items)),
            clock,
            snapshotter,
            params,
            sweeper: Mutex::new(None),
            dumper: Mutex::new(None),
        })
    }

    // == Scalar Operations ==
    /// Returns the scalar value under `key`.
    pub async fn get(&self, key: &str) -> Result<String> {
        let items = self.items.read().await;
        let entry = self.live_entry(&items, key)?;
        entry.as_scalar().map(str::to_owned)
    }

    /// Stores a scalar under `key`, replacing any prior entry.
    pub async fn set(&self, key: String, value: String, ttl: chrono::Duration) {
        let mut items = self.items.write().await;
        items.insert(key, Entry::scalar(value, self.expiry(ttl)));
    }

    // == List Operations ==
    /// Returns the list element under `key` at `index`.
    pub async fn list_get(&self, key: &str, index: i64) -> Result<String> {
        let items = self.items.read().await;
        let entry = self.live_entry(&items, key)?;
        entry.as_list(index).map(str::to_owned)
    }

    /// Stores a list under `key`, replacing any prior entry.
    pub async fn list_set(&self, key: String, list: Option<Vec<String>>, ttl: chrono::Duration) {
        let mut items = self.items.write().await;
        items.insert(key, Entry::list(list, self.expiry(ttl)));
    }

    // == Dict Operations ==
    /// Returns the dict element under `key` at `dkey`.
    pub async fn dict_get(&self, key: &str, dkey: &str) -> Result<String> {
        let items = self.items.read().await;
        let entry = self.live_entry(&items, key)?;
        entry.as_dict(dkey).map(str::to_owned)
    }

    /// Stores a dict under `key`, replacing any prior entry.
    pub async fn dict_set(
        &self,
        key: String,
        dict: Option<HashMap<String, String>>,
        ttl: chrono::Duration,
    ) {
        let mut items = self.items.write().await;
        items.insert(key, Entry::dict(dict, self.expiry(ttl)));
    }

    // == Remove ==
    /// Removes the entry under `key`, whatever its variant.
    ///
    /// Only a truly absent key is `KeyMissing`: a present-but-expired entry
    /// removes successfully.
    pub async fn remove(&self, key: &str) -> Result<()> {
        match self.items.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(KEY_MISSING),
        }
    }

    // == Keys ==
    /// All non-expired keys, in no particular order.
    pub async fn keys(&self) -> Vec<String> {
        let items = self.items.read().await;
        let now = self.clock.now();
        items
            .iter()
            .filter(|(_, entry)| !entry.expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Sweeper Lifecycle ==
    /// Starts the expired-entry sweeper. The ticker is created lazily on
    /// the first start and reused afterwards.
    pub async fn start_sweep(&self) -> Result<()> {
        let mut slot = self.sweeper.lock().await;
        let _map = self.items.write().await;
        if slot.is_none() {
            let ticker = Ticker::new(self.params.cleaning_period, self.sweep_callback())
                .map_err(|e| SWEEP_CREATE.caused_by(&e))?;
            *slot = Some(ticker);
        }
        if let Some(ticker) = slot.as_mut() {
            ticker.start().map_err(|e| SWEEP_START.caused_by(&e))?;
        }
        Ok(())
    }

    /// Stops the sweeper.
    pub async fn stop_sweep(&self) -> Result<()> {
        let mut slot = self.sweeper.lock().await;
        let _map = self.items.write().await;
        match slot.as_mut() {
            Some(ticker) => ticker.stop().map_err(|e| SWEEP_STOP.caused_by(&e)),
            None => Err(SWEEP_NOT_STARTED),
        }
    }

    // == Dumper Lifecycle ==
    /// Starts the periodic snapshot job. The ticker is created lazily on
    /// the first start and reused afterwards.
    pub async fn start_dump(&self) -> Result<()> {
        let mut slot = self.dumper.lock().await;
        let _map = self.items.write().await;
        if slot.is_none() {
            let ticker = Ticker::new(self.params.dumping_period, self.dump_callback())
                .map_err(|e| DUMP_CREATE.caused_by(&e))?;
            *slot = Some(ticker);
        }
        if let Some(ticker) = slot.as_mut() {
            ticker.start().map_err(|e| DUMP_START.caused_by(&e))?;
        }
        Ok(())
    }

    /// Stops the snapshot job.
    pub async fn stop_dump(&self) -> Result<()> {
        let mut slot = self.dumper.lock().await;
        let _map = self.items.write().await;
        match slot.as_mut() {
            Some(ticker) => ticker.stop().map_err(|e| DUMP_STOP.caused_by(&e)),
            None => Err(DUMP_NOT_STARTED),
        }
    }

    // == Internals ==
    /// Looks up a live entry; absent and expired are both `KeyMissing`.
    fn live_entry<'a>(
        &self,
        items: &'a HashMap<String, Entry>,
        key: &str,
    ) -> Result<&'a Entry> {
        match items.get(key) {
            Some(entry) if !entry.expired(self.clock.now()) => Ok(entry),
            _ => Err(KEY_MISSING),
        }
    }

    /// Computes the absolute expiry for a write happening now.
    fn expiry(&self, ttl: chrono::Duration) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sweep_callback(&self) -> TickFn {
        let items = Arc::clone(&self.items);
        let clock = Arc::clone(&self.clock);
        Arc::new(move || {
            let items = Arc::clone(&items);
            let clock = Arc::clone(&clock);
            Box::pin(async move {
                let now = clock.now();
                let mut map = items.write().await;
                let before = map.len();
                map.retain(|_, entry| !entry.expired(now));
                let removed = before - map.len();
                drop(map);
                if removed > 0 {
                    info!(removed, "sweep removed expired entries");
                } else {
                    debug!("sweep found no expired entries");
                }
            })
        })
    }

    fn dump_callback(&self) -> TickFn {
        let items = Arc::clone(&self.items);
        let snapshotter = Arc::clone(&self.snapshotter);
        Arc::new(move || {
            let items = Arc::clone(&items);
            let snapshotter = Arc::clone(&snapshotter);
            Box::pin(async move {
                // Shared access is held across the file write: the snapshot
                // serialises against writers to stay a consistent image.
                let map = items.read().await;
                match snapshotter.dump(&map) {
                    Ok(()) => debug!(entries = map.len(), "snapshot written"),
                    Err(e) => error!(error = %e, "snapshot failed, retrying next tick"),
                }
            })
        })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("params", &self.params).finish()
    }
}
