//! Staleness Cache - the last computed leaderboard and when it was computed
//!
//! A single slot made of two string entries: the serialized faction list and
//! its millisecond timestamp. The slot is a latency optimization only; a
//! missing or unreadable entry is simply a cache miss.

use dashmap::DashMap;
use factions::Faction;
use sled::Db;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::POLYGON_CHAIN_ID;

/// Key holding the JSON faction list
pub const FACTIONS_KEY: &str = "daobi_factions_cache";

/// Key holding the fetch time in milliseconds
pub const FETCHED_AT_KEY: &str = "daobi_factions_cache_time";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The cached leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub factions: Vec<Faction>,
    pub fetched_at_ms: i64,
}

impl CacheEntry {
    /// Age relative to `now_ms`; negative ages (clock skew) count as zero
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.fetched_at_ms).max(0)
    }
}

/// TTL selection by network identity
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    /// Chain id that gets the long TTL
    pub production_chain_id: u64,
    pub production_ttl: Duration,
    /// TTL for every other network
    pub local_ttl: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            production_chain_id: POLYGON_CHAIN_ID,
            production_ttl: Duration::from_secs(10 * 60),
            local_ttl: Duration::from_secs(2 * 60),
        }
    }
}

impl StalenessPolicy {
    pub fn ttl(&self, chain_id: u64) -> Duration {
        if chain_id == self.production_chain_id {
            self.production_ttl
        } else {
            self.local_ttl
        }
    }

    pub fn ttl_ms(&self, chain_id: u64) -> i64 {
        i64::try_from(self.ttl(chain_id).as_millis()).unwrap_or(i64::MAX)
    }

    /// Whether `entry` may still be served without recomputation.
    ///
    /// A timestamp more than one TTL in the future is treated as stale.
    pub fn is_fresh(&self, entry: &CacheEntry, chain_id: u64, now_ms: i64) -> bool {
        let ttl_ms = self.ttl_ms(chain_id);
        let age = now_ms.saturating_sub(entry.fetched_at_ms);
        age < ttl_ms && age > -ttl_ms
    }
}

/// Storage for the single cache slot
pub trait CacheStore: Send + Sync {
    /// The stored entry, fresh or not
    fn read(&self) -> Result<Option<CacheEntry>, CacheError>;

    /// Replace the slot (both keys together)
    fn write(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

fn encode(entry: &CacheEntry) -> Result<(String, String), CacheError> {
    Ok((
        serde_json::to_string(&entry.factions)?,
        entry.fetched_at_ms.to_string(),
    ))
}

/// Rebuild an entry from the two raw values; anything unparsable is a miss
fn decode(factions: Option<&[u8]>, fetched_at: Option<&[u8]>) -> Option<CacheEntry> {
    let (factions, fetched_at) = (factions?, fetched_at?);

    let fetched_at_ms = match std::str::from_utf8(fetched_at)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
    {
        Some(ms) if ms >= 0 => ms,
        Some(ms) => {
            tracing::warn!(fetched_at_ms = ms, "Ignoring cached leaderboard with negative timestamp");
            return None;
        }
        None => {
            tracing::warn!("Ignoring cached leaderboard with unreadable timestamp");
            return None;
        }
    };

    match serde_json::from_slice::<Vec<Faction>>(factions) {
        Ok(factions) => Some(CacheEntry {
            factions,
            fetched_at_ms,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable cached leaderboard");
            None
        }
    }
}

/// Durable cache backed by a sled tree; survives restarts
pub struct SledCacheStore {
    db: Db,
    tree: sled::Tree,
}

impl SledCacheStore {
    /// Open or create the cache at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let db = sled::open(&path)?;
        let tree = db.open_tree("leaderboard")?;

        tracing::info!("Opened leaderboard cache at {:?}", path.as_ref());

        Ok(Self { db, tree })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush()?;
        Ok(())
    }

    /// Drop the cached entry
    pub fn clear(&self) -> Result<(), CacheError> {
        self.tree.clear()?;
        Ok(())
    }
}

impl CacheStore for SledCacheStore {
    fn read(&self) -> Result<Option<CacheEntry>, CacheError> {
        let factions = self.tree.get(FACTIONS_KEY)?;
        let fetched_at = self.tree.get(FETCHED_AT_KEY)?;
        Ok(decode(factions.as_deref(), fetched_at.as_deref()))
    }

    fn write(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let (factions, fetched_at) = encode(entry)?;

        let mut batch = sled::Batch::default();
        batch.insert(FACTIONS_KEY, factions.as_bytes());
        batch.insert(FETCHED_AT_KEY, fetched_at.as_bytes());
        self.tree.apply_batch(batch)?;

        tracing::debug!(
            factions = entry.factions.len(),
            fetched_at_ms = entry.fetched_at_ms,
            "Wrote leaderboard cache"
        );
        Ok(())
    }
}

/// In-memory cache with the same two-key layout
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<&'static str, String>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value under a key (as the durable store would hold it)
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Overwrite a raw value, bypassing serialization
    pub fn set_raw(&self, key: &'static str, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self) -> Result<Option<CacheEntry>, CacheError> {
        let factions = self.raw(FACTIONS_KEY);
        let fetched_at = self.raw(FETCHED_AT_KEY);
        Ok(decode(
            factions.as_deref().map(str::as_bytes),
            fetched_at.as_deref().map(str::as_bytes),
        ))
    }

    fn write(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let (factions, fetched_at) = encode(entry)?;
        self.entries.insert(FACTIONS_KEY, factions);
        self.entries.insert(FETCHED_AT_KEY, fetched_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LOCAL_CHAIN_ID;
    use chain_reader::Address;
    use tempfile::tempdir;

    fn sample_entry(fetched_at_ms: i64) -> CacheEntry {
        let mut faction = Faction::new(Address::new([7u8; 20]), "Bob");
        faction.add_supporter("Alice");
        faction.add_supporter("Bob");
        CacheEntry {
            factions: vec![faction],
            fetched_at_ms,
        }
    }

    #[test]
    fn test_ttl_by_network() {
        let policy = StalenessPolicy::default();
        assert_eq!(policy.ttl(POLYGON_CHAIN_ID), Duration::from_secs(600));
        assert_eq!(policy.ttl(LOCAL_CHAIN_ID), Duration::from_secs(120));
        // Unrecognized networks get the shorter TTL
        assert_eq!(policy.ttl(11155111), Duration::from_secs(120));
    }

    #[test]
    fn test_freshness_window() {
        let policy = StalenessPolicy::default();
        let entry = sample_entry(1_000_000);

        assert!(policy.is_fresh(&entry, LOCAL_CHAIN_ID, 1_000_000));
        assert!(policy.is_fresh(&entry, LOCAL_CHAIN_ID, 1_000_000 + 119_999));
        assert!(!policy.is_fresh(&entry, LOCAL_CHAIN_ID, 1_000_000 + 120_000));
        assert!(policy.is_fresh(&entry, POLYGON_CHAIN_ID, 1_000_000 + 599_999));
        assert!(!policy.is_fresh(&entry, POLYGON_CHAIN_ID, 1_000_000 + 600_000));
    }

    #[test]
    fn test_memory_write_then_read() {
        let store = MemoryCacheStore::new();
        assert!(store.read().unwrap().is_none());

        let entry = sample_entry(42);
        store.write(&entry).unwrap();
        assert_eq!(store.read().unwrap(), Some(entry));
        assert_eq!(store.raw(FETCHED_AT_KEY).as_deref(), Some("42"));
    }

    #[test]
    fn test_partial_or_corrupt_slot_is_a_miss() {
        let store = MemoryCacheStore::new();
        store.set_raw(FETCHED_AT_KEY, "42");
        assert!(store.read().unwrap().is_none());

        store.set_raw(FACTIONS_KEY, "not json");
        assert!(store.read().unwrap().is_none());

        store.set_raw(FACTIONS_KEY, "[]");
        store.set_raw(FETCHED_AT_KEY, "yesterday");
        assert!(store.read().unwrap().is_none());

        store.set_raw(FETCHED_AT_KEY, "-9223372036854775808");
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        let policy = StalenessPolicy::default();
        let now = 1_700_000_000_000;

        let ancient = sample_entry(i64::MIN);
        assert!(!policy.is_fresh(&ancient, LOCAL_CHAIN_ID, now));
        assert_eq!(ancient.age_ms(now), i64::MAX);

        let far_future = sample_entry(i64::MAX);
        assert!(!policy.is_fresh(&far_future, LOCAL_CHAIN_ID, now));
        assert_eq!(far_future.age_ms(now), 0);

        // Small skew ahead of the local clock is still fresh
        let skewed = sample_entry(now + 5_000);
        assert!(policy.is_fresh(&skewed, LOCAL_CHAIN_ID, now));
    }

    #[test]
    fn test_sled_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let entry = sample_entry(1_700_000_000_000);

        {
            let store = SledCacheStore::open(dir.path()).unwrap();
            store.write(&entry).unwrap();
            store.flush().unwrap();
        }

        let store = SledCacheStore::open(dir.path()).unwrap();
        assert_eq!(store.read().unwrap(), Some(entry));

        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn test_sled_overwrites_slot() {
        let dir = tempdir().unwrap();
        let store = SledCacheStore::open(dir.path()).unwrap();

        store.write(&sample_entry(1)).unwrap();
        let newer = CacheEntry {
            factions: Vec::new(),
            fetched_at_ms: 2,
        };
        store.write(&newer).unwrap();
        assert_eq!(store.read().unwrap(), Some(newer));
    }
}
