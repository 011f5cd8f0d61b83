//! Thread-Safe Time-Series Storage Engine
//!
//! This module implements the in-memory store behind tsmetrics. Every metric
//! key owns a [`Series`]: a map from timestamp (seconds) to a single `f64`
//! sample. Keys are created on their first `put` and are never removed.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over 64 shards, so writers to different
//!    keys rarely contend.
//! 2. **Ordered Series**: A `BTreeMap<i64, f64>` keeps samples sorted by timestamp,
//!    so reads never need to sort.
//! 3. **Owned Snapshots**: `get` returns a deep copy. Later writes never change a
//!    snapshot that has already been handed out.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `put` holds exactly one shard write lock. A wildcard `get` takes the read
//! lock of every shard, in index order, before copying anything, which gives a
//! point-in-time view of the whole store.

use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Key that selects every series in a `get`.
pub const WILDCARD: &str = "*";

/// Samples of one metric key, ordered by timestamp.
pub type Series = BTreeMap<i64, f64>;

/// A single observation as rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    pub key: &'a str,
    pub value: f64,
    pub timestamp: i64,
}

/// A point-in-time copy of some or all series in the store.
///
/// Keys enumerate in lexicographic order and samples within a key in
/// ascending timestamp order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    series: BTreeMap<String, Series>,
}

impl Snapshot {
    /// An empty snapshot, returned for unknown keys and successful `put`s.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the snapshot holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.series.values().all(BTreeMap::is_empty)
    }

    /// Total number of samples across all keys.
    pub fn len(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    /// Iterates every sample, grouped by key, each key's block in timestamp order.
    pub fn iter_samples(&self) -> impl Iterator<Item = Sample<'_>> {
        self.series.iter().flat_map(|(key, series)| {
            series.iter().map(move |(&timestamp, &value)| Sample {
                key,
                value,
                timestamp,
            })
        })
    }
}

impl From<BTreeMap<String, Series>> for Snapshot {
    fn from(series: BTreeMap<String, Series>) -> Self {
        Self { series }
    }
}

/// Point-in-time counters describing the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub samples: u64,
    pub put_ops: u64,
    pub get_ops: u64,
}

#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, Series>>,
}

impl Shard {
    // A critical section is a single insert or a read-only copy, so a
    // poisoned lock never guards a half-written series.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Series>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Series>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The shared metrics store.
///
/// Wrap it in an `Arc` and hand a clone to every connection; all methods take
/// `&self` and are safe to call concurrently.
///
/// # Example
///
/// ```
/// use tsmetrics::storage::StorageEngine;
///
/// let engine = StorageEngine::new();
/// engine.put("cpu", 0.5, 100);
/// engine.put("cpu", 0.9, 200);
///
/// let snapshot = engine.get("cpu");
/// assert_eq!(snapshot.len(), 2);
/// assert!(engine.get("memory").is_empty());
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
    key_count: AtomicU64,
    sample_count: AtomicU64,
    put_count: AtomicU64,
    get_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("sample_count", &self.sample_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Stores `value` at `(key, timestamp)`, replacing any earlier value for
    /// that timestamp.
    ///
    /// Returns the replaced value, if there was one.
    pub fn put(&self, key: &str, value: f64, timestamp: i64) -> Option<f64> {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let mut data = shard.write();

        let previous = match data.get_mut(key) {
            Some(series) => series.insert(timestamp, value),
            None => {
                self.key_count.fetch_add(1, Ordering::Relaxed);
                data.insert(key.to_string(), Series::from([(timestamp, value)]));
                None
            }
        };

        if previous.is_none() {
            self.sample_count.fetch_add(1, Ordering::Relaxed);
        }
        previous
    }

    /// Returns a snapshot of one series, or of the whole store for [`WILDCARD`].
    ///
    /// Unknown keys yield an empty snapshot.
    pub fn get(&self, key: &str) -> Snapshot {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        if key == WILDCARD {
            return self.snapshot_all();
        }

        let data = self.get_shard(key).read();
        match data.get(key) {
            Some(series) => {
                let mut snapshot = BTreeMap::new();
                snapshot.insert(key.to_string(), series.clone());
                Snapshot::from(snapshot)
            }
            None => Snapshot::empty(),
        }
    }

    fn snapshot_all(&self) -> Snapshot {
        // Every guard is held until the copy is complete.
        let guards: Vec<_> = self.shards.iter().map(Shard::read).collect();

        let series: BTreeMap<String, Series> = guards
            .iter()
            .flat_map(|data| data.iter())
            .map(|(key, series)| (key.clone(), series.clone()))
            .collect();

        Snapshot::from(series)
    }

    /// Number of distinct keys ever written.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            samples: self.sample_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn collect(snapshot: &Snapshot) -> Vec<(String, f64, i64)> {
        snapshot
            .iter_samples()
            .map(|s| (s.key.to_string(), s.value, s.timestamp))
            .collect()
    }

    #[test]
    fn test_put_and_get() {
        let engine = StorageEngine::new();

        assert_eq!(engine.put("cpu", 0.5, 100), None);
        let snapshot = engine.get("cpu");
        assert_eq!(collect(&snapshot), vec![("cpu".to_string(), 0.5, 100)]);
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        engine.put("cpu", 0.5, 100);

        let snapshot = engine.get("memory");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.keys().count(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let engine = StorageEngine::new();

        engine.put("cpu", 0.5, 100);
        assert_eq!(engine.put("cpu", 0.7, 100), Some(0.5));

        let snapshot = engine.get("cpu");
        assert_eq!(collect(&snapshot), vec![("cpu".to_string(), 0.7, 100)]);
        assert_eq!(engine.stats().samples, 1);
    }

    #[test]
    fn test_samples_sorted_by_timestamp() {
        let engine = StorageEngine::new();

        engine.put("cpu", 3.0, 300);
        engine.put("cpu", 1.0, 100);
        engine.put("cpu", 2.0, -5);

        let timestamps: Vec<i64> = engine.get("cpu").iter_samples().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![-5, 100, 300]);
    }

    #[test]
    fn test_wildcard_returns_every_key() {
        let engine = StorageEngine::new();

        engine.put("memory", 10.0, 2);
        engine.put("cpu", 0.5, 1);
        engine.put("memory", 8.0, 1);

        let snapshot = engine.get(WILDCARD);
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["cpu", "memory"]);
        assert_eq!(
            collect(&snapshot),
            vec![
                ("cpu".to_string(), 0.5, 1),
                ("memory".to_string(), 8.0, 1),
                ("memory".to_string(), 10.0, 2),
            ]
        );
    }

    #[test]
    fn test_wildcard_on_empty_store() {
        let engine = StorageEngine::new();
        assert!(engine.get(WILDCARD).is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let engine = StorageEngine::new();
        engine.put("cpu", 0.5, 100);

        let single = engine.get("cpu");
        let all = engine.get(WILDCARD);

        engine.put("cpu", 0.9, 100);
        engine.put("cpu", 1.5, 200);
        engine.put("disk", 1.0, 1);

        assert_eq!(collect(&single), vec![("cpu".to_string(), 0.5, 100)]);
        assert_eq!(collect(&all), vec![("cpu".to_string(), 0.5, 100)]);
    }

    #[test]
    fn test_key_is_not_validated() {
        let engine = StorageEngine::new();
        engine.put("host.eu-1/cpu:total", 1.0, 0);
        assert_eq!(engine.get("host.eu-1/cpu:total").len(), 1);
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.put("a", 1.0, 1);
        engine.put("a", 2.0, 2);
        engine.put("a", 3.0, 2);
        engine.put("b", 1.0, 1);
        engine.get("a");
        engine.get(WILDCARD);

        assert_eq!(
            engine.stats(),
            StorageStats {
                keys: 2,
                samples: 3,
                put_ops: 4,
                get_ops: 2,
            }
        );
        assert_eq!(engine.len(), 2);
        assert!(!engine.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}", i);
                    engine.put(&key, j as f64, j);
                    engine.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 10);
        let snapshot = engine.get(WILDCARD);
        assert_eq!(snapshot.len(), 1000);
    }

    #[test]
    fn test_wildcard_snapshot_is_point_in_time() {
        // Keys are written one after another and land in different shards, so
        // any consistent snapshot holds exactly the first N keys.
        const KEYS: usize = 2000;

        let engine = Arc::new(StorageEngine::new());
        let writer = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..KEYS {
                    engine.put(&format!("k{}", i), i as f64, i as i64);
                }
            })
        };

        let mut last = 0;
        while last < KEYS {
            let snapshot = engine.get(WILDCARD);
            let count = snapshot.keys().count();
            for i in 0..count {
                assert!(
                    snapshot.series(&format!("k{}", i)).is_some(),
                    "snapshot of {} keys is missing k{}",
                    count,
                    i
                );
            }
            assert!(count >= last);
            last = count;
        }

        writer.join().unwrap();
    }
}
