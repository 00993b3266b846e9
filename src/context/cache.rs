//! Context Cache
//!
//! Bounded key-value store with importance-weighted, TTL-aware eviction.

use hashbrown::HashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{MemoraError, Result};
use crate::metrics::Metrics;

/// Time source for TTL bookkeeping
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock, the default time source
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for simulating TTL expiry without sleeping
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }
}

/// Context cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries (must be at least 1)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Entry in the cache with eviction priority and expiration
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    importance: f32,
    created_at: Instant,
    ttl: Option<Duration>,
    /// Insertion sequence, breaks ordering ties under identical timestamps
    seq: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.ttl
            .map(|ttl| now.saturating_duration_since(self.created_at) > ttl)
            .unwrap_or(false)
    }
}

/// Snapshot of a live entry returned by ranked reads
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<V> {
    pub key: String,
    pub value: V,
    pub importance: f32,
}

/// Bounded in-memory context cache
///
/// Eviction is importance/TTL driven, not recency driven: reads never
/// promote an entry. Handles are cheap to clone and share the same
/// underlying entries.
pub struct ContextCache<V> {
    inner: Arc<CacheInner<V>>,
}

struct CacheInner<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
    seq: AtomicU64,
    metrics: Arc<Metrics>,
}

impl<V> Clone for ContextCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone> ContextCache<V> {
    /// Create a cache using the wall clock
    ///
    /// Fails with `InvalidConfig` when the configured capacity is zero.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an injected time source
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.capacity == 0 {
            return Err(MemoraError::InvalidConfig(
                "context cache capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                capacity: config.capacity,
                clock,
                seq: AtomicU64::new(0),
                metrics: Arc::new(Metrics::new()),
            }),
        })
    }

    /// Get the configured capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Insert or overwrite an entry
    ///
    /// Importance is clamped to [0.0, 1.0]. Expired entries are discarded
    /// before the capacity check; when a new key would still exceed
    /// capacity, the lowest-importance entry (oldest on ties) is evicted
    /// first. Overwriting an existing live key never evicts.
    pub fn set(&self, key: impl Into<String>, value: V, importance: f32, ttl: Option<Duration>) {
        let key = key.into();
        let importance = clamp_importance(importance);
        let now = self.inner.clock.now();

        let mut entries = self.inner.entries.write().unwrap();
        self.discard_expired(&mut entries, now);

        if !entries.contains_key(&key) && entries.len() >= self.inner.capacity {
            self.evict_one(&mut entries);
        }

        let seq = self.inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
        entries.insert(
            key,
            Entry {
                value,
                importance,
                created_at: now,
                ttl,
                seq,
            },
        );
        self.inner.metrics.record_upsert();
    }

    /// Get a value, absent when the key is missing or expired
    ///
    /// Does not touch importance or creation time.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.write().unwrap();
        self.discard_expired(&mut entries, now);

        match entries.get(key) {
            Some(entry) => {
                self.inner.metrics.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.inner.metrics.record_miss();
                None
            }
        }
    }

    /// Delete an entry, returns true if it existed
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.inner.entries.write().unwrap().remove(key).is_some();
        if existed {
            self.inner.metrics.record_delete();
        }
        existed
    }

    /// Get all live entries with `importance >= threshold`
    ///
    /// Ordered by descending importance, most recently created first on
    /// ties.
    pub fn get_by_importance(&self, threshold: f32) -> Vec<RankedEntry<V>> {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.write().unwrap();
        self.discard_expired(&mut entries, now);

        let mut ranked: Vec<(RankedEntry<V>, Instant, u64)> = entries
            .iter()
            .filter(|(_, entry)| entry.importance >= threshold)
            .map(|(key, entry)| {
                (
                    RankedEntry {
                        key: key.clone(),
                        value: entry.value.clone(),
                        importance: entry.importance,
                    },
                    entry.created_at,
                    entry.seq,
                )
            })
            .collect();

        ranked.sort_by(|(a, a_created, a_seq), (b, b_created, b_seq)| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b_created.cmp(a_created))
                .then_with(|| b_seq.cmp(a_seq))
        });

        ranked.into_iter().map(|(entry, _, _)| entry).collect()
    }

    /// Physically remove expired entries, returns count of removed entries
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.write().unwrap();
        self.discard_expired(&mut entries, now)
    }

    /// Get the number of live entries
    pub fn len(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries.write().unwrap();
        self.discard_expired(&mut entries, now);
        entries.len()
    }

    /// Check if no live entries remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.inner.entries.write().unwrap().clear();
    }

    /// Get this cache's operation counters
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    fn discard_expired(&self, entries: &mut HashMap<String, Entry<V>>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            self.inner.metrics.record_expirations(removed as u64);
            debug!(removed = removed, "Discarded expired context entries");
        }
        removed
    }

    /// Evict the lowest-importance entry, oldest first on ties
    fn evict_one(&self, entries: &mut HashMap<String, Entry<V>>) {
        let victim = entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.importance
                    .partial_cmp(&b.importance)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.seq.cmp(&b.seq))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            entries.remove(&key);
            self.inner.metrics.record_eviction();
            debug!(key = %key, "Evicted lowest-importance context entry");
        }
    }
}

/// Clamp importance into [0.0, 1.0]; non-finite input counts as 0.0
fn clamp_importance(importance: f32) -> f32 {
    if importance.is_finite() {
        importance.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
