//! In-memory TTL + LRU caching for provider responses.
//!
//! Each provider client owns its own caches; nothing here is shared across
//! providers. Expiry is lazy: a stale entry is removed by the `get` that finds
//! it, and [`spawn_pruner`] sweeps the rest in the background.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Read-only counters for operational health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl CacheStats {
    fn from_counts(hits: u64, misses: u64, size: usize) -> Self {
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        Self {
            hits,
            misses,
            size,
            hit_rate,
        }
    }

    /// Sums counters of several caches and recomputes the hit rate.
    pub fn merge(self, other: Self) -> Self {
        Self::from_counts(
            self.hits + other.hits,
            self.misses + other.misses,
            self.size + other.size,
        )
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    tick: u64,
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency index: lowest tick is least recently used.
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    hits: u64,
    misses: u64,
}

impl<V: Clone> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => now > entry.expires_at,
        };

        if expired {
            self.remove(key);
            self.misses += 1;
            return None;
        }

        let tick = self.bump();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, key.to_owned());
        self.hits += 1;
        Some(entry.value.clone())
    }

    fn set(&mut self, key: String, value: V, expires_at: Instant, max_size: usize) {
        self.remove(&key);

        if self.entries.len() >= max_size {
            if let Some((_, lru_key)) = self.recency.pop_first() {
                self.entries.remove(&lru_key);
            }
        }

        let tick = self.bump();
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                tick,
            },
        );
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.tick);
                true
            }
            None => false,
        }
    }

    fn prune_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

/// Bounded, thread-safe cache with per-entry TTL and LRU eviction.
///
/// Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    name: &'static str,
    max_size: usize,
    default_ttl: Duration,
    inner: Arc<Mutex<CacheInner<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, max_size: usize, default_ttl: Duration) -> Self {
        Self {
            name,
            max_size: max_size.max(1),
            default_ttl,
            inner: Arc::new(Mutex::new(CacheInner::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        // Every mutation leaves the maps consistent, so a poisoned guard is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value when present and fresh. A stale entry is evicted and
    /// counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().get(key, Instant::now())
    }

    /// Inserts `value`, evicting the least recently used entry when full.
    /// `ttl = None` uses the cache default.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.lock()
            .set(key.into(), value, expires_at, self.max_size);
    }

    /// Freshness check that does not touch recency or hit counters.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| now <= entry.expires_at)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn prune_expired(&self) -> usize {
        self.lock().prune_expired(Instant::now())
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats::from_counts(inner.hits, inner.misses, inner.entries.len())
    }

    /// Returns the cached value or runs `fetch` and stores its success.
    ///
    /// Concurrent misses on the same key are not coalesced: each runs `fetch`
    /// and the last write wins. Errors are returned and never cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Periodically drops expired entries until `token` is cancelled.
    pub fn spawn_pruner(&self, every: Duration, token: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        spawn_pruner(every, token, move || cache.prune_expired())
    }
}

/// Runs `prune` every `every` until `token` is cancelled.
///
/// The task never touches request paths; a slow tick only delays the next sweep.
pub fn spawn_pruner<F>(every: Duration, token: CancellationToken, prune: F) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("cache pruner stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = prune();
                    if removed > 0 {
                        debug!(removed, "pruned expired cache entries");
                    }
                }
            }
        }
    })
}
