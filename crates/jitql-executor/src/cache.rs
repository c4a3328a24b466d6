//! Compilation cache for query execution.
//!
//! Provides an LRU cache with optional TTL expiration that maps a content
//! hash of the raw query text to the number of times the query has been
//! seen and, once it has been compiled, the compiled artifact.
//! Thread-safe using a `parking_lot::Mutex` for LRU operations.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::config::CacheConfig;
use crate::error::{ExecutorError, ExecutorResult};

/// Content-addressed cache key: the SHA-256 digest of the raw query text.
///
/// No normalization is applied, so two queries that differ only in
/// whitespace or letter case get different keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derives the key for a query text.
    pub fn from_query(query: &str) -> Self {
        Self(Sha256::digest(query.as_bytes()).into())
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self)
    }
}

/// What the cache knows about one query text.
pub struct CacheEntry<A> {
    /// Number of parseable and valid occurrences recorded so far.
    pub occurrence_count: u64,
    /// The compiled artifact, present once compilation succeeded.
    pub compiled: Option<Arc<A>>,
    /// Set when compilation failed and the failure is being remembered.
    pub compile_failed: bool,
}

impl<A> CacheEntry<A> {
    /// An entry recording `occurrence_count` sightings and no artifact.
    pub fn seen(occurrence_count: u64) -> Self {
        Self {
            occurrence_count,
            compiled: None,
            compile_failed: false,
        }
    }

    /// An entry holding a compiled artifact.
    pub fn compiled(occurrence_count: u64, artifact: Arc<A>) -> Self {
        Self {
            occurrence_count,
            compiled: Some(artifact),
            compile_failed: false,
        }
    }

    /// An entry remembering that compilation was attempted and failed.
    pub fn not_compilable(occurrence_count: u64) -> Self {
        Self {
            occurrence_count,
            compiled: None,
            compile_failed: true,
        }
    }

    /// Returns true if a compiled artifact is stored.
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }
}

impl<A> Default for CacheEntry<A> {
    fn default() -> Self {
        Self::seen(0)
    }
}

impl<A> Clone for CacheEntry<A> {
    fn clone(&self) -> Self {
        Self {
            occurrence_count: self.occurrence_count,
            compiled: self.compiled.clone(),
            compile_failed: self.compile_failed,
        }
    }
}

impl<A> fmt::Debug for CacheEntry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("occurrence_count", &self.occurrence_count)
            .field("compiled", &self.is_compiled())
            .field("compile_failed", &self.compile_failed)
            .finish()
    }
}

/// A stored entry with expiration tracking.
struct Slot<A> {
    entry: CacheEntry<A>,
    stored_at: Instant,
}

impl<A> Slot<A> {
    fn new(entry: CacheEntry<A>) -> Self {
        Self {
            entry,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.stored_at.elapsed() > ttl)
    }
}

/// Thread-safe LRU cache of compiled queries, keyed by query content hash.
///
/// # Features
///
/// - **LRU Eviction**: When the cache is full, the least recently used entry is evicted.
/// - **TTL Expiration**: If configured, entries are treated as absent once
///   their time-to-live has elapsed. Expiry is lazy: an expired entry is
///   dropped when it is next accessed.
/// - **Atomic updates**: [`update`](Self::update) runs a read-modify-write
///   under the store lock.
///
/// # Example
///
/// ```
/// use jitql_executor::{CacheConfig, CacheEntry, QueryCache};
///
/// let cache: QueryCache<String> = QueryCache::new(CacheConfig::with_max_size(100)).unwrap();
///
/// assert_eq!(cache.get("{ posts { id } }").occurrence_count, 0);
///
/// cache.set("{ posts { id } }", CacheEntry::seen(1));
/// assert_eq!(cache.get("{ posts { id } }").occurrence_count, 1);
/// ```
pub struct QueryCache<A> {
    inner: Mutex<LruCache<CacheKey, Slot<A>>>,
    capacity: NonZeroUsize,
    ttl: Option<Duration>,
}

impl<A> QueryCache<A> {
    /// Creates a new cache with the given configuration.
    ///
    /// Fails if `max_size` is zero or `ttl_ms` is `Some(0)`.
    pub fn new(config: CacheConfig) -> ExecutorResult<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_size).ok_or_else(|| {
            ExecutorError::InvalidConfig("cache maxSize must be a positive integer".to_string())
        })?;
        Ok(Self::build(capacity, config.ttl()))
    }

    /// Creates a cache with custom capacity and TTL.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(max_size: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self::build(capacity, ttl)
    }

    fn build(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
            ttl,
        }
    }

    /// Returns the key a query text is stored under.
    pub fn key_for(query: &str) -> CacheKey {
        CacheKey::from_query(query)
    }

    /// Gets the entry stored for a query text.
    ///
    /// Returns the zero-state entry if nothing is stored or the stored entry
    /// has expired. On hit, the entry is promoted to most-recently-used.
    /// The occurrence count is never changed by reading.
    pub fn get(&self, query: &str) -> CacheEntry<A> {
        let key = CacheKey::from_query(query);
        let mut cache = self.inner.lock();
        self.live_entry(&mut cache, &key).unwrap_or_default()
    }

    /// Stores an entry for a query text, replacing any previous one.
    ///
    /// If the cache is full, the least recently used entry is evicted.
    /// Storing restarts the entry's time-to-live.
    pub fn set(&self, query: &str, entry: CacheEntry<A>) {
        let key = CacheKey::from_query(query);
        let mut cache = self.inner.lock();
        Self::store(&mut cache, key, entry);
    }

    /// Atomically reads and optionally replaces the entry for a query text.
    ///
    /// `f` receives the current entry (the zero state if absent or expired)
    /// and returns the replacement to store, or `None` to leave the cache
    /// untouched, together with a value handed back to the caller.
    ///
    /// `f` runs while the cache lock is held and must not call back into
    /// this cache.
    pub fn update<R, F>(&self, query: &str, f: F) -> R
    where
        F: FnOnce(CacheEntry<A>) -> (Option<CacheEntry<A>>, R),
    {
        let key = CacheKey::from_query(query);
        let mut cache = self.inner.lock();
        let current = self.live_entry(&mut cache, &key).unwrap_or_default();
        let (replacement, output) = f(current);
        if let Some(entry) = replacement {
            Self::store(&mut cache, key, entry);
        }
        output
    }

    fn live_entry(
        &self,
        cache: &mut LruCache<CacheKey, Slot<A>>,
        key: &CacheKey,
    ) -> Option<CacheEntry<A>> {
        // `get` promotes to MRU; expired entries are dropped here
        let expired = cache.get(key)?.is_expired(self.ttl);
        if expired {
            trace!(key = %key, "query cache entry expired");
            cache.pop(key);
            return None;
        }
        cache.peek(key).map(|slot| slot.entry.clone())
    }

    fn store(cache: &mut LruCache<CacheKey, Slot<A>>, key: CacheKey, entry: CacheEntry<A>) {
        if let Some((evicted, _)) = cache.push(key, Slot::new(entry)) {
            if evicted != key {
                trace!(key = %evicted, "query cache entry evicted");
            }
        }
    }

    /// Checks if a live entry exists for a query text (without affecting LRU order).
    pub fn contains(&self, query: &str) -> bool {
        let key = CacheKey::from_query(query);
        let cache = self.inner.lock();
        cache
            .peek(&key)
            .is_some_and(|slot| !slot.is_expired(self.ttl))
    }

    /// Returns the number of entries currently in the cache.
    ///
    /// Note: This may include expired entries that haven't been cleaned up yet.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Clears all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Removes expired entries from the cache.
    ///
    /// Expired entries are otherwise only dropped when accessed.
    pub fn cleanup_expired(&self) {
        if self.ttl.is_none() {
            return;
        }
        let mut cache = self.inner.lock();
        let expired_keys: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, slot)| slot.is_expired(self.ttl))
            .map(|(key, _)| *key)
            .collect();

        for key in expired_keys {
            cache.pop(&key);
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let cache = self.inner.lock();
        let mut stats = CacheStats {
            total_entries: cache.len(),
            ..CacheStats::default()
        };
        for (_, slot) in cache.iter() {
            if slot.is_expired(self.ttl) {
                stats.expired_entries += 1;
            } else if slot.entry.is_compiled() {
                stats.compiled_entries += 1;
            }
        }
        stats.valid_entries = stats.total_entries - stats.expired_entries;
        stats
    }
}

impl<A> fmt::Debug for QueryCache<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("QueryCache")
            .field("entries", &stats.total_entries)
            .field("compiled", &stats.compiled_entries)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Statistics about the cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries in the cache.
    pub total_entries: usize,
    /// Number of expired entries (not yet cleaned up).
    pub expired_entries: usize,
    /// Number of valid (non-expired) entries.
    pub valid_entries: usize,
    /// Number of valid entries holding a compiled artifact.
    pub compiled_entries: usize,
}
