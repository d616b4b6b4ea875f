//! Bounded, time-expiring key/value cache.
//!
//! [`TtlCache`] knows nothing about what it stores. It enforces three limits:
//!
//! - **Capacity**: at most `max_size` entries, evicting the oldest-inserted
//!   entry first (FIFO). Reading an entry does not refresh its position.
//! - **Age**: an entry is visible only while `now - inserted_at <= ttl`.
//!   Expired entries are removed lazily on access or eagerly by
//!   [`TtlCache::prune`].
//! - **Value size**: with `max_value_size` configured, values whose
//!   [`ValueSize`] exceeds it are refused by [`TtlCache::set`].
//!
//! Time is read from [`tokio::time::Instant`], so paused-clock tests can
//! advance it deterministically.

use crate::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Default maximum number of entries.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default time-to-live for an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Size limits and expiry for a [`TtlCache`].
///
/// # Example
///
/// ```rust
/// use envprobe::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig {
///     max_size: 10,
///     ttl: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert!(config.max_value_size.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries. Zero is allowed: nothing is ever retained.
    ///
    /// Default: 100
    pub max_size: usize,

    /// How long an entry stays visible after it was set.
    ///
    /// Default: 60 seconds
    pub ttl: Duration,

    /// Largest accepted [`ValueSize`]; `None` means unlimited.
    ///
    /// Default: `None`
    pub max_value_size: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: DEFAULT_TTL,
            max_value_size: None,
        }
    }
}

impl CacheConfig {
    /// Reject parameters that cannot describe a working cache.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidTtl);
        }
        if self.max_value_size == Some(0) {
            return Err(ConfigError::InvalidMaxValueSize);
        }
        Ok(())
    }
}

/// Length used to enforce `max_value_size`.
///
/// For text this is the byte length; structured values report the length of
/// their textual content.
pub trait ValueSize {
    /// Size of the value in bytes.
    fn value_size(&self) -> usize;
}

impl ValueSize for String {
    fn value_size(&self) -> usize {
        self.len()
    }
}

impl ValueSize for Vec<u8> {
    fn value_size(&self) -> usize {
        self.len()
    }
}

impl ValueSize for bool {
    fn value_size(&self) -> usize {
        1
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    seq: u64,
}

/// FIFO-evicting cache with per-entry expiry.
///
/// All methods are synchronous; none of them suspend.
///
/// # Example
///
/// ```rust
/// use envprobe::{CacheConfig, TtlCache};
///
/// let mut cache = TtlCache::new(&CacheConfig {
///     max_size: 2,
///     ..Default::default()
/// })
/// .unwrap();
///
/// assert!(cache.set("a", "1".to_string()));
/// assert!(cache.set("b", "2".to_string()));
/// assert!(cache.set("c", "3".to_string()));
///
/// // "a" was inserted first, so it was evicted.
/// assert!(!cache.has("a"));
/// assert_eq!(cache.get("c").map(String::as_str), Some("3"));
/// ```
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    max_size: usize,
    ttl: Duration,
    max_value_size: Option<usize>,
}

fn is_expired<V>(entry: &CacheEntry<V>, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(entry.inserted_at) > ttl
}

impl<V: ValueSize> TtlCache<V> {
    /// Create an empty cache, validating the configuration.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            max_size: config.max_size,
            ttl: config.ttl,
            max_value_size: config.max_value_size,
        })
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => is_expired(entry, self.ttl, Instant::now()),
            None => return None,
        };
        if expired {
            trace!(key, "cache entry expired");
            self.remove_entry(key);
            return None;
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Store a value, returning whether it was stored.
    ///
    /// Values larger than `max_value_size` are refused and any previous value
    /// under `key` is dropped. Re-setting a key moves it to the back of the
    /// eviction order and restarts its expiry clock.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        self.remove_entry(&key);

        if let Some(limit) = self.max_value_size {
            let size = value.value_size();
            if size > limit {
                trace!(key = %key, size, limit, "value exceeds max value size");
                return false;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                seq,
            },
        );

        while self.entries.len() > self.max_size {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            trace!(key = %oldest, "evicting oldest cache entry");
            self.entries.remove(&oldest);
        }
        true
    }

    /// Whether a live entry exists. Counts as an access for lazy expiry.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove an entry, returning whether it was present (expired or not).
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Remove all expired entries, returning how many were removed.
    pub fn prune(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| is_expired(entry, self.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
        }
        if !expired.is_empty() {
            trace!(removed = expired.len(), "pruned expired cache entries");
        }
        expired.len()
    }

    /// Number of stored entries.
    ///
    /// This counts storage occupancy: expired entries that have not been
    /// accessed or pruned yet are included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max_size: usize, ttl_ms: u64) -> TtlCache<String> {
        TtlCache::new(&CacheConfig {
            max_size,
            ttl: Duration::from_millis(ttl_ms),
            max_value_size: None,
        })
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 100);
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.max_value_size, None);
    }

    #[test]
    fn test_limits_come_from_config() {
        let cache = cache(3, 500);
        assert_eq!(cache.max_size(), 3);
        assert_eq!(cache.ttl(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_ttl = CacheConfig {
            ttl: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            TtlCache::<String>::new(&zero_ttl).unwrap_err(),
            ConfigError::InvalidTtl
        );

        let zero_value = CacheConfig {
            max_value_size: Some(0),
            ..Default::default()
        };
        assert_eq!(
            TtlCache::<String>::new(&zero_value).unwrap_err(),
            ConfigError::InvalidMaxValueSize
        );
    }

    #[test]
    fn test_get_set_delete() {
        let mut cache = cache(10, 60_000);
        assert!(cache.get("missing").is_none());

        assert!(cache.set("k", "v".to_string()));
        assert_eq!(cache.get("k").map(String::as_str), Some("v"));
        assert!(cache.has("k"));

        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
        assert!(!cache.has("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_never_exceeds_max() {
        let mut cache = cache(3, 60_000);
        for i in 0..20 {
            cache.set(format!("key-{}", i), i.to_string());
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = cache(3, 60_000);
        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string());
        }
        // Reading "a" must not protect it: eviction is FIFO, not LRU.
        assert!(cache.has("a"));
        cache.set("d", "d".to_string());

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert!(cache.has("d"));
    }

    #[test]
    fn test_reset_moves_key_to_back() {
        let mut cache = cache(2, 60_000);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "3".to_string());
        cache.set("c", "4".to_string());

        assert!(!cache.has("b"));
        assert_eq!(cache.get("a").map(String::as_str), Some("3"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_zero_max_size_retains_nothing() {
        let mut cache = cache(0, 60_000);
        assert!(cache.set("a", "1".to_string()));
        assert!(!cache.has("a"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_oversized_value_rejected() {
        let mut cache = TtlCache::new(&CacheConfig {
            max_value_size: Some(4),
            ..Default::default()
        })
        .unwrap();

        assert!(!cache.set("big", "12345".to_string()));
        assert!(!cache.has("big"));

        assert!(cache.set("fits", "1234".to_string()));
        assert!(cache.has("fits"));

        // A refused overwrite does not leave the previous value behind.
        assert!(!cache.set("fits", "123456".to_string()));
        assert!(!cache.has("fits"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let mut cache = cache(10, 100);
        cache.set("k", "v".to_string());

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(cache.has("k"), "entry is still visible exactly at ttl");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.has("k"));
        // Lazy expiry removed it from storage.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_expiry_clock() {
        let mut cache = cache(10, 100);
        cache.set("k", "old".to_string());
        tokio::time::advance(Duration::from_millis(80)).await;
        cache.set("k", "new".to_string());
        tokio::time::advance(Duration::from_millis(80)).await;

        assert_eq!(cache.get("k").map(String::as_str), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_len_counts_unpruned_expired_entries() {
        let mut cache = cache(10, 100);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        tokio::time::advance(Duration::from_millis(150)).await;
        cache.set("c", "3".to_string());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.prune(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("c"));
        assert_eq!(cache.prune(), 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = cache(10, 60_000);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.has("a"));

        // Order bookkeeping was reset too: capacity is fully available again.
        for key in ["x", "y", "z"] {
            cache.set(key, key.to_string());
        }
        assert_eq!(cache.len(), 3);
    }
}
