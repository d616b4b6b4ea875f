//! The cache instances shared by a detector and its probe runner.

use crate::cache::{CacheConfig, TtlCache};
use crate::{ConfigError, DetectOptions, DetectionResult, ProbeOutcome};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Entry counts per cache instance, including not-yet-pruned expired entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheSizes {
    /// File-read and subprocess outcomes.
    pub probes: usize,
    /// File-existence outcomes.
    pub files: usize,
    /// Per-category detection results.
    pub detections: usize,
}

/// Owns the probe-outcome, file-existence and detection-result caches.
///
/// Each cache sits behind its own mutex. Locks are only taken inside
/// synchronous cache calls, never across an `.await`, so every `get`/`set`
/// is atomic with respect to other cache operations.
#[derive(Debug)]
pub struct CacheRegistry {
    probes: Mutex<TtlCache<ProbeOutcome>>,
    files: Mutex<TtlCache<ProbeOutcome>>,
    detections: Mutex<TtlCache<DetectionResult>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Cache state stays consistent even if a holder panicked.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheRegistry {
    /// Build the three caches from detection options.
    ///
    /// The probe-outcome cache refuses values above `max_read_size`, so large
    /// file contents are returned to the caller but never retained.
    pub fn new(options: &DetectOptions) -> Result<Self, ConfigError> {
        let probe_limit = match options.cache.max_value_size {
            Some(limit) => limit.min(options.max_read_size),
            None => options.max_read_size,
        };
        let probe_config = CacheConfig {
            max_value_size: Some(probe_limit),
            ..options.cache.clone()
        };

        Ok(Self {
            probes: Mutex::new(TtlCache::new(&probe_config)?),
            files: Mutex::new(TtlCache::new(&options.cache)?),
            detections: Mutex::new(TtlCache::new(&options.cache)?),
        })
    }

    pub(crate) fn probes(&self) -> MutexGuard<'_, TtlCache<ProbeOutcome>> {
        lock(&self.probes)
    }

    pub(crate) fn files(&self) -> MutexGuard<'_, TtlCache<ProbeOutcome>> {
        lock(&self.files)
    }

    pub(crate) fn detections(&self) -> MutexGuard<'_, TtlCache<DetectionResult>> {
        lock(&self.detections)
    }

    /// Empty all three caches.
    pub fn clear(&self) {
        self.probes().clear();
        self.files().clear();
        self.detections().clear();
    }

    /// Drop expired entries from all caches, returning how many were removed.
    pub fn prune(&self) -> usize {
        self.probes().prune() + self.files().prune() + self.detections().prune()
    }

    /// Current entry counts.
    pub fn sizes(&self) -> CacheSizes {
        CacheSizes {
            probes: self.probes().len(),
            files: self.files().len(),
            detections: self.detections().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Payload, ProbeError};
    use std::time::Duration;

    #[test]
    fn test_invalid_options_rejected() {
        let options = DetectOptions {
            cache: CacheConfig {
                ttl: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            CacheRegistry::new(&options).unwrap_err(),
            ConfigError::InvalidTtl
        );
    }

    #[test]
    fn test_probe_cache_limited_by_read_size() {
        let options = DetectOptions {
            max_read_size: 8,
            ..Default::default()
        };
        let registry = CacheRegistry::new(&options).unwrap();

        let small = ProbeOutcome::new("read:/a", Ok(Payload::Text("12345678".into())));
        let large = ProbeOutcome::new("read:/b", Ok(Payload::Text("123456789".into())));
        assert!(registry.probes().set("read:/a", small));
        assert!(!registry.probes().set("read:/b", large));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_counts_across_caches() {
        let registry = CacheRegistry::new(&DetectOptions::default()).unwrap();
        registry.probes().set(
            "exec:git --version",
            ProbeOutcome::new("exec:git --version", Ok(Payload::Text("2.43.0".into()))),
        );
        registry
            .files()
            .set("/x", ProbeOutcome::new("/x", Ok(Payload::Flag(true))));
        tokio::time::advance(Duration::from_secs(30)).await;
        registry
            .detections()
            .set("ci", DetectionResult::new("ci", None));

        // The first two entries outlive the TTL before the detection does.
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(registry.prune(), 2);
        assert_eq!(
            registry.sizes(),
            CacheSizes {
                probes: 0,
                files: 0,
                detections: 1
            }
        );

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.sizes(), CacheSizes::default());
    }

    #[test]
    fn test_clear_and_sizes() {
        let registry = CacheRegistry::new(&DetectOptions::default()).unwrap();
        registry.files().set(
            "/x",
            ProbeOutcome::new(
                "/x",
                Err(ProbeError::NotFound {
                    target: "/x".into(),
                }),
            ),
        );
        registry
            .detections()
            .set("ci", DetectionResult::new("ci", None));

        assert_eq!(
            registry.sizes(),
            CacheSizes {
                probes: 0,
                files: 1,
                detections: 1
            }
        );
        registry.clear();
        assert_eq!(registry.sizes(), CacheSizes::default());
    }
}
