//! Detection options configuration.
//!
//! This module provides the [`DetectOptions`] struct for configuring probe
//! deadlines, cache limits and the base directory for file probes, plus an
//! environment-variable layer over the defaults.

use crate::cache::CacheConfig;
use crate::detection::DEFAULT_DEADLINE;
use crate::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Default ceiling for file content kept in the probe cache (64 KiB).
pub const DEFAULT_MAX_READ_SIZE: usize = 64 * 1024;

/// Environment variable that pins the `state-dir` category.
pub const STATE_DIR_ENV: &str = "ENVPROBE_STATE_DIR";

/// Per-probe deadline in milliseconds.
pub const PROBE_TIMEOUT_ENV: &str = "ENVPROBE_PROBE_TIMEOUT_MS";
/// Cache time-to-live in milliseconds.
pub const CACHE_TTL_ENV: &str = "ENVPROBE_CACHE_TTL_MS";
/// Maximum entries per cache.
pub const CACHE_MAX_SIZE_ENV: &str = "ENVPROBE_CACHE_MAX_SIZE";
/// Maximum cached value size in bytes.
pub const CACHE_MAX_VALUE_SIZE_ENV: &str = "ENVPROBE_CACHE_MAX_VALUE_SIZE";

/// Value of [`STATE_DIR_ENV`], read once per process.
///
/// Later changes to the environment are not observed.
pub fn state_dir_override() -> Option<&'static str> {
    static OVERRIDE: OnceLock<Option<String>> = OnceLock::new();
    OVERRIDE
        .get_or_init(|| std::env::var(STATE_DIR_ENV).ok().filter(|v| !v.is_empty()))
        .as_deref()
}

/// Configuration options for detection.
///
/// # Default Behavior
///
/// Each probe gets 5 seconds. Caches hold up to 100 entries for 60 seconds,
/// and file contents above 64 KiB are returned but not cached. Relative file
/// probes resolve against the current working directory.
///
/// # Example
///
/// ```rust
/// use envprobe::DetectOptions;
/// use std::time::Duration;
///
/// let opts = DetectOptions {
///     timeout: Duration::from_secs(2),
///     root: "/srv/app".into(),
///     ..Default::default()
/// };
/// assert_eq!(opts.cache.max_size, 100);
/// ```
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Deadline for each individual probe.
    ///
    /// Default: 5 seconds
    pub timeout: Duration,

    /// Limits shared by all cache instances.
    pub cache: CacheConfig,

    /// File contents longer than this are not cached.
    ///
    /// Default: 64 KiB
    pub max_read_size: usize,

    /// Base directory for relative file probe targets.
    ///
    /// Default: the current working directory
    pub root: PathBuf,

    /// Fixed answer for the `state-dir` category, bypassing detection.
    ///
    /// Default: `None`; [`DetectOptions::from_env`] fills it from
    /// [`STATE_DIR_ENV`].
    pub state_dir_override: Option<String>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DEADLINE,
            cache: CacheConfig::default(),
            max_read_size: DEFAULT_MAX_READ_SIZE,
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            state_dir_override: None,
        }
    }
}

impl DetectOptions {
    /// Defaults overridden by `ENVPROBE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::from_lookup(|var| std::env::var(var).ok())?;
        options.state_dir_override = state_dir_override().map(str::to_string);
        Ok(options)
    }

    /// Defaults overridden by values from `lookup`.
    ///
    /// `lookup` receives a variable name and returns its value, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(ms) = parse_var::<u64, _>(&lookup, PROBE_TIMEOUT_ENV)? {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, CACHE_TTL_ENV)? {
            options.cache.ttl = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var(&lookup, CACHE_MAX_SIZE_ENV)? {
            options.cache.max_size = size;
        }
        if let Some(size) = parse_var(&lookup, CACHE_MAX_VALUE_SIZE_ENV)? {
            options.cache.max_value_size = Some(size);
        }
        if let Some(dir) = lookup(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            options.state_dir_override = Some(dir);
        }
        options.validate()?;
        Ok(options)
    }

    /// Reject options that cannot drive a detector.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.max_read_size == 0 {
            return Err(ConfigError::InvalidMaxValueSize);
        }
        self.cache.validate()
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value: raw,
            }),
    }
}
