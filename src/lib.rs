//! # envprobe
//!
//! Cached, timeout-guarded detection of environment facts: which CI system,
//! deployment target and package manager a project uses, and which tools are
//! installed.
//!
//! Detection is organized around catalogs of probes. A probe is a single
//! cheap check (does a file exist, can it be read, does a command exit
//! successfully). A catalog is an ordered list of probes for one category;
//! the label of the first matching probe is the category's answer.
//!
//! ## Features
//!
//! - `TtlCache`: bounded FIFO cache with per-entry expiry and value size limit
//! - `with_timeout`: deadline guard for any async operation
//! - `ProbeRunner`: runs one probe through the guard and memoizes the outcome
//! - `Detector`: runs a whole catalog concurrently and picks the answer by
//!   declared priority, caching it per category
//! - `Category`: built-in catalogs for CI, deployment, package manager and
//!   state directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use envprobe::{Category, DetectOptions, Detector};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), envprobe::ConfigError> {
//!     let detector = Detector::new(DetectOptions::from_env()?)?;
//!
//!     // Detect a single category
//!     let ci = detector.detect_category(Category::Ci).await;
//!     println!("CI: {:?}", ci.label);
//!
//!     // Detect all built-in categories in parallel
//!     let report = detector.detect_all().await;
//!     for (category, label) in report.iter() {
//!         println!("{}: {}", category, label.unwrap_or("unknown"));
//!     }
//!
//!     // Check an installed tool
//!     if let Some(version) = detector.detect_tool("git").await? {
//!         println!("git {}", version);
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod category;
mod detect;
mod detection;
mod error;
mod options;
mod probe;
mod registry;

pub use cache::{CacheConfig, TtlCache, ValueSize, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use category::Category;
pub use detect::{DetectionReport, DetectionResult, Detector};
pub use detection::{
    with_timeout, ProbeExecutor, ProbeRunner, SystemExecutor, TimeoutError, DEFAULT_DEADLINE,
};
pub use error::{ConfigError, ProbeError};
pub use options::{
    state_dir_override, DetectOptions, CACHE_MAX_SIZE_ENV, CACHE_MAX_VALUE_SIZE_ENV,
    CACHE_TTL_ENV, DEFAULT_MAX_READ_SIZE, PROBE_TIMEOUT_ENV, STATE_DIR_ENV,
};
pub use probe::{Catalog, Payload, ProbeDescriptor, ProbeKind, ProbeOutcome};
pub use registry::{CacheRegistry, CacheSizes};
