//! Category detection over probe catalogs.

use crate::cache::ValueSize;
use crate::detection::{ProbeExecutor, ProbeRunner, SystemExecutor};
use crate::{
    CacheRegistry, Catalog, Category, ConfigError, DetectOptions, ProbeDescriptor, ProbeOutcome,
};
use futures::future::join_all;
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// The answer for one detection category.
///
/// `label` is `None` when no probe matched, meaning "undetermined" rather
/// than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// Category name, e.g. `"package-manager"`.
    pub category: String,
    /// Label of the highest-priority matching probe.
    pub label: Option<String>,
    /// When the catalog was evaluated.
    #[serde(skip)]
    pub evaluated_at: SystemTime,
}

impl DetectionResult {
    pub(crate) fn new(category: impl Into<String>, label: Option<String>) -> Self {
        Self {
            category: category.into(),
            label,
            evaluated_at: SystemTime::now(),
        }
    }
}

impl ValueSize for DetectionResult {
    fn value_size(&self) -> usize {
        self.label.as_ref().map_or(0, String::len)
    }
}

/// Detection results for several categories, keyed by category name.
///
/// Serializes to a flat JSON object: `{"ci": "github-actions", "deployment": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DetectionReport {
    entries: BTreeMap<String, Option<String>>,
}

impl DetectionReport {
    /// Label for `category`; `None` if undetermined or not in the report.
    pub fn label(&self, category: &str) -> Option<&str> {
        self.entries.get(category).and_then(|label| label.as_deref())
    }

    /// Whether `category` was evaluated.
    pub fn contains(&self, category: &str) -> bool {
        self.entries.contains_key(category)
    }

    /// `(category, label)` pairs in category-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(category, label)| (category.as_str(), label.as_deref()))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, result: DetectionResult) {
        self.entries.insert(result.category, result.label);
    }
}

impl FromIterator<DetectionResult> for DetectionReport {
    fn from_iter<I: IntoIterator<Item = DetectionResult>>(iter: I) -> Self {
        let mut report = Self::default();
        for result in iter {
            report.insert(result);
        }
        report
    }
}

/// Runs catalogs of probes and caches the per-category answers.
///
/// A detector owns its [`CacheRegistry`]; two detectors never share cached
/// state.
///
/// # Example
///
/// ```rust,no_run
/// use envprobe::{Catalog, DetectOptions, Detector, ProbeDescriptor};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), envprobe::ConfigError> {
///     let detector = Detector::new(DetectOptions::default())?;
///     let catalog = Catalog::new(vec![
///         ProbeDescriptor::file_exists("pnpm-lock.yaml", "pnpm"),
///         ProbeDescriptor::file_exists("yarn.lock", "yarn"),
///     ])?;
///
///     let result = detector.detect("package-manager", &catalog).await;
///     println!("package manager: {:?}", result.label);
///
///     // After changing the project, drop everything cached.
///     detector.invalidate_cache();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Detector<E = SystemExecutor> {
    runner: ProbeRunner<E>,
    caches: Arc<CacheRegistry>,
    overrides: HashMap<String, String>,
}

impl Detector<SystemExecutor> {
    /// Create a detector that probes the real system.
    pub fn new(options: DetectOptions) -> Result<Self, ConfigError> {
        Self::with_executor(options, SystemExecutor)
    }
}

impl<E: ProbeExecutor> Detector<E> {
    /// Create a detector with a custom probe executor.
    pub fn with_executor(options: DetectOptions, executor: E) -> Result<Self, ConfigError> {
        options.validate()?;
        let caches = Arc::new(CacheRegistry::new(&options)?);
        let runner = ProbeRunner::new(
            executor,
            Arc::clone(&caches),
            options.root.clone(),
            options.timeout,
        );

        let mut overrides = HashMap::new();
        if let Some(dir) = options.state_dir_override {
            overrides.insert(Category::StateDir.name().to_string(), dir);
        }

        Ok(Self {
            runner,
            caches,
            overrides,
        })
    }

    /// Detect `category`, serving a live cached answer when there is one.
    pub async fn detect(&self, category: &str, catalog: &Catalog) -> DetectionResult {
        self.detect_with_refresh(category, catalog, false).await
    }

    /// Detect `category`; with `force_refresh` every probe is re-executed.
    ///
    /// All probes run concurrently and all of them settle (or time out)
    /// before the answer is chosen. The answer is the label of the first
    /// catalog entry whose probe succeeded, so completion order never
    /// affects the result.
    pub async fn detect_with_refresh(
        &self,
        category: &str,
        catalog: &Catalog,
        force_refresh: bool,
    ) -> DetectionResult {
        if let Some(value) = self.overrides.get(category) {
            debug!(category, value = %value, "detection pinned by override");
            return DetectionResult::new(category, Some(value.clone()));
        }

        if !force_refresh {
            let cached = self.caches.detections().get(category).cloned();
            if let Some(result) = cached {
                debug!(category, label = ?result.label, "detection cache hit");
                return result;
            }
        }

        let outcomes: Vec<ProbeOutcome> = join_all(catalog.iter().map(|probe| async move {
            if force_refresh {
                self.runner.run_fresh(probe).await
            } else {
                self.runner.run(probe).await
            }
        }))
        .await;

        let label = select_label(catalog.probes(), &outcomes);
        debug!(category, label = ?label, probes = catalog.len(), "detection evaluated");

        let result = DetectionResult::new(category, label);
        self.caches
            .detections()
            .set(category.to_string(), result.clone());
        result
    }

    /// Detect a built-in category with its default catalog.
    pub async fn detect_category(&self, category: Category) -> DetectionResult {
        self.detect(category.name(), &category.catalog()).await
    }

    /// Detect every built-in category concurrently.
    pub async fn detect_all(&self) -> DetectionReport {
        let catalogs: Vec<(Category, Catalog)> = Category::all()
            .map(|category| (category, category.catalog()))
            .collect();
        self.report(
            catalogs
                .iter()
                .map(|(category, catalog)| (category.name(), catalog)),
            false,
        )
        .await
    }

    /// Detect several categories concurrently and collect the answers.
    pub async fn report<'a, I>(&self, catalogs: I, force_refresh: bool) -> DetectionReport
    where
        I: IntoIterator<Item = (&'a str, &'a Catalog)>,
    {
        join_all(
            catalogs
                .into_iter()
                .map(|(category, catalog)| {
                    self.detect_with_refresh(category, catalog, force_refresh)
                }),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Probe `<name> --version` and return the parsed version.
    ///
    /// `Ok(None)` means the tool is missing, failed, or printed no version.
    pub async fn detect_tool(&self, name: &str) -> Result<Option<Version>, ConfigError> {
        let catalog = Catalog::tool(name)?;
        let outcomes = join_all(catalog.iter().map(|probe| self.runner.run(probe))).await;
        Ok(outcomes.iter().find_map(ProbeOutcome::version))
    }

    /// Clear every cache: probe outcomes, file existence and detections.
    pub fn invalidate_cache(&self) {
        debug!("invalidating all detection caches");
        self.caches.clear();
    }

    /// Drop the cached answer for one category.
    pub fn invalidate_category(&self, category: &str) -> bool {
        self.caches.detections().delete(category)
    }

    /// Drop the cached outcome for one probe.
    pub fn invalidate_probe(&self, probe: &ProbeDescriptor) -> bool {
        self.runner.forget(probe)
    }

    /// Remove expired entries from all caches.
    pub fn prune(&self) -> usize {
        self.caches.prune()
    }

    /// The cache instances owned by this detector.
    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    /// The runner executing individual probes.
    pub fn runner(&self) -> &ProbeRunner<E> {
        &self.runner
    }
}

/// Label of the first probe, in catalog order, whose outcome succeeded.
fn select_label(probes: &[ProbeDescriptor], outcomes: &[ProbeOutcome]) -> Option<String> {
    probes
        .iter()
        .zip(outcomes)
        .find_map(|(probe, outcome)| match outcome.result() {
            Ok(_) => Some(probe.label.clone()),
            Err(_) => None,
        })
}
