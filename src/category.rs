//! Built-in detection categories and their default catalogs.

use crate::{Catalog, ProbeDescriptor};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// A built-in detection category.
///
/// Each category answers one question about the environment (for example
/// "which package manager does this project use") with the label of the
/// first matching probe in its default catalog. Catalogs are ordered by
/// priority: when several lockfiles exist, the earlier entry wins.
///
/// Arbitrary categories can be detected with a custom [`Catalog`]; these are
/// only defaults.
///
/// # Example
///
/// ```rust
/// use envprobe::Category;
///
/// for category in Category::all() {
///     println!("{}: {} probes", category.name(), category.catalog().len());
/// }
/// assert_eq!(Category::PackageManager.name(), "package-manager");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Category {
    /// Which CI system the project is configured for.
    Ci,
    /// Which deployment target the project is configured for.
    Deployment,
    /// Which package manager owns the project's dependencies.
    PackageManager,
    /// Where tool state lives. Pinned by `ENVPROBE_STATE_DIR` when set.
    StateDir,
}

const CI_PROBES: &[(&str, &str)] = &[
    (".github/workflows", "github-actions"),
    (".gitlab-ci.yml", "gitlab-ci"),
    (".circleci/config.yml", "circleci"),
    ("azure-pipelines.yml", "azure-pipelines"),
    ("bitbucket-pipelines.yml", "bitbucket-pipelines"),
    (".buildkite", "buildkite"),
    ("Jenkinsfile", "jenkins"),
    (".travis.yml", "travis"),
];

const DEPLOYMENT_PROBES: &[(&str, &str)] = &[
    ("vercel.json", "vercel"),
    ("netlify.toml", "netlify"),
    ("fly.toml", "fly"),
    ("render.yaml", "render"),
    ("railway.json", "railway"),
    ("app.yaml", "app-engine"),
    ("Dockerfile", "docker"),
];

const PACKAGE_MANAGER_PROBES: &[(&str, &str)] = &[
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("bun.lockb", "bun"),
    ("package-lock.json", "npm"),
    ("Cargo.lock", "cargo"),
    ("uv.lock", "uv"),
    ("poetry.lock", "poetry"),
    ("go.sum", "go"),
];

const STATE_DIR_PROBES: &[(&str, &str)] = &[(".envprobe", ".envprobe"), (".git", ".git")];

impl Category {
    /// Stable name used as the cache key and report key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Deployment => "deployment",
            Self::PackageManager => "package-manager",
            Self::StateDir => "state-dir",
        }
    }

    /// Default file-existence catalog for this category.
    pub fn catalog(&self) -> Catalog {
        let table = match self {
            Self::Ci => CI_PROBES,
            Self::Deployment => DEPLOYMENT_PROBES,
            Self::PackageManager => PACKAGE_MANAGER_PROBES,
            Self::StateDir => STATE_DIR_PROBES,
        };
        Catalog::from_trusted(
            table
                .iter()
                .map(|(path, label)| ProbeDescriptor::file_exists(*path, *label))
                .collect(),
        )
    }

    /// Iterator over all built-in categories.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
