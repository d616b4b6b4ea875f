//! Probe descriptors, catalogs and outcomes.

use crate::cache::ValueSize;
use crate::detection::parse_version;
use crate::{ConfigError, ProbeError};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::SystemTime;

/// What a probe checks.
///
/// Adding a kind means adding a variant here and an arm to the single
/// dispatch point in [`ProbeRunner`](crate::ProbeRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Matches if the path exists (any entry type).
    FileExists,
    /// Matches if the path exists and is readable; payload is the content.
    FileRead,
    /// Matches if the command starts and exits with status 0; payload is its output.
    Subprocess,
}

/// One candidate check in a catalog.
///
/// `target` is a path for file probes (relative paths resolve against the
/// detector's root) and a whitespace-separated command line for subprocess
/// probes, e.g. `"node --version"`. Commands never go through a shell.
///
/// There is no identity field. The cache identity is derived from `kind` and
/// `target` by [`ProbeRunner::identity`](crate::ProbeRunner::identity), so
/// `./yarn.lock` and `yarn.lock` share one entry while a file read and an
/// existence check of the same path do not.
///
/// # Example
///
/// ```rust
/// use envprobe::{ProbeDescriptor, ProbeKind};
///
/// let probe = ProbeDescriptor::file_exists("yarn.lock", "yarn");
/// assert_eq!(probe.kind, ProbeKind::FileExists);
/// assert_eq!(probe.label, "yarn");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeDescriptor {
    /// Which check to run.
    pub kind: ProbeKind,
    /// Path or command line.
    pub target: String,
    /// Reported when this probe is the first match of its category.
    pub label: String,
}

impl ProbeDescriptor {
    /// Build a descriptor of any kind.
    pub fn new(kind: ProbeKind, target: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            label: label.into(),
        }
    }

    /// A probe that matches when `path` exists.
    pub fn file_exists(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(ProbeKind::FileExists, path, label)
    }

    /// A probe that matches when `path` can be read.
    pub fn file_read(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(ProbeKind::FileRead, path, label)
    }

    /// A probe that matches when `command` exits successfully.
    pub fn subprocess(command: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(ProbeKind::Subprocess, command, label)
    }

    /// Command tokens of a subprocess probe.
    pub fn command_tokens(&self) -> Vec<&str> {
        self.target.split_whitespace().collect()
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedProbe {
            index,
            reason: reason.to_string(),
        };
        if self.label.trim().is_empty() {
            return Err(malformed("empty label"));
        }
        if self.target.trim().is_empty() {
            return Err(malformed("empty target"));
        }
        if self.kind == ProbeKind::Subprocess {
            if let Some(token) = first_disallowed_token(&self.command_tokens()) {
                return Err(ConfigError::DisallowedCommand {
                    token: token.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn command_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex pattern"))
}

/// First token that fails the command allow-list, if any.
pub(crate) fn first_disallowed_token<'a>(tokens: &[&'a str]) -> Option<&'a str> {
    tokens
        .iter()
        .copied()
        .find(|token| !command_token_regex().is_match(token))
}

/// An ordered, validated list of probes for one detection category.
///
/// Order is priority: the first matching entry wins regardless of which probe
/// finishes first.
///
/// # Example
///
/// ```rust
/// use envprobe::{Catalog, ConfigError, ProbeDescriptor};
///
/// let catalog = Catalog::new(vec![
///     ProbeDescriptor::file_exists("pnpm-lock.yaml", "pnpm"),
///     ProbeDescriptor::file_exists("yarn.lock", "yarn"),
/// ])
/// .unwrap();
/// assert_eq!(catalog.len(), 2);
///
/// let bad = Catalog::new(vec![ProbeDescriptor::subprocess("sh -c 'rm -rf /'", "boom")]);
/// assert!(matches!(bad, Err(ConfigError::DisallowedCommand { .. })));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProbeDescriptor>", into = "Vec<ProbeDescriptor>")]
pub struct Catalog {
    probes: Vec<ProbeDescriptor>,
}

impl Catalog {
    /// Validate and wrap a list of probes.
    pub fn new(probes: Vec<ProbeDescriptor>) -> Result<Self, ConfigError> {
        for (index, probe) in probes.iter().enumerate() {
            probe.validate(index)?;
        }
        Ok(Self { probes })
    }

    /// Wrap probes known to be valid at compile time.
    pub(crate) fn from_trusted(probes: Vec<ProbeDescriptor>) -> Self {
        Self { probes }
    }

    /// Catalog with a single `<name> --version` probe labelled `name`.
    pub fn tool(name: &str) -> Result<Self, ConfigError> {
        Self::new(vec![ProbeDescriptor::subprocess(
            format!("{} --version", name),
            name,
        )])
    }

    /// Probes in priority order.
    pub fn probes(&self) -> &[ProbeDescriptor] {
        &self.probes
    }

    /// Iterate probes in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, ProbeDescriptor> {
        self.probes.iter()
    }

    /// Number of probes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Whether the catalog has no probes.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl TryFrom<Vec<ProbeDescriptor>> for Catalog {
    type Error = ConfigError;

    fn try_from(probes: Vec<ProbeDescriptor>) -> Result<Self, Self::Error> {
        Self::new(probes)
    }
}

impl From<Catalog> for Vec<ProbeDescriptor> {
    fn from(catalog: Catalog) -> Self {
        catalog.probes
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ProbeDescriptor;
    type IntoIter = std::slice::Iter<'a, ProbeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.probes.iter()
    }
}

/// Data produced by a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Existence checks carry no data beyond "it is there".
    Flag(bool),
    /// File content or command output.
    Text(String),
}

impl Payload {
    /// Text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }
}

/// Recorded result of running one probe.
///
/// Failures are outcomes too: they are cached like successes so that a
/// reliably absent tool is not re-probed until its entry expires.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    identity: String,
    result: Result<Payload, ProbeError>,
    observed_at: SystemTime,
}

impl ProbeOutcome {
    pub(crate) fn new(identity: impl Into<String>, result: Result<Payload, ProbeError>) -> Self {
        Self {
            identity: identity.into(),
            result,
            observed_at: SystemTime::now(),
        }
    }

    /// Normalized cache identity of the probe.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Whether the probe matched.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Payload of a successful probe.
    pub fn payload(&self) -> Option<&Payload> {
        self.result.as_ref().ok()
    }

    /// Why the probe did not match.
    pub fn failure(&self) -> Option<&ProbeError> {
        self.result.as_ref().err()
    }

    /// The outcome as a `Result`.
    pub fn result(&self) -> Result<&Payload, &ProbeError> {
        self.result.as_ref()
    }

    /// When the underlying check ran.
    pub fn observed_at(&self) -> SystemTime {
        self.observed_at
    }

    /// Semantic version found in a text payload, e.g. from `--version`.
    pub fn version(&self) -> Option<Version> {
        self.payload()
            .and_then(Payload::as_text)
            .and_then(parse_version)
    }
}

impl ValueSize for ProbeOutcome {
    fn value_size(&self) -> usize {
        match &self.result {
            Ok(Payload::Text(text)) => text.len(),
            Ok(Payload::Flag(_)) | Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_rejects_empty_label() {
        let err = Catalog::new(vec![
            ProbeDescriptor::file_exists("a", "a"),
            ProbeDescriptor::file_exists("b", "  "),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MalformedProbe {
                index: 1,
                reason: "empty label".to_string()
            }
        );
    }

    #[test]
    fn test_catalog_rejects_empty_target() {
        let err = Catalog::new(vec![ProbeDescriptor::file_read("", "x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedProbe { index: 0, .. }));
    }

    #[test]
    fn test_catalog_rejects_shell_metacharacters() {
        for command in ["git;ls", "node $(id)", "docker --version|cat", "./run", "a/b"] {
            let result = Catalog::new(vec![ProbeDescriptor::subprocess(command, "x")]);
            assert!(
                matches!(result, Err(ConfigError::DisallowedCommand { .. })),
                "{} should be rejected",
                command
            );
        }
    }

    #[test]
    fn test_catalog_accepts_plain_commands() {
        let catalog = Catalog::new(vec![
            ProbeDescriptor::subprocess("git --version", "git"),
            ProbeDescriptor::subprocess("docker-compose version", "compose"),
            ProbeDescriptor::subprocess("python3 -V", "python"),
        ])
        .unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.probes()[0].command_tokens(), vec!["git", "--version"]);
    }

    #[test]
    fn test_file_targets_are_not_command_checked() {
        // Paths may contain dots and slashes.
        let catalog = Catalog::new(vec![ProbeDescriptor::file_exists(".github/workflows", "gh")]);
        assert!(catalog.is_ok());
    }

    #[test]
    fn test_tool_catalog() {
        let catalog = Catalog::tool("git").unwrap();
        assert_eq!(catalog.probes()[0].target, "git --version");
        assert_eq!(catalog.probes()[0].label, "git");
        assert!(Catalog::tool("git;rm").is_err());
    }

    #[test]
    fn test_catalog_deserializes_with_validation() {
        let json = r#"[
            {"kind": "file_exists", "target": "pnpm-lock.yaml", "label": "pnpm"},
            {"kind": "subprocess", "target": "bun --version", "label": "bun"}
        ]"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.probes()[1].kind, ProbeKind::Subprocess);

        let bad = r#"[{"kind": "subprocess", "target": "bun && id", "label": "bun"}]"#;
        assert!(serde_json::from_str::<Catalog>(bad).is_err());
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = ProbeOutcome::new(
            "exec:git --version",
            Ok(Payload::Text("git version 2.43.0".into())),
        );
        assert!(ok.succeeded());
        assert_eq!(ok.version(), Some(Version::new(2, 43, 0)));
        assert_eq!(ok.value_size(), "git version 2.43.0".len());
        assert!(ok.failure().is_none());

        let failed = ProbeOutcome::new(
            "/x/yarn.lock",
            Err(ProbeError::NotFound {
                target: "/x/yarn.lock".into(),
            }),
        );
        assert!(!failed.succeeded());
        assert!(failed.payload().is_none());
        assert!(failed.version().is_none());
        assert_eq!(failed.value_size(), 0);
    }

    #[test]
    fn test_payload_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Payload::Flag(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&Payload::Text("v1".into())).unwrap(),
            "\"v1\""
        );
    }
}
