//! Version extraction from tool output.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("Invalid regex pattern"))
}

/// Parse the first `major.minor.patch` version found in `output`.
///
/// Handles the usual `--version` shapes:
///
/// - `git version 2.43.0` -> 2.43.0
/// - `v20.11.1` -> 20.11.1
/// - `Docker version 24.0.7, build afdd53b` -> 24.0.7
pub(crate) fn parse_version(output: &str) -> Option<Version> {
    let caps = version_regex().captures(output)?;
    Version::parse(caps.get(0)?.as_str()).ok()
}
