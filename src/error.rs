//! Error types for configuration and probe failures.
//!
//! Two families of errors exist and they never mix:
//!
//! - [`ConfigError`] is caller misuse (bad cache parameters, malformed
//!   catalog entries, disallowed command tokens). It is returned at the call
//!   that introduced the bad value.
//! - [`ProbeError`] is an expected probe failure (missing file, missing tool,
//!   non-zero exit, timeout). It is recorded in a failed
//!   [`ProbeOutcome`](crate::ProbeOutcome) and never escalates past the
//!   detector.

use crate::detection::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Errors caused by invalid configuration or catalog input.
///
/// # Example
///
/// ```rust
/// use envprobe::{CacheConfig, ConfigError, TtlCache};
/// use std::time::Duration;
///
/// let config = CacheConfig {
///     ttl: Duration::ZERO,
///     ..Default::default()
/// };
/// let result = TtlCache::<String>::new(&config);
/// assert!(matches!(result, Err(ConfigError::InvalidTtl)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Cache TTL must be greater than zero.
    #[error("cache ttl must be greater than zero")]
    InvalidTtl,

    /// A configured max value size of zero would reject every value.
    #[error("max value size must be greater than zero (use None for unlimited)")]
    InvalidMaxValueSize,

    /// Probe timeout must be greater than zero.
    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,

    /// A catalog entry is missing required data.
    #[error("malformed probe at catalog index {index}: {reason}")]
    MalformedProbe {
        /// Position of the entry in the catalog.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A subprocess token failed the allow-list (letters, digits, `_`, `-`).
    #[error("command token {token:?} is not allowed")]
    DisallowedCommand {
        /// The rejected token.
        token: String,
    },

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value found in the environment.
        value: String,
    },
}

/// Why a single probe did not match.
///
/// These are expected outcomes: a tool that is not installed or a file that
/// does not exist is the normal "no" answer of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProbeError {
    /// The file or executable does not exist.
    #[error("{target} not found")]
    NotFound {
        /// Path or command that was looked up.
        target: String,
    },

    /// The file or executable exists but could not be accessed.
    #[error("permission denied for {target}")]
    PermissionDenied {
        /// Path or command that was denied.
        target: String,
    },

    /// The probe did not settle before its deadline.
    #[error("{label} timed out after {deadline:?}")]
    Timeout {
        /// Label of the probe that timed out.
        label: String,
        /// The deadline that was exceeded.
        deadline: Duration,
    },

    /// The subprocess ran but exited unsuccessfully.
    #[error("{command} exited with status {code:?}")]
    NonZeroExit {
        /// Command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// A command token failed the allow-list and was never spawned.
    #[error("command token {token:?} is not allowed")]
    DisallowedCommand {
        /// The rejected token.
        token: String,
    },

    /// Any other I/O failure.
    #[error("I/O error on {target}: {message}")]
    Io {
        /// Path or command involved.
        target: String,
        /// Underlying error message.
        message: String,
    },
}

impl ProbeError {
    /// Build a probe error from an I/O error, keeping the common kinds typed.
    pub(crate) fn from_io(target: impl Into<String>, error: &std::io::Error) -> Self {
        let target = target.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { target },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { target },
            _ => Self::Io {
                target,
                message: error.to_string(),
            },
        }
    }

    /// Whether this failure was caused by the deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<TimeoutError> for ProbeError {
    fn from(error: TimeoutError) -> Self {
        Self::Timeout {
            label: error.label,
            deadline: error.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_from_io_maps_common_kinds() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(
            ProbeError::from_io("yarn.lock", &err),
            ProbeError::NotFound {
                target: "yarn.lock".to_string()
            }
        );

        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ProbeError::from_io("secret", &err),
            ProbeError::PermissionDenied { .. }
        ));

        let err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        match ProbeError::from_io("data", &err) {
            ProbeError::Io { target, message } => {
                assert_eq!(target, "data");
                assert!(message.contains("disk on fire"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_conversion_keeps_label() {
        let err = ProbeError::from(TimeoutError {
            label: "yarn".to_string(),
            deadline: Duration::from_millis(250),
        });
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "yarn timed out after 250ms");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MalformedProbe {
            index: 2,
            reason: "empty label".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed probe at catalog index 2: empty label"
        );

        let err = ConfigError::DisallowedCommand {
            token: "rm;ls".to_string(),
        };
        assert!(err.to_string().contains("rm;ls"));
    }
}
