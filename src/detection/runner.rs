//! Memoized, deadline-bounded execution of single probes.

use super::executor::{ProbeExecutor, SystemExecutor};
use super::path_finder::normalize_path;
use super::timeout::with_timeout;
use crate::probe::first_disallowed_token;
use crate::{CacheRegistry, ProbeDescriptor, ProbeError, ProbeKind, ProbeOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Runs probes through the timeout guard and memoizes their outcomes.
///
/// File-existence outcomes live in the registry's file cache keyed by the
/// absolute path; file reads and subprocess outcomes live in the probe cache.
/// Failures are cached as well as successes.
#[derive(Debug)]
pub struct ProbeRunner<E = SystemExecutor> {
    executor: E,
    caches: Arc<CacheRegistry>,
    root: PathBuf,
    deadline: Duration,
}

impl<E: ProbeExecutor> ProbeRunner<E> {
    /// Create a runner that resolves relative paths against `root`.
    pub fn new(
        executor: E,
        caches: Arc<CacheRegistry>,
        root: PathBuf,
        deadline: Duration,
    ) -> Self {
        Self {
            executor,
            caches,
            root,
            deadline,
        }
    }

    /// Normalized cache identity of a probe.
    ///
    /// Relative and absolute spellings of the same file share one identity;
    /// subprocess identities join the command tokens with single spaces.
    /// File identities are folded lexically and only name the cache entry.
    /// The check itself runs on the path as written, so the OS resolves `..`
    /// after following symlinks.
    pub fn identity(&self, probe: &ProbeDescriptor) -> String {
        match probe.kind {
            ProbeKind::FileExists => self.resolve(&probe.target).display().to_string(),
            ProbeKind::FileRead => format!("read:{}", self.resolve(&probe.target).display()),
            ProbeKind::Subprocess => format!("exec:{}", probe.command_tokens().join(" ")),
        }
    }

    /// Run a probe, serving a live cached outcome when there is one.
    pub async fn run(&self, probe: &ProbeDescriptor) -> ProbeOutcome {
        let identity = self.identity(probe);
        let cached = self.cached(probe.kind, &identity);
        if let Some(outcome) = cached {
            debug!(identity = %identity, succeeded = outcome.succeeded(), "probe cache hit");
            return outcome;
        }
        self.execute(probe, identity).await
    }

    /// Run a probe unconditionally and overwrite its cached outcome.
    pub async fn run_fresh(&self, probe: &ProbeDescriptor) -> ProbeOutcome {
        let identity = self.identity(probe);
        self.execute(probe, identity).await
    }

    /// Drop the cached outcome of a probe, returning whether one existed.
    pub fn forget(&self, probe: &ProbeDescriptor) -> bool {
        let identity = self.identity(probe);
        match probe.kind {
            ProbeKind::FileExists => self.caches.files().delete(&identity),
            ProbeKind::FileRead | ProbeKind::Subprocess => self.caches.probes().delete(&identity),
        }
    }

    /// Per-probe deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Base directory for relative file targets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The executor performing the underlying checks.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn resolve(&self, target: &str) -> PathBuf {
        normalize_path(&self.root, target)
    }

    /// The path handed to the executor: `target` joined onto the root, unfolded.
    fn filesystem_path(&self, target: &str) -> PathBuf {
        self.root.join(target)
    }

    fn cached(&self, kind: ProbeKind, identity: &str) -> Option<ProbeOutcome> {
        match kind {
            ProbeKind::FileExists => self.caches.files().get(identity).cloned(),
            ProbeKind::FileRead | ProbeKind::Subprocess => {
                self.caches.probes().get(identity).cloned()
            }
        }
    }

    async fn execute(&self, probe: &ProbeDescriptor, identity: String) -> ProbeOutcome {
        let result = match probe.kind {
            ProbeKind::FileExists => {
                let path = self.filesystem_path(&probe.target);
                with_timeout(&probe.label, self.deadline, self.executor.file_exists(&path)).await
            }
            ProbeKind::FileRead => {
                let path = self.filesystem_path(&probe.target);
                with_timeout(&probe.label, self.deadline, self.executor.read_file(&path)).await
            }
            ProbeKind::Subprocess => {
                let tokens = probe.command_tokens();
                match (first_disallowed_token(&tokens), tokens.split_first()) {
                    (Some(token), _) => Err(ProbeError::DisallowedCommand {
                        token: token.to_string(),
                    }),
                    (None, None) => Err(ProbeError::DisallowedCommand {
                        token: String::new(),
                    }),
                    (None, Some((program, args))) => {
                        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
                        with_timeout(
                            &probe.label,
                            self.deadline,
                            self.executor.run_command(program, &args),
                        )
                        .await
                    }
                }
            }
        };

        if let Err(error) = &result {
            debug!(identity = %identity, %error, "probe did not match");
        }

        let outcome = ProbeOutcome::new(identity.clone(), result);
        let stored = match probe.kind {
            ProbeKind::FileExists => self.caches.files().set(identity.clone(), outcome.clone()),
            ProbeKind::FileRead | ProbeKind::Subprocess => {
                self.caches.probes().set(identity.clone(), outcome.clone())
            }
        };
        if !stored {
            debug!(identity = %identity, "probe outcome too large to cache");
        }
        outcome
    }
}
