//! Leaf I/O operations behind every probe.

use super::path_finder::find_executable;
use crate::{Payload, ProbeError};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// The three primitive checks a probe can perform.
///
/// [`SystemExecutor`] runs them against the real filesystem and process
/// table. Other implementations can simulate latency or count calls.
///
/// Implementations report failures as [`ProbeError`] values; they are never
/// expected to panic.
pub trait ProbeExecutor {
    /// Succeed with `Payload::Flag(true)` if `path` exists.
    fn file_exists(&self, path: &Path)
        -> impl Future<Output = Result<Payload, ProbeError>> + Send;

    /// Succeed with the file content if `path` is readable.
    fn read_file(&self, path: &Path) -> impl Future<Output = Result<Payload, ProbeError>> + Send;

    /// Succeed with the command output if `program args...` exits with status 0.
    ///
    /// `program` is a bare name that already passed the allow-list.
    fn run_command(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Payload, ProbeError>> + Send;
}

/// Executor backed by `tokio::fs` and `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProbeExecutor for SystemExecutor {
    fn file_exists(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Payload, ProbeError>> + Send {
        let path = path.to_path_buf();
        async move {
            // symlink_metadata so a dangling symlink still counts as an entry
            tokio::fs::symlink_metadata(&path)
                .await
                .map(|_| Payload::Flag(true))
                .map_err(|e| ProbeError::from_io(path.display().to_string(), &e))
        }
    }

    fn read_file(&self, path: &Path) -> impl Future<Output = Result<Payload, ProbeError>> + Send {
        let path = path.to_path_buf();
        async move {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ProbeError::from_io(path.display().to_string(), &e))?;
            Ok(Payload::Text(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }

    fn run_command(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Payload, ProbeError>> + Send {
        let program = program.to_string();
        let args = args.to_vec();
        async move {
            let executable = find_executable(&program).ok_or_else(|| ProbeError::NotFound {
                target: program.clone(),
            })?;

            // No shell: each argument reaches the process as one token.
            let output = Command::new(&executable)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| ProbeError::from_io(program.clone(), &e))?;

            if !output.status.success() {
                let mut command = program;
                for arg in &args {
                    command.push(' ');
                    command.push_str(arg);
                }
                return Err(ProbeError::NonZeroExit {
                    command,
                    code: output.status.code(),
                });
            }

            // Some tools print their version on stderr.
            let out = if !output.stdout.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            Ok(Payload::Text(String::from_utf8_lossy(&out).trim().to_string()))
        }
    }
}
