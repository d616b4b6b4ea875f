//! Deadline guard for asynchronous operations.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Deadline used when the caller does not pick one.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// An operation did not settle before its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{label} timed out after {deadline:?}")]
pub struct TimeoutError {
    /// Label of the guarded operation.
    pub label: String,
    /// The deadline that expired.
    pub deadline: Duration,
}

/// Run `operation` with a deadline.
///
/// Returns the operation's own result if it settles in time, or a
/// [`TimeoutError`] (converted into `E`) carrying `label` otherwise. The timer
/// is dropped on every exit path. On timeout the operation future is dropped
/// too; whether that stops the underlying work is up to the operation (a
/// subprocess spawned with `kill_on_drop` is killed, a blocking read is not).
///
/// Guards compose: wrapping a whole detection in an outer guard bounds it as
/// a unit.
///
/// # Example
///
/// ```rust
/// use envprobe::{with_timeout, TimeoutError};
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let result: Result<(), TimeoutError> =
///         with_timeout("never", Duration::from_millis(10), std::future::pending()).await;
///     assert_eq!(result.unwrap_err().label, "never");
/// }
/// ```
pub async fn with_timeout<F, T, E>(label: &str, deadline: Duration, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            debug!(label, ?deadline, "operation timed out");
            Err(TimeoutError {
                label: label.to_string(),
                deadline,
            }
            .into())
        }
    }
}
