//! Probe execution.
//!
//! This module contains the machinery that turns a probe descriptor into a
//! cached outcome:
//!
//! - `with_timeout`: deadline guard around any async operation
//! - `ProbeExecutor` / `SystemExecutor`: the leaf file and process checks
//! - `ProbeRunner`: normalization, memoization and dispatch over probe kinds
//! - `find_executable` / `parse_version`: PATH lookup and version extraction

mod executor;
mod parser;
mod path_finder;
mod runner;
mod timeout;

pub use executor::{ProbeExecutor, SystemExecutor};
pub(crate) use parser::parse_version;
pub use runner::ProbeRunner;
pub use timeout::{with_timeout, TimeoutError, DEFAULT_DEADLINE};
