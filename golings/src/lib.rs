//! Exercise progression engine for Go learning exercises.
//!
//! Learners fix a sequence of small broken programs; golings decides which
//! exercise is current, verifies it on every save and advances once it passes.
//!
//! - **[`core`]**: Pure, deterministic logic (catalog, marker detection,
//!   outcome classification, selection, the watch state machine). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, manifest, subprocesses,
//!   progress file, filesystem watcher, terminal input).
//!
//! Orchestration modules ([`watch`], [`verify`], [`list`]) combine the two to
//! implement CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod list;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
pub mod watch;
