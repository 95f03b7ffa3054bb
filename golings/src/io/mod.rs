//! I/O adapters for golings commands.

pub mod catalog;
pub mod config;
pub mod input;
pub mod process;
pub mod progress;
pub mod project;
pub mod verifier;
pub mod watcher;
