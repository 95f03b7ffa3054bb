//! Error taxonomy for startup configuration and progress storage.
//!
//! Verification failures are not errors: they are
//! [`VerificationOutcome`](crate::core::types::VerificationOutcome) values.
//! Cancelled verifications are discarded without a report.

use std::path::PathBuf;

use thiserror::Error;

/// Bad or missing manifest/configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {path}:\n- {}", .problems.join("\n- "))]
    Invalid {
        path: PathBuf,
        problems: Vec<String>,
    },
}

/// Progress could not be read or written.
///
/// Read failures degrade to fresh progress; write failures are reported as
/// warnings and never end a session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("read progress {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse progress {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize progress: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write progress {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
