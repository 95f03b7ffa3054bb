//! Shared deterministic types for the exercise engine.
//!
//! These types define stable contracts between the catalog, the verifier, the
//! progress store and the watch loop. They carry no I/O handles.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How an exercise is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// The exercise only needs to build and run.
    #[serde(alias = "compile-only")]
    Compile,
    /// The exercise must build and its tests must pass.
    #[serde(alias = "compile-and-test")]
    Test,
}

impl VerifyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Test => "test",
        }
    }
}

/// One unit of learning content. Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub name: String,
    /// Source file or directory, relative to the project root.
    pub path: PathBuf,
    pub hint: String,
    pub mode: VerifyMode,
    /// Declared position in the catalog; unique across exercises.
    pub order: i64,
}

impl Exercise {
    /// Portion of the tree whose edits concern this exercise.
    ///
    /// Test exercises are built as a package, so every file in the package
    /// directory counts. Compile exercises only watch their own source.
    pub fn scope(&self) -> &Path {
        if self.mode == VerifyMode::Test && self.path.extension().is_some() {
            return self.path.parent().unwrap_or(&self.path);
        }
        &self.path
    }

    /// True if a change at `path` (relative to the project root) touches this exercise.
    pub fn watches(&self, path: &Path) -> bool {
        let scope = self.scope();
        if scope.as_os_str().is_empty() {
            return path == self.path;
        }
        path.starts_with(scope)
    }
}

/// Kind of a failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    /// The build step reported errors.
    Build,
    /// The program built but exited unsuccessfully (failing tests, panics).
    Test,
}

/// Why a verification was blocked without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The "not done" marker is still present in the source.
    MarkerPresent,
}

impl BlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkerPresent => "explicit-marker-present",
        }
    }
}

/// Result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Pass,
    /// Learner-facing failure. `diagnostic` is the raw tool output, unmodified.
    Fail { kind: FailKind, diagnostic: String },
    Blocked { reason: BlockReason },
    /// Infrastructure failure (launch error, timeout). Never counted against the learner.
    Errored { cause: String },
}

impl VerificationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail {
                kind: FailKind::Build,
                ..
            } => "build failed",
            Self::Fail {
                kind: FailKind::Test,
                ..
            } => "failed",
            Self::Blocked { .. } => "blocked",
            Self::Errored { .. } => "errored",
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail { diagnostic, .. } => write!(f, "{}:\n{}", self.label(), diagnostic),
            Self::Blocked { reason } => write!(f, "blocked ({})", reason.as_str()),
            Self::Errored { cause } => write!(f, "errored: {cause}"),
        }
    }
}

/// Persisted progress (`.golings/progress.json`).
///
/// `completed` is an ordered set so the serialized bytes are stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgressRecord {
    /// Names of exercises that have passed.
    pub completed: BTreeSet<String>,
    /// Exercise currently being worked on; `None` once everything is complete.
    pub current: Option<String>,
}

impl ProgressRecord {
    pub fn is_complete(&self, name: &str) -> bool {
        self.completed.contains(name)
    }
}
