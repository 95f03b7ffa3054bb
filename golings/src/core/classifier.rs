//! Classification of finished verification runs.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{FailKind, VerificationOutcome};

/// Lines the Go toolchain prints when a build fails:
/// - `path/file.go:12:5: undefined: x`
/// - `FAIL example.com/pkg [build failed]`
static BUILD_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\S+\.go:\d+(:\d+)?: |\[build failed\]|\[setup failed\]").unwrap()
});

/// `# command-line-arguments` / `# example.com/pkg` package headers.
static PACKAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# \S+").unwrap());

static TEST_FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*--- FAIL").unwrap());

/// True if `output` carries a compiler/build error signature.
///
/// A bare package header only counts when no test reported a failure, since
/// test output may print lines starting with `# ` itself.
pub fn has_build_error(output: &str) -> bool {
    BUILD_ERROR.is_match(output)
        || (PACKAGE_HEADER.is_match(output) && !TEST_FAILURE.is_match(output))
}

/// Classify a run that exited on its own (no timeout, no cancellation).
///
/// - exit 0 => `Pass`
/// - non-zero with a build error signature => `Fail { kind: Build }`
/// - any other non-zero exit => `Fail { kind: Test }`
///
/// The diagnostic is the captured output verbatim.
pub fn classify_exit(success: bool, output: &str) -> VerificationOutcome {
    if success {
        return VerificationOutcome::Pass;
    }
    let kind = if has_build_error(output) {
        FailKind::Build
    } else {
        FailKind::Test
    };
    VerificationOutcome::Fail {
        kind,
        diagnostic: output.to_string(),
    }
}
