//! Stable exit codes for golings CLI commands.

/// Command succeeded (for `verify`/`run`: the exercises passed).
pub const OK: i32 = 0;
/// Invalid config or manifest, unknown exercise, or another error.
pub const INVALID: i32 = 1;
/// `verify` or `run` stopped at an exercise that does not pass yet.
pub const NOT_PASSING: i32 = 2;
