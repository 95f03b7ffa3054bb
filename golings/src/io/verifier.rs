//! Exercise verification.
//!
//! The [`Verifier`] trait decouples the watch loop and the one-shot commands
//! from the build toolchain. [`CommandVerifier`] shells out to the configured
//! command (the Go toolchain by default); tests use scripted verifiers that
//! return predetermined outcomes without spawning processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::classifier::classify_exit;
use crate::core::marker::contains_marker;
use crate::core::types::{BlockReason, Exercise, VerificationOutcome};
use crate::io::config::{CommandsConfig, GolingsConfig};
use crate::io::process::{CancelToken, Termination, run_command};

/// Cause reported when the hard timeout expires.
pub const TIMEOUT_CAUSE: &str = "timeout";
/// Cause reported for a cancelled attempt; such outcomes are never shown.
pub const CANCELLED_CAUSE: &str = "cancelled";

/// Capability to verify one exercise.
pub trait Verifier {
    /// Verify `exercise` against its current source.
    ///
    /// Implementations must return within roughly `timeout` and stop early
    /// once `cancel` is signalled.
    fn verify(
        &self,
        exercise: &Exercise,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> VerificationOutcome;
}

/// Verifier that runs the configured build/test command per exercise mode.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    root: PathBuf,
    commands: CommandsConfig,
    marker: String,
    output_limit_bytes: usize,
}

impl CommandVerifier {
    pub fn new(root: impl Into<PathBuf>, config: &GolingsConfig) -> Self {
        Self {
            root: root.into(),
            commands: config.commands.clone(),
            marker: config.marker.clone(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// True if the exercise source still carries the "not done" marker.
    pub fn has_marker(&self, exercise: &Exercise) -> Result<bool> {
        let sources = read_sources(&self.root.join(&exercise.path))?;
        Ok(sources
            .iter()
            .any(|source| contains_marker(source, &self.marker)))
    }

    /// Build the verification command for `exercise`, expanding placeholders.
    pub fn command_for(&self, exercise: &Exercise) -> Result<Command> {
        let template = self.commands.for_mode(exercise.mode);
        let (program, args) = template
            .split_first()
            .ok_or_else(|| anyhow!("empty {} command", exercise.mode.as_str()))?;
        let path = source_arg(exercise);
        let dir = package_dir(exercise);

        let mut cmd = Command::new(expand(program, &path, &dir));
        cmd.args(args.iter().map(|arg| expand(arg, &path, &dir)))
            .current_dir(&self.root);
        Ok(cmd)
    }
}

impl Verifier for CommandVerifier {
    #[instrument(skip_all, fields(exercise = %exercise.name, mode = exercise.mode.as_str()))]
    fn verify(
        &self,
        exercise: &Exercise,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> VerificationOutcome {
        match self.has_marker(exercise) {
            Ok(true) => {
                debug!("marker present, skipping build");
                return VerificationOutcome::Blocked {
                    reason: BlockReason::MarkerPresent,
                };
            }
            Ok(false) => {}
            Err(err) => {
                warn!(err = %format!("{err:#}"), "could not read exercise source");
                return VerificationOutcome::Errored {
                    cause: format!("{err:#}"),
                };
            }
        }

        let cmd = match self.command_for(exercise) {
            Ok(cmd) => cmd,
            Err(err) => {
                return VerificationOutcome::Errored {
                    cause: format!("{err:#}"),
                };
            }
        };

        info!("running verification");
        let output = match run_command(cmd, timeout, self.output_limit_bytes, cancel) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "verification command could not run");
                return VerificationOutcome::Errored {
                    cause: format!("{err:#}"),
                };
            }
        };

        match output.terminated {
            Some(Termination::TimedOut) => VerificationOutcome::Errored {
                cause: TIMEOUT_CAUSE.to_string(),
            },
            Some(Termination::Cancelled) => VerificationOutcome::Errored {
                cause: CANCELLED_CAUSE.to_string(),
            },
            None => classify_exit(output.status.success(), &output.combined()),
        }
    }
}

/// `{path}` value: files stay as written, directories get the `./` prefix so
/// `go run` treats them as local packages rather than import paths.
fn source_arg(exercise: &Exercise) -> String {
    if is_package_path(&exercise.path) {
        format!("./{}", exercise.path.display())
    } else {
        exercise.path.display().to_string()
    }
}

fn is_package_path(path: &Path) -> bool {
    path.extension().is_none()
}

/// Package directory in `./dir` form, as the Go tool expects for local packages.
fn package_dir(exercise: &Exercise) -> String {
    let dir: &Path = if is_package_path(&exercise.path) {
        &exercise.path
    } else {
        exercise.path.parent().unwrap_or(Path::new(""))
    };
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        format!("./{}", dir.display())
    }
}

fn expand(template: &str, path: &str, dir: &str) -> String {
    template.replace("{path}", path).replace("{dir}", dir)
}

/// Read the exercise source: the file itself, or every regular file directly
/// inside a directory exercise.
fn read_sources(path: &Path) -> Result<Vec<String>> {
    if path.is_dir() {
        let mut sources = Vec::new();
        let entries =
            fs::read_dir(path).with_context(|| format!("read directory {}", path.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read directory {}", path.display()))?;
            let entry_path = entry.path();
            if entry_path.is_file() {
                let bytes = fs::read(&entry_path)
                    .with_context(|| format!("read {}", entry_path.display()))?;
                sources.push(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        return Ok(sources);
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("read source {}", path.display()))?;
    Ok(vec![source])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FailKind, VerifyMode};

    fn exercise(path: &str, mode: VerifyMode) -> Exercise {
        Exercise {
            name: "ex".to_string(),
            path: PathBuf::from(path),
            hint: String::new(),
            mode,
            order: 0,
        }
    }

    fn verifier(root: &Path, compile: &[&str], test: &[&str]) -> CommandVerifier {
        let mut config = GolingsConfig::default();
        config.commands.compile = compile.iter().map(|arg| (*arg).to_string()).collect();
        config.commands.test = test.iter().map(|arg| (*arg).to_string()).collect();
        CommandVerifier::new(root, &config)
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn default_commands_expand_path_and_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier = CommandVerifier::new(temp.path(), &GolingsConfig::default());

        let cmd = verifier
            .command_for(&exercise(
                "exercises/errors/errors2/main_test.go",
                VerifyMode::Test,
            ))
            .expect("command");
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cmd.get_program(), "go");
        assert_eq!(args, vec!["test", "-v", "./exercises/errors/errors2"]);

        let cmd = verifier
            .command_for(&exercise("exercises/errors/errors1/main.go", VerifyMode::Compile))
            .expect("command");
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["run", "exercises/errors/errors1/main.go"]);
    }

    #[test]
    fn directory_compile_exercise_runs_as_local_package() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier = CommandVerifier::new(temp.path(), &GolingsConfig::default());

        let cmd = verifier
            .command_for(&exercise("exercises/structs/structs1", VerifyMode::Compile))
            .expect("command");
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["run", "./exercises/structs/structs1"]);
    }

    #[test]
    fn marker_blocks_even_if_command_would_pass() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "ex/main.go", "// I AM NOT DONE\npackage main\n");
        let verifier = verifier(temp.path(), &["true"], &["true"]);

        let outcome = verifier.verify(
            &exercise("ex/main.go", VerifyMode::Compile),
            Duration::from_secs(5),
            &CancelToken::new(),
        );
        assert_eq!(
            outcome,
            VerificationOutcome::Blocked {
                reason: BlockReason::MarkerPresent
            }
        );
    }

    #[test]
    fn marker_in_any_package_file_blocks_directory_exercise() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "ex/main.go", "package main\n");
        write(temp.path(), "ex/main_test.go", "// I AM NOT DONE\npackage main\n");
        let verifier = verifier(temp.path(), &["true"], &["true"]);

        let outcome = verifier.verify(
            &exercise("ex", VerifyMode::Test),
            Duration::from_secs(5),
            &CancelToken::new(),
        );
        assert!(matches!(outcome, VerificationOutcome::Blocked { .. }));
    }

    #[test]
    fn missing_source_is_errored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier = verifier(temp.path(), &["true"], &["true"]);

        let outcome = verifier.verify(
            &exercise("gone/main.go", VerifyMode::Compile),
            Duration::from_secs(5),
            &CancelToken::new(),
        );
        assert!(matches!(outcome, VerificationOutcome::Errored { .. }));
    }

    #[test]
    fn missing_toolchain_is_errored_not_fail() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "ex/main.go", "package main\n");
        let verifier = verifier(temp.path(), &["golings-missing-toolchain", "{path}"], &["true"]);

        let outcome = verifier.verify(
            &exercise("ex/main.go", VerifyMode::Compile),
            Duration::from_secs(5),
            &CancelToken::new(),
        );
        assert!(matches!(outcome, VerificationOutcome::Errored { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_are_classified() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "ex/main.go", "package main\n");
        let ex = exercise("ex/main.go", VerifyMode::Compile);
        let cancel = CancelToken::new();

        let pass = verifier(temp.path(), &["sh", "-c", "exit 0"], &["true"]);
        assert_eq!(
            pass.verify(&ex, Duration::from_secs(5), &cancel),
            VerificationOutcome::Pass
        );

        let build = verifier(
            temp.path(),
            &["sh", "-c", "echo '{path}:3:1: undefined: x' 1>&2; exit 1"],
            &["true"],
        );
        assert_eq!(
            build.verify(&ex, Duration::from_secs(5), &cancel),
            VerificationOutcome::Fail {
                kind: FailKind::Build,
                diagnostic: "ex/main.go:3:1: undefined: x\n".to_string(),
            }
        );

        let test = verifier(
            temp.path(),
            &["sh", "-c", "echo '--- FAIL: TestX'; exit 1"],
            &["true"],
        );
        assert!(matches!(
            test.verify(&ex, Duration::from_secs(5), &cancel),
            VerificationOutcome::Fail {
                kind: FailKind::Test,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn hung_command_times_out_as_errored() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "ex/main.go", "package main\n");
        let verifier = verifier(temp.path(), &["sh", "-c", "sleep 30"], &["true"]);

        let outcome = verifier.verify(
            &exercise("ex/main.go", VerifyMode::Compile),
            Duration::from_millis(200),
            &CancelToken::new(),
        );
        assert_eq!(
            outcome,
            VerificationOutcome::Errored {
                cause: TIMEOUT_CAUSE.to_string()
            }
        );
    }
}
