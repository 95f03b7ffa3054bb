//! Test-only helpers: exercise fixtures, scratch projects and a scripted verifier.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::core::catalog::Catalog;
use crate::core::types::{Exercise, VerificationOutcome, VerifyMode};
use crate::io::process::CancelToken;
use crate::io::verifier::{CANCELLED_CAUSE, TIMEOUT_CAUSE, Verifier};

/// Create a deterministic compile-mode exercise at `exercises/<name>/main.go`.
pub fn exercise(name: &str, order: i64) -> Exercise {
    Exercise {
        name: name.to_string(),
        path: PathBuf::from(format!("exercises/{name}/main.go")),
        hint: format!("{name} hint"),
        mode: VerifyMode::Compile,
        order,
    }
}

/// Catalog of compile-mode exercises in the given order.
pub fn catalog(names: &[&str]) -> Catalog {
    Catalog::new(
        names
            .iter()
            .enumerate()
            .map(|(index, name)| exercise(name, index as i64))
            .collect(),
    )
}

/// Scratch project directory with a manifest and one source per exercise.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create a project whose `info.toml` lists `names` as compile exercises,
    /// each with a source file that still carries the "not done" marker.
    pub fn new(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = Self { dir };
        let mut manifest = String::new();
        for name in names {
            manifest.push_str(&format!(
                "[[exercises]]\nname = \"{name}\"\npath = \"exercises/{name}/main.go\"\nmode = \"compile\"\nhint = \"{name} hint\"\n\n"
            ));
            project.write_source(name, "// I AM NOT DONE\npackage main\n");
        }
        project.write("info.toml", &manifest);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.root().join(format!("exercises/{name}/main.go"))
    }

    pub fn write_source(&self, name: &str, contents: &str) {
        self.write(&format!("exercises/{name}/main.go"), contents);
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }
}

/// One scripted verification step.
#[derive(Debug, Clone)]
pub enum Script {
    /// Return this outcome immediately.
    Outcome(VerificationOutcome),
    /// Run until cancelled (or timed out), like a hung build.
    BlockUntilCancelled,
    /// Hold the outcome until a file exists at this path, so a test can pick
    /// the moment a slow build finishes.
    WaitForFile(PathBuf, VerificationOutcome),
}

/// Verifier that replays scripted outcomes without spawning processes.
///
/// Every call is recorded. With [`ScriptedVerifier::reading_from`], the
/// exercise source is also captured at the moment verification starts.
#[derive(Debug, Default)]
pub struct ScriptedVerifier {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<String>>,
    sources: Mutex<Vec<String>>,
    root: Option<PathBuf>,
}

impl ScriptedVerifier {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Shorthand for a script made only of outcomes.
    pub fn outcomes(outcomes: impl IntoIterator<Item = VerificationOutcome>) -> Self {
        Self::new(outcomes.into_iter().map(Script::Outcome))
    }

    /// Also record exercise sources read relative to `root`.
    pub fn reading_from(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Exercise names verified so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Source contents seen at the start of each verification.
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().expect("sources lock").clone()
    }
}

impl Verifier for ScriptedVerifier {
    fn verify(
        &self,
        exercise: &Exercise,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> VerificationOutcome {
        self.calls
            .lock()
            .expect("calls lock")
            .push(exercise.name.clone());
        if let Some(root) = &self.root {
            let source = fs::read_to_string(root.join(&exercise.path)).unwrap_or_default();
            self.sources.lock().expect("sources lock").push(source);
        }

        let script = self.scripts.lock().expect("scripts lock").pop_front();
        match script {
            Some(Script::Outcome(outcome)) => outcome,
            Some(Script::BlockUntilCancelled) => stopped(timeout, cancel, || false)
                .unwrap_or_else(|| unreachable!("never ready")),
            Some(Script::WaitForFile(path, outcome)) => {
                stopped(timeout, cancel, || path.exists()).unwrap_or(outcome)
            }
            None => VerificationOutcome::Errored {
                cause: "no scripted outcome".to_string(),
            },
        }
    }
}

/// Poll until `ready` holds. Returns the outcome of a run that stopped first
/// through cancellation or timeout, or `None` once ready.
fn stopped(
    timeout: Duration,
    cancel: &CancelToken,
    ready: impl Fn() -> bool,
) -> Option<VerificationOutcome> {
    let deadline = Instant::now() + timeout;
    while !ready() {
        if cancel.is_cancelled() {
            return Some(VerificationOutcome::Errored {
                cause: CANCELLED_CAUSE.to_string(),
            });
        }
        if Instant::now() >= deadline {
            return Some(VerificationOutcome::Errored {
                cause: TIMEOUT_CAUSE.to_string(),
            });
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}
