//! CLI tests: spawn the golings binary against scratch projects.
//!
//! Verification commands are replaced with `sh -c` scripts through
//! `golings.toml`, so no Go toolchain is needed.
#![cfg(unix)]

use std::process::{Command, Output, Stdio};

use golings::exit_codes;
use golings::io::progress::ProgressStore;
use golings::test_support::TestProject;

const PASSING: &str = "[commands]\ncompile = [\"sh\", \"-c\", \"echo ok\"]\n";

fn golings(project: &TestProject, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_golings"))
        .arg("--root")
        .arg(project.root())
        .args(args)
        .env_remove("GOLINGS_ROOT")
        .stdin(Stdio::null())
        .output()
        .expect("run golings")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn progress(project: &TestProject) -> ProgressStore {
    ProgressStore::new(project.root().join(".golings/progress.json"))
}

#[test]
fn list_shows_every_exercise_pending() {
    let project = TestProject::new(&["intro1", "intro2"]);

    let output = golings(&project, &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.contains("> intro1"));
    assert!(text.contains("Progress: 0/2 (0%)"));
}

#[test]
fn hint_prints_current_exercise_hint() {
    let project = TestProject::new(&["intro1", "intro2"]);

    let output = golings(&project, &["hint"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "Hint for intro1:\nintro1 hint\n");
}

#[test]
fn verify_stops_at_marked_exercise() {
    let project = TestProject::new(&["intro1", "intro2"]);
    project.write("golings.toml", PASSING);
    project.write_source("intro1", "package main\n");

    let output = golings(&project, &["verify"]);

    assert_eq!(output.status.code(), Some(exit_codes::NOT_PASSING));
    let text = stdout(&output);
    assert!(text.contains("[pass] intro1"));
    assert!(text.contains("[blocked] intro2"));
    let saved = progress(&project).load();
    assert!(saved.completed.contains("intro1"));
    assert_eq!(saved.current.as_deref(), Some("intro2"));
}

#[test]
fn verify_completes_when_everything_passes() {
    let project = TestProject::new(&["intro1", "intro2"]);
    project.write("golings.toml", PASSING);
    project.write_source("intro1", "package main\n");
    project.write_source("intro2", "package main\n");

    let output = golings(&project, &["verify"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("All exercises complete."));
    assert_eq!(progress(&project).load().completed.len(), 2);
}

#[test]
fn run_surfaces_build_errors_verbatim() {
    let project = TestProject::new(&["intro1"]);
    project.write(
        "golings.toml",
        "[commands]\ncompile = [\"sh\", \"-c\", \"echo '{path}:4:2: undefined: fmt' >&2; exit 1\"]\n",
    );
    project.write_source("intro1", "package main\n");

    let output = golings(&project, &["run", "intro1"]);

    assert_eq!(output.status.code(), Some(exit_codes::NOT_PASSING));
    assert_eq!(
        stdout(&output),
        "[fail] intro1: build failed\nexercises/intro1/main.go:4:2: undefined: fmt\n\n"
    );
    assert_eq!(progress(&project).read().expect("read"), None);
}

#[test]
fn run_unknown_exercise_is_invalid() {
    let project = TestProject::new(&["intro1"]);

    let output = golings(&project, &["run", "nope"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("unknown exercise 'nope'"));
}

#[test]
fn invalid_manifest_reports_all_problems() {
    let project = TestProject::new(&[]);
    project.write(
        "info.toml",
        "[[exercises]]\nname = \"a\"\npath = \"missing/a.go\"\nmode = \"compile\"\n\n\
         [[exercises]]\nname = \"a\"\npath = \"missing/b.go\"\nmode = \"compile\"\n",
    );

    let output = golings(&project, &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let text = stderr(&output);
    assert!(text.contains("duplicate name 'a'"));
    assert!(text.contains("missing/a.go does not exist"));
    assert!(text.contains("missing/b.go does not exist"));
}

#[test]
fn watch_quits_when_stdin_closes() {
    let project = TestProject::new(&["intro1"]);

    let output = golings(&project, &["watch"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.contains("Current exercise: intro1 (exercises/intro1/main.go)"));
    assert!(text.ends_with("Bye.\n"));
    assert_eq!(
        progress(&project).load().current.as_deref(),
        Some("intro1")
    );
}
