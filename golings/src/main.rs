//! `golings` command-line interface.
//!
//! Thin presentation layer: parses arguments, opens the project and renders
//! results as plain text on stdout. All engine logic lives in the library.

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use golings::core::catalog::Catalog;
use golings::core::machine::{WatchEvent, WatchState};
use golings::core::types::VerificationOutcome;
use golings::exit_codes;
use golings::io::input::spawn_stdin_reader;
use golings::io::project::{Project, ProjectOptions};
use golings::io::verifier::CommandVerifier;
use golings::io::watcher::spawn_source_watcher;
use golings::list::{list_exercises, lookup_hint, render_statuses};
use golings::logging;
use golings::verify::{VerifyStop, run_single, verify_all};
use golings::watch::{WatchOptions, run_watch};

#[derive(Parser)]
#[command(name = "golings", version, about = "Learn Go by fixing small broken programs")]
struct Cli {
    /// Project root containing the exercise manifest.
    #[arg(long, global = true, env = "GOLINGS_ROOT", default_value = ".")]
    root: PathBuf,

    /// Config file (default: `golings.toml` in the root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exercise manifest, overriding `info_file` from the config.
    #[arg(long, global = true)]
    info: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every exercise and whether it is done.
    List,
    /// Show the hint for an exercise (default: the current one).
    Hint {
        /// Exercise name.
        name: Option<String>,
    },
    /// Verify a single exercise once.
    Run {
        /// Exercise name.
        name: String,
    },
    /// Verify exercises in order, stopping at the first one that does not pass.
    Verify,
    /// Watch exercise sources and verify the current exercise on every save.
    Watch,
}

fn main() {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            std::process::exit(code);
        }
    };
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let options = ProjectOptions {
        config: cli.config,
        info: cli.info,
    };
    let project = Project::open(&cli.root, &options)?;
    match cli.command {
        Command::List => cmd_list(&project),
        Command::Hint { name } => cmd_hint(&project, name.as_deref()),
        Command::Run { name } => cmd_run(&project, &name),
        Command::Verify => cmd_verify(&project),
        Command::Watch => cmd_watch(&project),
    }
}

fn cmd_list(project: &Project) -> Result<i32> {
    let statuses = list_exercises(&project.catalog, &project.progress_store());
    print!("{}", render_statuses(&statuses));
    Ok(exit_codes::OK)
}

fn cmd_hint(project: &Project, name: Option<&str>) -> Result<i32> {
    let (name, hint) = lookup_hint(&project.catalog, &project.progress_store(), name)?;
    println!("{}", describe_hint(&name, &hint));
    Ok(exit_codes::OK)
}

fn cmd_run(project: &Project, name: &str) -> Result<i32> {
    let verifier = CommandVerifier::new(project.root(), &project.config);
    let (outcome, warnings) = run_single(
        &project.catalog,
        &project.progress_store(),
        &verifier,
        name,
        project.config.verify_timeout(),
    )?;
    println!("{}", describe_outcome(name, &outcome, &project.config.marker));
    print_warnings(&warnings);
    Ok(if outcome.is_pass() {
        exit_codes::OK
    } else {
        exit_codes::NOT_PASSING
    })
}

fn cmd_verify(project: &Project) -> Result<i32> {
    let verifier = CommandVerifier::new(project.root(), &project.config);
    let report = verify_all(
        &project.catalog,
        &project.progress_store(),
        &verifier,
        project.config.verify_timeout(),
        |exercise, outcome| {
            println!(
                "{}",
                describe_outcome(&exercise.name, outcome, &project.config.marker)
            );
        },
    );
    print_warnings(&report.warnings);
    match report.stop {
        VerifyStop::Complete => {
            println!("All exercises complete.");
            Ok(exit_codes::OK)
        }
        VerifyStop::NotPassing { .. } => Ok(exit_codes::NOT_PASSING),
    }
}

fn cmd_watch(project: &Project) -> Result<i32> {
    let (tx, rx) = mpsc::channel();
    let _watcher = spawn_source_watcher(
        project.root(),
        &project.catalog,
        project.config.poll_interval(),
        tx.clone(),
    )?;
    // Detached: it stays blocked on stdin until the process exits.
    spawn_stdin_reader(tx.clone());

    let verifier = CommandVerifier::new(project.root(), &project.config);
    run_watch(
        &project.catalog,
        &project.progress_store(),
        &verifier,
        WatchOptions::from_config(&project.config),
        &tx,
        &rx,
        |event| render_event(&project.catalog, &project.config.marker, event),
    )?;
    Ok(exit_codes::OK)
}

fn render_event(catalog: &Catalog, marker: &str, event: &WatchEvent) {
    match event {
        WatchEvent::State(WatchState::Watching { exercise }) => {
            let path = catalog
                .get(exercise)
                .map(|exercise| exercise.path.display().to_string())
                .unwrap_or_default();
            println!("\nCurrent exercise: {exercise} ({path})");
            println!("Edit and save to verify. Type `help` for commands.");
        }
        WatchEvent::State(WatchState::Verifying { exercise }) => {
            println!("Verifying {exercise}...");
        }
        WatchEvent::State(WatchState::Reporting { exercise, outcome }) => {
            println!("{}", describe_outcome(exercise, outcome, marker));
        }
        WatchEvent::State(WatchState::Done) => {
            println!("\nAll exercises complete. Well done!");
        }
        WatchEvent::State(WatchState::Idle) => println!("Bye."),
        WatchEvent::Hint { exercise, hint } => println!("{}", describe_hint(exercise, hint)),
        WatchEvent::List(statuses) => print!("{}", render_statuses(statuses)),
        WatchEvent::Warning(message) => eprintln!("warning: {message}"),
    }
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn describe_hint(exercise: &str, hint: &str) -> String {
    if hint.is_empty() {
        return format!("No hint for {exercise}.");
    }
    format!("Hint for {exercise}:\n{hint}")
}

fn describe_outcome(exercise: &str, outcome: &VerificationOutcome, marker: &str) -> String {
    match outcome {
        VerificationOutcome::Pass => format!("[pass] {exercise}"),
        VerificationOutcome::Fail { diagnostic, .. } => {
            format!("[fail] {exercise}: {}\n{diagnostic}", outcome.label())
        }
        VerificationOutcome::Blocked { .. } => format!(
            "[blocked] {exercise}: remove the `{marker}` comment when you are done"
        ),
        VerificationOutcome::Errored { cause } => {
            format!("[error] {exercise}: verification could not run: {cause}")
        }
    }
}
