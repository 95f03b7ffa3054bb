//! Watch loop driver.
//!
//! Owns the [`WatchMachine`] on the calling thread and executes the effects
//! it requests. Everything else (filesystem watcher, terminal input,
//! verifications) talks to the loop through one `mpsc` channel, so the
//! machine is only ever touched from here.
//!
//! At most one verification thread is alive: before a new one starts, the
//! previous one is cancelled and joined. Results carry a generation number;
//! the machine drops results from superseded generations.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::core::catalog::Catalog;
use crate::core::machine::{Effect, Input, WatchEvent, WatchMachine, WatchState};
use crate::core::types::{Exercise, ProgressRecord};
use crate::io::config::GolingsConfig;
use crate::io::process::CancelToken;
use crate::io::progress::ProgressStore;
use crate::io::verifier::Verifier;

/// Timing knobs for one watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub debounce: Duration,
    pub verify_timeout: Duration,
}

impl WatchOptions {
    pub fn from_config(config: &GolingsConfig) -> Self {
        Self {
            debounce: config.debounce(),
            verify_timeout: config.verify_timeout(),
        }
    }
}

/// How a watch session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSummary {
    /// `Done` when every exercise passed, `Idle` after a quit.
    pub state: WatchState,
    pub record: ProgressRecord,
}

impl WatchSummary {
    pub fn all_done(&self) -> bool {
        self.state == WatchState::Done
    }
}

struct Running<'scope> {
    generation: u64,
    cancel: CancelToken,
    handle: ScopedJoinHandle<'scope, ()>,
}

/// Run the watch loop until every exercise passes or a quit arrives.
///
/// `tx` must be the sending half of `rx`; it is handed to verification
/// threads so their results join the same ordered stream as filesystem and
/// terminal inputs. `on_event` runs on the loop thread for every event.
pub fn run_watch<V, F>(
    catalog: &Catalog,
    store: &ProgressStore,
    verifier: &V,
    options: WatchOptions,
    tx: &Sender<Input>,
    rx: &Receiver<Input>,
    mut on_event: F,
) -> Result<WatchSummary>
where
    V: Verifier + Sync,
    F: FnMut(&WatchEvent),
{
    let mut machine = WatchMachine::new(catalog, store.load());
    info!(exercises = catalog.len(), "watch loop starting");

    thread::scope(|scope| -> Result<()> {
        let mut running: Option<Running<'_>> = None;
        let mut debounce_deadline: Option<Instant> = None;
        let mut next = Some(Input::Start);

        loop {
            let input = match next.take() {
                Some(input) => input,
                None => receive(rx, &mut debounce_deadline),
            };
            debug!(input = input_name(&input), "watch input");

            let mut exit = false;
            for effect in machine.handle(input) {
                match effect {
                    Effect::Emit(event) => on_event(&event),
                    Effect::ArmDebounce => {
                        debounce_deadline = Some(Instant::now() + options.debounce);
                    }
                    Effect::DisarmDebounce => debounce_deadline = None,
                    Effect::Cancel { generation } => {
                        if let Some(run) = running.take_if(|run| run.generation == generation) {
                            debug!(generation, "cancelling verification");
                            run.cancel.cancel();
                            join(run);
                        }
                    }
                    Effect::Verify {
                        exercise,
                        generation,
                    } => {
                        // A finished thread may still be unjoined.
                        if let Some(previous) = running.take() {
                            previous.cancel.cancel();
                            join(previous);
                        }
                        let exercise = catalog
                            .get(&exercise)
                            .ok_or_else(|| anyhow!("unknown exercise {exercise}"))?;
                        running = Some(spawn_verification(
                            scope, verifier, exercise, generation, options, tx,
                        ));
                    }
                    Effect::Persist(record) => {
                        if let Err(err) = store.save(&record) {
                            warn!(%err, "progress not saved");
                            on_event(&WatchEvent::Warning(format!("progress not saved: {err}")));
                        }
                    }
                    Effect::Exit => exit = true,
                }
            }
            if exit {
                break;
            }
        }

        if let Some(run) = running.take() {
            run.cancel.cancel();
            join(run);
        }
        Ok(())
    })?;

    info!(state = ?machine.state(), "watch loop finished");
    Ok(WatchSummary {
        state: machine.state().clone(),
        record: machine.record().clone(),
    })
}

/// Block for the next input, turning an expired debounce into
/// [`Input::DebounceElapsed`].
fn receive(rx: &Receiver<Input>, debounce_deadline: &mut Option<Instant>) -> Input {
    let Some(deadline) = *debounce_deadline else {
        return rx.recv().unwrap_or(Input::Quit);
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(input) => input,
        Err(RecvTimeoutError::Timeout) => {
            *debounce_deadline = None;
            Input::DebounceElapsed
        }
        Err(RecvTimeoutError::Disconnected) => Input::Quit,
    }
}

fn spawn_verification<'scope, 'env, V>(
    scope: &'scope Scope<'scope, 'env>,
    verifier: &'env V,
    exercise: &'env Exercise,
    generation: u64,
    options: WatchOptions,
    tx: &Sender<Input>,
) -> Running<'scope>
where
    V: Verifier + Sync,
{
    debug!(exercise = %exercise.name, generation, "starting verification");
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let tx = tx.clone();
    let handle = scope.spawn(move || {
        let outcome = verifier.verify(exercise, options.verify_timeout, &token);
        // The loop may already be gone after a quit.
        let _ = tx.send(Input::VerificationFinished {
            generation,
            outcome,
        });
    });
    Running {
        generation,
        cancel,
        handle,
    }
}

fn join(run: Running<'_>) {
    if run.handle.join().is_err() {
        error!(generation = run.generation, "verification thread panicked");
    }
}

fn input_name(input: &Input) -> &'static str {
    match input {
        Input::Start => "start",
        Input::FileChanged(_) => "file-changed",
        Input::DebounceElapsed => "debounce-elapsed",
        Input::RunNow => "run-now",
        Input::Hint => "hint",
        Input::List => "list",
        Input::Quit => "quit",
        Input::VerificationFinished { .. } => "verification-finished",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::core::machine::FileChange;
    use crate::core::types::{FailKind, VerificationOutcome};
    use crate::test_support::{Script, ScriptedVerifier, catalog};

    const WAIT: Duration = Duration::from_secs(5);

    fn options() -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_millis(50),
            verify_timeout: Duration::from_secs(5),
        }
    }

    fn edit(name: &str) -> Input {
        Input::FileChanged(FileChange::now(format!("exercises/{name}/main.go")))
    }

    fn watching(name: &str) -> WatchState {
        WatchState::Watching {
            exercise: name.to_string(),
        }
    }

    fn wait_for(events: &mpsc::Receiver<WatchEvent>, wanted: &WatchState) {
        loop {
            match events.recv_timeout(WAIT).expect("watch event") {
                WatchEvent::State(state) if &state == wanted => return,
                _ => {}
            }
        }
    }

    /// Verifies a burst of edits collapses into one verification per exercise
    /// and that passing both exercises finishes the loop with saved progress.
    #[test]
    fn burst_of_edits_verifies_once_then_advances() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ProgressStore::new(temp.path().join("progress.json"));
        let catalog = catalog(&["a", "b"]);
        let verifier =
            ScriptedVerifier::outcomes([VerificationOutcome::Pass, VerificationOutcome::Pass]);
        let (tx, rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();

        let learner_tx = tx.clone();
        let learner = thread::spawn(move || {
            wait_for(&events, &watching("a"));
            for _ in 0..3 {
                learner_tx.send(edit("a")).expect("send");
            }
            wait_for(&events, &watching("b"));
            learner_tx.send(edit("b")).expect("send");
        });

        let summary = run_watch(&catalog, &store, &verifier, options(), &tx, &rx, |event| {
            let _ = event_tx.send(event.clone());
        })
        .expect("watch");
        learner.join().expect("learner thread");

        assert!(summary.all_done());
        assert_eq!(verifier.calls(), vec!["a", "b"]);
        let saved = store.read().expect("read").expect("record");
        assert!(saved.completed.contains("a") && saved.completed.contains("b"));
        assert_eq!(saved.current, None);
    }

    /// Verifies a manual run during a hung verification cancels it and only
    /// the second result is reported and persisted.
    #[test]
    fn run_now_cancels_in_flight_verification() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ProgressStore::new(temp.path().join("progress.json"));
        let catalog = catalog(&["a"]);
        let verifier = ScriptedVerifier::new([
            Script::BlockUntilCancelled,
            Script::Outcome(VerificationOutcome::Fail {
                kind: FailKind::Test,
                diagnostic: "--- FAIL".to_string(),
            }),
        ]);
        let (tx, rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();

        let learner_tx = tx.clone();
        let learner = thread::spawn(move || {
            learner_tx.send(Input::RunNow).expect("send");
            wait_for(&events, &WatchState::Verifying {
                exercise: "a".to_string(),
            });
            learner_tx.send(Input::RunNow).expect("send");

            let mut reported = Vec::new();
            while reported.is_empty() {
                if let WatchEvent::State(WatchState::Reporting { outcome, .. }) =
                    events.recv_timeout(WAIT).expect("watch event")
                {
                    reported.push(outcome);
                }
            }
            learner_tx.send(Input::Quit).expect("send");
            // Anything reported after the quit would be a leaked stale result.
            reported.extend(events.try_iter().filter_map(|event| match event {
                WatchEvent::State(WatchState::Reporting { outcome, .. }) => Some(outcome),
                _ => None,
            }));
            reported
        });

        let summary = run_watch(&catalog, &store, &verifier, options(), &tx, &rx, |event| {
            let _ = event_tx.send(event.clone());
        })
        .expect("watch");
        let reported = learner.join().expect("learner thread");

        assert_eq!(summary.state, WatchState::Idle);
        assert_eq!(verifier.calls(), vec!["a", "a"]);
        assert_eq!(reported.len(), 1);
        assert!(matches!(reported[0], VerificationOutcome::Fail { .. }));
        let saved = store.read().expect("read").expect("record");
        assert!(saved.completed.is_empty());
    }

    /// Verifies a progress write failure is surfaced as a warning and the loop
    /// keeps running.
    #[test]
    fn storage_failure_is_a_warning() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("progress.json");
        std::fs::create_dir_all(path.join("occupied")).expect("mkdir");
        let store = ProgressStore::new(&path);
        let catalog = catalog(&["a"]);
        let verifier = ScriptedVerifier::default();
        let (tx, rx) = mpsc::channel();
        tx.send(Input::Quit).expect("send");

        let mut events = Vec::new();
        let summary = run_watch(&catalog, &store, &verifier, options(), &tx, &rx, |event| {
            events.push(event.clone());
        })
        .expect("watch");

        assert_eq!(summary.state, WatchState::Idle);
        let warned = events.iter().any(|event| match event {
            WatchEvent::Warning(message) => message.contains("progress not saved"),
            _ => false,
        });
        assert!(warned);
        assert!(verifier.calls().is_empty());
    }
}
