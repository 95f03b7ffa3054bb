//! Watch loop state machine.
//!
//! [`WatchMachine`] owns the session state (current exercise, in-flight
//! verification, pending debounce, progress record) and mutates it only in
//! [`WatchMachine::handle`]. Each input yields a list of [`Effect`]s that the
//! driver in [`crate::watch`] carries out: spawning or cancelling
//! verifications, arming the debounce timer, persisting progress and emitting
//! events to the presentation layer. Keeping timers, threads and files out of
//! this module makes every transition reproducible in tests.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::core::catalog::Catalog;
use crate::core::selector::{ExerciseStatus, exercise_statuses, first_incomplete};
use crate::core::types::{Exercise, ProgressRecord, VerificationOutcome};

/// Observable state of the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    /// Not started yet, or stopped by an explicit quit.
    Idle,
    /// Armed on `exercise`, waiting for an edit or a manual run.
    Watching { exercise: String },
    /// A verification of `exercise` is in flight.
    Verifying { exercise: String },
    /// A verification finished; transient, immediately followed by
    /// `Watching` or `Done`.
    Reporting {
        exercise: String,
        outcome: VerificationOutcome,
    },
    /// Every exercise has passed.
    Done,
}

/// Raw filesystem change, with `path` relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub at: SystemTime,
}

impl FileChange {
    pub fn now(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            at: SystemTime::now(),
        }
    }
}

/// Messages consumed by the state machine, in channel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    FileChanged(FileChange),
    /// The debounce quiet interval elapsed without further qualifying edits.
    DebounceElapsed,
    /// Manual "run now"; short-circuits a pending debounce.
    RunNow,
    Hint,
    List,
    Quit,
    VerificationFinished {
        generation: u64,
        outcome: VerificationOutcome,
    },
}

/// Events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    State(WatchState),
    Hint { exercise: String, hint: String },
    List(Vec<ExerciseStatus>),
    /// Non-fatal problem (for example progress could not be saved).
    Warning(String),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Emit(WatchEvent),
    /// (Re)start the debounce timer.
    ArmDebounce,
    /// Stop the debounce timer without firing it.
    DisarmDebounce,
    /// Terminate the verification with this generation; its result must be discarded.
    Cancel { generation: u64 },
    /// Start verifying `exercise`. Any earlier generation was cancelled first.
    Verify { exercise: String, generation: u64 },
    Persist(ProgressRecord),
    /// The loop is finished (all done, or quit).
    Exit,
}

/// Single-owner state of one watch session.
#[derive(Debug)]
pub struct WatchMachine<'a> {
    catalog: &'a Catalog,
    record: ProgressRecord,
    state: WatchState,
    started: bool,
    in_flight: Option<u64>,
    next_generation: u64,
    debounce_pending: bool,
}

impl<'a> WatchMachine<'a> {
    pub fn new(catalog: &'a Catalog, record: ProgressRecord) -> Self {
        Self {
            catalog,
            record,
            state: WatchState::Idle,
            started: false,
            in_flight: None,
            next_generation: 0,
            debounce_pending: false,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    /// Generation of the verification currently in flight, if any.
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn debounce_pending(&self) -> bool {
        self.debounce_pending
    }

    /// True once the session reached `Done` or was quit.
    pub fn is_finished(&self) -> bool {
        self.started && matches!(self.state, WatchState::Idle | WatchState::Done)
    }

    /// The exercise the session is armed on, if any.
    pub fn current(&self) -> Option<&'a Exercise> {
        let name = match &self.state {
            WatchState::Watching { exercise } | WatchState::Verifying { exercise } => exercise,
            _ => return None,
        };
        self.catalog.get(name)
    }

    /// Apply one input and return the effects the driver must perform, in order.
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        if self.is_finished() {
            return Vec::new();
        }
        match input {
            Input::Start => self.start(),
            Input::FileChanged(change) => self.file_changed(&change),
            Input::DebounceElapsed => {
                if !self.debounce_pending {
                    return Vec::new();
                }
                self.debounce_pending = false;
                self.begin_verification()
            }
            Input::RunNow => {
                if self.current().is_none() {
                    return Vec::new();
                }
                let mut effects = Vec::new();
                if self.debounce_pending {
                    self.debounce_pending = false;
                    effects.push(Effect::DisarmDebounce);
                }
                effects.extend(self.begin_verification());
                effects
            }
            Input::Hint => match self.current() {
                Some(exercise) => vec![Effect::Emit(WatchEvent::Hint {
                    exercise: exercise.name.clone(),
                    hint: exercise.hint.clone(),
                })],
                None => Vec::new(),
            },
            Input::List => vec![Effect::Emit(WatchEvent::List(exercise_statuses(
                self.catalog,
                &self.record.completed,
            )))],
            Input::Quit => self.quit(),
            Input::VerificationFinished {
                generation,
                outcome,
            } => self.verification_finished(generation, outcome),
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        let mut effects = Vec::new();
        let next = self.next_incomplete();
        if self.record.current != next {
            self.record.current = next.clone();
            effects.push(Effect::Persist(self.record.clone()));
        }
        match next {
            Some(exercise) => self.arm(exercise, &mut effects),
            None => self.finish(&mut effects),
        }
        effects
    }

    fn file_changed(&mut self, change: &FileChange) -> Vec<Effect> {
        let Some(exercise) = self.current() else {
            return Vec::new();
        };
        // Edits to other exercises never trigger out-of-order feedback.
        if !exercise.watches(&change.path) {
            return Vec::new();
        }
        self.debounce_pending = true;
        vec![Effect::ArmDebounce]
    }

    fn begin_verification(&mut self) -> Vec<Effect> {
        let Some(exercise) = self.current().map(|exercise| exercise.name.clone()) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if let Some(generation) = self.in_flight.take() {
            effects.push(Effect::Cancel { generation });
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight = Some(generation);
        self.state = WatchState::Verifying {
            exercise: exercise.clone(),
        };
        effects.push(Effect::Emit(WatchEvent::State(self.state.clone())));
        effects.push(Effect::Verify {
            exercise,
            generation,
        });
        effects
    }

    fn verification_finished(
        &mut self,
        generation: u64,
        outcome: VerificationOutcome,
    ) -> Vec<Effect> {
        // Superseded or already-cancelled attempts are dropped silently.
        if self.in_flight != Some(generation) {
            return Vec::new();
        }
        self.in_flight = None;
        // A newer edit is waiting on the debounce; it supersedes this result.
        if self.debounce_pending {
            return Vec::new();
        }
        let WatchState::Verifying { exercise } = &self.state else {
            return Vec::new();
        };
        let exercise = exercise.clone();
        let passed = outcome.is_pass();

        let mut effects = vec![Effect::Emit(WatchEvent::State(WatchState::Reporting {
            exercise: exercise.clone(),
            outcome,
        }))];

        if !passed {
            self.arm(exercise, &mut effects);
            return effects;
        }

        self.record.completed.insert(exercise);
        let next = self.next_incomplete();
        self.record.current = next.clone();
        effects.push(Effect::Persist(self.record.clone()));
        match next {
            Some(next) => self.arm(next, &mut effects),
            None => self.finish(&mut effects),
        }
        effects
    }

    fn quit(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(generation) = self.in_flight.take() {
            effects.push(Effect::Cancel { generation });
        }
        if self.debounce_pending {
            self.debounce_pending = false;
            effects.push(Effect::DisarmDebounce);
        }
        self.started = true;
        self.state = WatchState::Idle;
        effects.push(Effect::Emit(WatchEvent::State(WatchState::Idle)));
        effects.push(Effect::Exit);
        effects
    }

    fn arm(&mut self, exercise: String, effects: &mut Vec<Effect>) {
        self.state = WatchState::Watching { exercise };
        effects.push(Effect::Emit(WatchEvent::State(self.state.clone())));
    }

    fn finish(&mut self, effects: &mut Vec<Effect>) {
        self.state = WatchState::Done;
        effects.push(Effect::Emit(WatchEvent::State(WatchState::Done)));
        effects.push(Effect::Exit);
    }

    fn next_incomplete(&self) -> Option<String> {
        first_incomplete(self.catalog, &self.record.completed).map(|exercise| exercise.name.clone())
    }
}
