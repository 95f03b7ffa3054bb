//! One-shot verification for `golings verify` and `golings run`.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::core::catalog::Catalog;
use crate::core::selector::first_incomplete;
use crate::core::types::{Exercise, ProgressRecord, VerificationOutcome};
use crate::io::process::CancelToken;
use crate::io::progress::ProgressStore;
use crate::io::verifier::Verifier;

/// Where a `verify` pass stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStop {
    /// Every exercise has passed.
    Complete,
    /// `exercise` did not pass; later exercises were not attempted.
    NotPassing {
        exercise: String,
        outcome: VerificationOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub stop: VerifyStop,
    /// Exercises newly marked complete by this pass.
    pub passed: Vec<String>,
    /// Non-fatal problems (progress could not be saved).
    pub warnings: Vec<String>,
}

/// Verify exercises in catalog order, starting at the first incomplete one.
///
/// Each pass is recorded and saved before moving on; the first non-pass
/// stops the run. `on_result` sees every outcome as it is produced.
pub fn verify_all<V, F>(
    catalog: &Catalog,
    store: &ProgressStore,
    verifier: &V,
    timeout: Duration,
    mut on_result: F,
) -> VerifyReport
where
    V: Verifier,
    F: FnMut(&Exercise, &VerificationOutcome),
{
    let mut record = store.load();
    let mut passed = Vec::new();
    let mut warnings = Vec::new();
    let cancel = CancelToken::new();

    loop {
        let Some(exercise) = first_incomplete(catalog, &record.completed) else {
            if record.current.take().is_some() {
                persist(store, &record, &mut warnings);
            }
            info!(passed = passed.len(), "all exercises complete");
            return VerifyReport {
                stop: VerifyStop::Complete,
                passed,
                warnings,
            };
        };

        let outcome = verifier.verify(exercise, timeout, &cancel);
        on_result(exercise, &outcome);
        if !outcome.is_pass() {
            if record.current.as_deref() != Some(exercise.name.as_str()) {
                record.current = Some(exercise.name.clone());
                persist(store, &record, &mut warnings);
            }
            return VerifyReport {
                stop: VerifyStop::NotPassing {
                    exercise: exercise.name.clone(),
                    outcome,
                },
                passed,
                warnings,
            };
        }

        record.completed.insert(exercise.name.clone());
        passed.push(exercise.name.clone());
        record.current =
            first_incomplete(catalog, &record.completed).map(|next| next.name.clone());
        persist(store, &record, &mut warnings);
    }
}

/// Verify one exercise by name; a pass marks it complete.
///
/// Progress stays monotonic: a non-pass never clears an earlier completion.
pub fn run_single<V: Verifier>(
    catalog: &Catalog,
    store: &ProgressStore,
    verifier: &V,
    name: &str,
    timeout: Duration,
) -> Result<(VerificationOutcome, Vec<String>)> {
    let exercise = catalog
        .get(name)
        .ok_or_else(|| anyhow!("unknown exercise '{name}'"))?;
    let outcome = verifier.verify(exercise, timeout, &CancelToken::new());

    let mut warnings = Vec::new();
    if outcome.is_pass() {
        let mut record = store.load();
        if record.completed.insert(exercise.name.clone()) {
            record.current =
                first_incomplete(catalog, &record.completed).map(|next| next.name.clone());
            persist(store, &record, &mut warnings);
        }
    }
    Ok((outcome, warnings))
}

fn persist(store: &ProgressStore, record: &ProgressRecord, warnings: &mut Vec<String>) {
    if let Err(err) = store.save(record) {
        warn!(%err, "progress not saved");
        warnings.push(format!("progress not saved: {err}"));
    }
}
