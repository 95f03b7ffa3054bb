//! Status listing and hint lookup for `golings list` and `golings hint`.

use std::fmt::Write as _;

use anyhow::{Result, anyhow};

use crate::core::catalog::Catalog;
use crate::core::selector::{ExerciseStatus, exercise_statuses, first_incomplete};
use crate::io::progress::ProgressStore;

/// Status rows for every exercise, from the persisted progress.
///
/// Only reads the progress file, so it is safe while a watch session writes it.
pub fn list_exercises(catalog: &Catalog, store: &ProgressStore) -> Vec<ExerciseStatus> {
    let record = store.load();
    exercise_statuses(catalog, &record.completed)
}

/// Plain-text table with a progress summary line.
pub fn render_statuses(statuses: &[ExerciseStatus]) -> String {
    let name_width = statuses
        .iter()
        .map(|status| status.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let path_width = statuses
        .iter()
        .map(|status| status.path.len())
        .max()
        .unwrap_or(0)
        .max("Path".len());

    let mut out = String::new();
    let _ = writeln!(out, "  {:name_width$}  {:path_width$}  Status", "Name", "Path");
    for status in statuses {
        let marker = if status.current { ">" } else { " " };
        let state = if status.done { "Done" } else { "Pending" };
        let _ = writeln!(
            out,
            "{marker} {:name_width$}  {:path_width$}  {state}",
            status.name, status.path
        );
    }
    let done = statuses.iter().filter(|status| status.done).count();
    let percent = if statuses.is_empty() {
        0
    } else {
        done * 100 / statuses.len()
    };
    let _ = writeln!(out, "Progress: {done}/{} ({percent}%)", statuses.len());
    out
}

/// Hint for `name`, or for the current exercise when `name` is `None`.
///
/// Returns the exercise name alongside its hint.
pub fn lookup_hint(
    catalog: &Catalog,
    store: &ProgressStore,
    name: Option<&str>,
) -> Result<(String, String)> {
    let exercise = match name {
        Some(name) => catalog
            .get(name)
            .ok_or_else(|| anyhow!("unknown exercise '{name}'"))?,
        None => {
            let record = store.load();
            first_incomplete(catalog, &record.completed)
                .ok_or_else(|| anyhow!("all exercises are complete"))?
        }
    };
    Ok((exercise.name.clone(), exercise.hint.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProgressRecord;
    use crate::test_support::catalog;

    fn store_with(temp: &tempfile::TempDir, completed: &[&str]) -> ProgressStore {
        let store = ProgressStore::new(temp.path().join("progress.json"));
        store
            .save(&ProgressRecord {
                completed: completed.iter().map(|name| (*name).to_string()).collect(),
                current: None,
            })
            .expect("seed progress");
        store
    }

    #[test]
    fn render_marks_done_and_current() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = store_with(&temp, &["a"]);

        let rendered = render_statuses(&list_exercises(&catalog(&["a", "bb"]), &store));
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("  a ") && lines[1].ends_with("Done"));
        assert!(lines[2].starts_with("> bb") && lines[2].ends_with("Pending"));
        assert_eq!(lines[3], "Progress: 1/2 (50%)");
    }

    #[test]
    fn hint_defaults_to_current_exercise() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = store_with(&temp, &["a"]);
        let catalog = catalog(&["a", "b"]);

        assert_eq!(
            lookup_hint(&catalog, &store, None).expect("hint"),
            ("b".to_string(), "b hint".to_string())
        );
        assert_eq!(
            lookup_hint(&catalog, &store, Some("a")).expect("hint").1,
            "a hint"
        );
        assert!(lookup_hint(&catalog, &store, Some("zzz")).is_err());
    }

    #[test]
    fn hint_without_remaining_exercises_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = store_with(&temp, &["a"]);

        let err = lookup_hint(&catalog(&["a"]), &store, None).expect_err("complete");
        assert!(err.to_string().contains("all exercises are complete"));
    }
}
