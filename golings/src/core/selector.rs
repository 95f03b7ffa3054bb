//! Deterministic selection of the current exercise.

use std::collections::BTreeSet;

use crate::core::catalog::Catalog;
use crate::core::types::Exercise;

/// Find the first exercise in catalog order that is not completed.
///
/// Returns `None` if every exercise is complete.
pub fn first_incomplete<'a>(
    catalog: &'a Catalog,
    completed: &BTreeSet<String>,
) -> Option<&'a Exercise> {
    catalog
        .exercises()
        .iter()
        .find(|exercise| !completed.contains(&exercise.name))
}

/// Per-exercise status row for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseStatus {
    pub name: String,
    pub path: String,
    pub done: bool,
    pub current: bool,
}

/// Status of every exercise in catalog order, flagging the current one.
pub fn exercise_statuses(catalog: &Catalog, completed: &BTreeSet<String>) -> Vec<ExerciseStatus> {
    let current = first_incomplete(catalog, completed).map(|exercise| exercise.name.as_str());
    catalog
        .exercises()
        .iter()
        .map(|exercise| ExerciseStatus {
            name: exercise.name.clone(),
            path: exercise.path.display().to_string(),
            done: completed.contains(&exercise.name),
            current: current == Some(exercise.name.as_str()),
        })
        .collect()
}
