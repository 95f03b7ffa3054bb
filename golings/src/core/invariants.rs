//! Catalog invariants checked after the manifest is parsed.

use std::collections::HashMap;
use std::path::Component;

use crate::core::types::Exercise;

/// Check invariants that the manifest syntax cannot express:
/// - Names are non-empty and unique
/// - Ordinals are unique (so catalog order is total)
/// - Paths are non-empty and stay inside the project root
///
/// Every violation is reported; the check never stops at the first one.
pub fn validate_exercises(exercises: &[Exercise]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut orders: HashMap<i64, &str> = HashMap::new();

    for (index, exercise) in exercises.iter().enumerate() {
        let label = if exercise.name.trim().is_empty() {
            errors.push(format!("exercise #{}: name must not be empty", index + 1));
            format!("#{}", index + 1)
        } else {
            exercise.name.clone()
        };

        if let Some(first) = names.insert(exercise.name.as_str(), index)
            && !exercise.name.trim().is_empty()
        {
            errors.push(format!(
                "duplicate name '{}' (entries #{} and #{})",
                exercise.name,
                first + 1,
                index + 1
            ));
        }

        if let Some(other) = orders.insert(exercise.order, exercise.name.as_str()) {
            errors.push(format!(
                "duplicate order {} for '{}' and '{}'",
                exercise.order, other, label
            ));
        }

        if exercise.path.as_os_str().is_empty() {
            errors.push(format!("{label}: path must not be empty"));
        } else if !path_stays_inside_root(exercise) {
            errors.push(format!(
                "{label}: path {} must be relative to the project root",
                exercise.path.display()
            ));
        }
    }

    errors
}

fn path_stays_inside_root(exercise: &Exercise) -> bool {
    exercise
        .path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
