//! Ordered, read-only exercise catalog.

use crate::core::types::Exercise;

/// Exercises in catalog order, sorted by `(order, name)`.
///
/// Built once at startup and only read afterwards; share it behind an `Arc`
/// when several threads need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    pub fn new(mut exercises: Vec<Exercise>) -> Self {
        exercises.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Self { exercises }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|exercise| exercise.name == name)
    }

    /// Zero-based position of `name` in catalog order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.exercises
            .iter()
            .position(|exercise| exercise.name == name)
    }

    pub fn hint(&self, name: &str) -> Option<&str> {
        self.get(name).map(|exercise| exercise.hint.as_str())
    }
}
