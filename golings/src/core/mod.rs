//! Deterministic, pure logic shared by the exercise engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod classifier;
pub mod invariants;
pub mod machine;
pub mod marker;
pub mod selector;
pub mod types;
