//! Deterministic, pure logic shared by the playground.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod invariants;
pub mod markdown;
pub mod types;
