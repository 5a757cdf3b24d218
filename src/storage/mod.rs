//! Storage is organized through [store::FileStore].
//! The basic idea is:
//!   - There is a directory with one JSON document per key.
//!   - Habits, entries and sections are JSON arrays, newest record first.
//!   - Every write happens under an exclusive file lock, reads take a shared one.

pub mod entities;
pub mod store;
