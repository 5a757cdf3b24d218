//! Terminal habit journal. Habits and dated entries live in local JSON documents first and can be
//! mirrored to a PostgREST style backend when a user is signed in.
//!

pub mod calendar;
pub mod cli;
pub mod export;
pub mod fs;
pub mod import;
pub mod journal;
pub mod remote;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod utils;
