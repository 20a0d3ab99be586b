//! Resume capability for migration runs
//!
//! Provides persistent checkpoint sets with atomic writes and file locking.

pub mod progress;

pub use progress::{CheckpointSet, CheckpointStore, ProgressKey, ResumeError};
