//! Local source access for the viewer.
//!
//! `target` resolves what to show; `worker` owns the `git2::Repository` on a
//! background thread and returns highlighted text.
pub mod target;
pub mod types;
pub mod worker;
