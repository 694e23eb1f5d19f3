//! Progress hooks for the batch and sync engines
//!
//! The engines never print. Callers pass an observer to decide how progress
//! and failures are shown; [`Quiet`] ignores everything.

use crate::metadata::PackageMetadata;
use crate::sync::BookResult;
use std::path::Path;

/// Receives batch conversion progress
pub trait BatchObserver {
    /// Planning finished with `total` jobs
    fn batch_started(&mut self, _total: usize) {}

    /// A job is about to run; `index` is 1-based
    fn job_started(&mut self, _index: usize, _total: usize, _input: &Path, _skipping: bool) {}

    /// A job failed; the batch continues
    fn job_failed(&mut self, _input: &Path, _output: &Path, _reason: &str) {}
}

/// Receives metadata sync progress
pub trait SyncObserver {
    /// The catalog backup was written
    fn backup_created(&mut self, _backup: &Path) {}

    /// The device scan finished
    fn books_found(&mut self, _total: usize) {}

    /// A book is about to be processed; `index` is 1-based
    fn book_started(&mut self, _index: usize, _total: usize, _relative: &Path) {}

    /// Series metadata was read from the current book
    fn metadata_found(&mut self, _metadata: &PackageMetadata) {}

    /// The current book reached a terminal state
    fn book_finished(&mut self, _result: &BookResult) {}
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct Quiet;

impl BatchObserver for Quiet {}

impl SyncObserver for Quiet {}
