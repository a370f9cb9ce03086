//! Trait for observing run progress.

use crate::runner::PackageResult;

/// Receives progress events from the runner.
///
/// This lets front ends drive progress bars or logs without the core
/// writing to stdout/stderr. Every method defaults to doing nothing.
pub trait RunReporter: Send + Sync {
    /// Called once before any package runs.
    ///
    /// * `total` - Packages that will be considered in this run
    /// * `skipped` - Leading packages skipped by `start_from`
    fn run_started(&self, _total: usize, _skipped: usize) {}

    /// Called before a level is dispatched in parallel mode.
    fn level_started(&self, _level: usize, _packages: &[String]) {}

    /// Called when a package's operation is about to start.
    fn package_started(&self, _name: &str, _index: usize, _total: usize) {}

    /// Called once a package's operation has settled.
    fn package_finished(&self, _result: &PackageResult) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl RunReporter for NoopReporter {}
