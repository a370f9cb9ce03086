//! Dependency-aware scheduling for multi-package release and commit workflows.

pub mod config;
pub mod error;
pub mod graph;
pub mod join;
pub mod manifest;
pub mod operation;
pub mod package;
pub mod pattern;
pub mod repo_lock;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod scanner;

pub use config::WorkspaceConfig;
pub use error::{Error, Result};
pub use graph::{BuildOrder, DependencyGraph, LevelPlan};
pub use operation::{OperationContext, OperationOutcome, PackageOperation};
pub use package::PackageNode;
pub use pattern::{ExcludePattern, ExclusionSet};
pub use repo_lock::{LockStats, RepoGuard, RepoLocks};
pub use report::{render_order_report, OrderReport};
pub use reporter::{NoopReporter, RunReporter};
pub use runner::{ExecutionOptions, PackageResult, RunFailure, RunSummary, Runner};
pub use scanner::Scanner;
