//! The per-package operation interface driven by the runner.

use async_trait::async_trait;

use crate::error::Result;
use crate::package::PackageNode;

/// Everything an operation learns about the package it runs for.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub package: PackageNode,
    /// Position of the package in the full build order.
    pub index: usize,
    /// Length of the full build order.
    pub total: usize,
    /// Set when the run is a preview; the operation must not mutate
    /// anything and must report success.
    pub dry_run: bool,
}

impl OperationContext {
    #[inline]
    pub fn name(&self) -> &str {
        &self.package.name
    }
}

/// What an operation reports back for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// Diagnostic output captured while running (tool stdout/stderr).
    pub output: Option<String>,
}

impl OperationOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        let output = output.into();
        if !output.trim().is_empty() {
            self.output = Some(output);
        }
        self
    }
}

/// An operation run once per package, e.g. "commit" or "publish".
///
/// A declared failure is `Ok` with `success: false`. Returning `Err`
/// signals that the operation broke outside its own failure contract;
/// the runner treats both as a stop but reports them differently.
#[async_trait]
pub trait PackageOperation: Send + Sync {
    async fn run(&self, ctx: OperationContext) -> Result<OperationOutcome>;
}
