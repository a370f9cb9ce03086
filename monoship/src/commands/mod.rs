//! Command implementations for the CLI.

mod discovery;
mod execution;

use std::path::PathBuf;

use anyhow::{Context, Result};
use monoship_core::{DependencyGraph, Scanner, WorkspaceConfig};
use tracing::debug;

pub use discovery::{cmd_levels, cmd_order, cmd_scan};
pub use execution::{cmd_commit, cmd_publish, cmd_run};

/// Options shared by every subcommand.
pub struct GlobalArgs {
    pub packages_dir: PathBuf,
    pub exclude: Vec<String>,
}

/// Flags shared by the execution subcommands.
pub struct ExecutionArgs {
    pub parallel: bool,
    pub dry_run: bool,
    pub start_from: Option<String>,
}

/// Loads `monoship.toml` and appends `--exclude` patterns to its list.
fn load_config(global: &GlobalArgs) -> Result<WorkspaceConfig> {
    let mut config = WorkspaceConfig::discover(&global.packages_dir)?;
    match &config.config_path {
        Some(path) => debug!(config = %path.display(), "loaded workspace config"),
        None => debug!("no workspace config found, using defaults"),
    }
    config.exclude.extend(global.exclude.iter().cloned());
    Ok(config)
}

fn load_graph(global: &GlobalArgs, config: &WorkspaceConfig) -> Result<DependencyGraph> {
    let packages = Scanner::from_config(&global.packages_dir, config)?
        .scan()
        .with_context(|| format!("failed to scan {}", global.packages_dir.display()))?;
    Ok(DependencyGraph::new(packages)?)
}
