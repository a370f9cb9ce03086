use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use monoship_core::error::Result;
use monoship_core::operation::{OperationContext, OperationOutcome, PackageOperation};
use monoship_core::repo_lock::RepoLocks;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs a shell command in every package directory.
pub struct ShellOperation {
    command: String,
    locks: Option<Arc<RepoLocks>>,
}

impl ShellOperation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            locks: None,
        }
    }

    /// Serializes commands that run inside the same repository.
    pub fn with_repo_locks(mut self, locks: Arc<RepoLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl PackageOperation for ShellOperation {
    async fn run(&self, ctx: OperationContext) -> Result<OperationOutcome> {
        let dir = &ctx.package.path;

        if ctx.dry_run {
            info!(package = %ctx.name(), command = %self.command, "dry run");
            return Ok(OperationOutcome::success()
                .with_output(format!("would run `{}` in {}", self.command, dir.display())));
        }

        let args = ["-c", self.command.as_str()];
        match &self.locks {
            Some(locks) => locks.with_lock(dir, || run_in_dir("sh", &args, dir)).await,
            None => Ok(run_in_dir("sh", &args, dir).await),
        }
    }
}

/// Runs `program` in `dir`, capturing stdout and stderr.
///
/// A spawn failure or non-zero exit is reported as a failed outcome
/// carrying whatever output was produced.
pub(crate) async fn run_in_dir(program: &str, args: &[&str], dir: &Path) -> OperationOutcome {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %command_line, dir = %dir.display(), "spawning");

    let output = match Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => return OperationOutcome::failure(format!("failed to run `{}`: {}", command_line, e)),
    };

    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        OperationOutcome::success().with_output(captured)
    } else {
        OperationOutcome::failure(format!("`{}` exited with {}", command_line, output.status))
            .with_output(captured)
    }
}
