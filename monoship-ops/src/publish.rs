use async_trait::async_trait;
use monoship_core::error::Result;
use monoship_core::operation::{OperationContext, OperationOutcome, PackageOperation};
use tracing::info;

use crate::shell::run_in_dir;

pub const DEFAULT_PUBLISH_TOOL: &str = "npm";

/// Runs `<tool> publish` in every package directory.
pub struct PublishOperation {
    tool: String,
    args: Vec<String>,
}

impl Default for PublishOperation {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISH_TOOL)
    }
}

impl PublishOperation {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments appended after `publish`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn command_line(&self) -> String {
        let mut line = format!("{} publish", self.tool);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[async_trait]
impl PackageOperation for PublishOperation {
    async fn run(&self, ctx: OperationContext) -> Result<OperationOutcome> {
        let command = self.command_line();

        if ctx.dry_run {
            info!(package = %ctx.name(), version = %ctx.package.version, "dry run: {}", command);
            return Ok(OperationOutcome::success().with_output(format!(
                "would publish {}@{} with `{}`",
                ctx.package.name, ctx.package.version, command
            )));
        }

        let mut args = vec!["publish"];
        args.extend(self.args.iter().map(String::as_str));
        Ok(run_in_dir(&self.tool, &args, &ctx.package.path).await)
    }
}
