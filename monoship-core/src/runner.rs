//! Resumable execution of a per-package operation in dependency order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{BuildOrder, DependencyGraph, LevelPlan};
use crate::join::{join_tagged, Settled, Tagged};
use crate::operation::{OperationContext, OperationOutcome, PackageOperation};
use crate::reporter::{NoopReporter, RunReporter};

/// Flags controlling one run.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Run level by level with every member of a level in flight together.
    pub parallel: bool,
    /// Preview run; operations must not fail.
    pub dry_run: bool,
    /// Package name or directory name to resume from.
    pub start_from: Option<String>,
    /// Command line prefix used to build the resume instruction.
    pub command_name: String,
    /// Shell-quoted words placed after `--start-from <dir>` in the resume
    /// instruction, such as a trailing command.
    pub resume_args: Vec<String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            dry_run: false,
            start_from: None,
            command_name: "monoship".to_string(),
            resume_args: Vec::new(),
        }
    }
}

/// Settled result for one package.
#[derive(Debug, Clone)]
pub struct PackageResult {
    pub name: String,
    pub dir_name: String,
    /// Position in the full build order.
    pub index: usize,
    pub success: bool,
    pub error: Option<String>,
    pub output: Option<String>,
}

/// The package a run stopped at.
#[derive(Debug)]
pub struct RunFailure {
    pub package: String,
    pub dir_name: String,
    /// Either [`Error::PackageOperation`] or [`Error::UnexpectedRejection`].
    pub error: Error,
}

/// Aggregate outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Packages in the effective order (after `start_from`).
    pub total: usize,
    /// Leading packages skipped by `start_from`.
    pub skipped: usize,
    pub succeeded: usize,
    pub failure: Option<RunFailure>,
    /// Settled packages in submission (build) order.
    pub results: Vec<PackageResult>,
    pub dry_run: bool,
    command_name: String,
    resume_args: Vec<String>,
}

impl RunSummary {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The command that resumes the run at the failed package.
    pub fn resume_command(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|f| resume_instruction(&self.command_name, &f.dir_name, &self.resume_args))
    }

    /// Converts a failed run into its error.
    pub fn into_result(self) -> Result<Self> {
        match self.failure {
            Some(failure) => Err(failure.error),
            None => Ok(self),
        }
    }
}

/// Formats `<command> --start-from <dir> [args...]`.
pub fn resume_instruction(command_name: &str, dir_name: &str, trailing: &[String]) -> String {
    let mut line = format!(
        "{} --start-from {}",
        command_name,
        shell_words::quote(dir_name)
    );
    for arg in trailing {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Drives a [`PackageOperation`] over every package of a graph.
///
/// Sequential mode stops at the first failure. Parallel mode runs one
/// level at a time: every member of a level is awaited before the next
/// level starts, and a failing member stops only the levels after it.
pub struct Runner {
    graph: Arc<DependencyGraph>,
    order: BuildOrder,
    levels: LevelPlan,
    options: ExecutionOptions,
    reporter: Arc<dyn RunReporter>,
}

impl Runner {
    /// Creates a runner, computing the build order and levels up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains a cycle.
    pub fn new(graph: DependencyGraph) -> Result<Self> {
        let order = graph.topological_order()?;
        let levels = graph.dependency_levels(&order)?;
        Ok(Self {
            graph: Arc::new(graph),
            order,
            levels,
            options: ExecutionOptions::default(),
            reporter: Arc::new(NoopReporter),
        })
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_reporter(mut self, reporter: impl RunReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    #[inline]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[inline]
    pub fn order(&self) -> &BuildOrder {
        &self.order
    }

    #[inline]
    pub fn levels(&self) -> &LevelPlan {
        &self.levels
    }

    #[inline]
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Index in the build order the run starts at.
    ///
    /// Matches `start_from` against package names and package directory
    /// names, taking the first hit in build order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartFromNotFound`] listing every package as
    /// `"<dir> (<name>)"` when nothing matches.
    pub fn resolve_start(&self) -> Result<usize> {
        let Some(start_from) = self
            .options
            .start_from
            .as_deref()
            .filter(|s| !s.is_empty())
        else {
            return Ok(0);
        };

        let mut candidates = Vec::with_capacity(self.order.len());
        for (idx, name) in self.order.iter().enumerate() {
            let dir_name = self.dir_name_of(name);
            if name == start_from || dir_name == start_from {
                return Ok(idx);
            }
            candidates.push(format!("{} ({})", dir_name, name));
        }

        Err(Error::StartFromNotFound {
            start_from: start_from.to_string(),
            candidates,
        })
    }

    /// The build order suffix this run will cover.
    pub fn effective_order(&self) -> Result<&[String]> {
        let start = self.resolve_start()?;
        Ok(&self.order.names()[start..])
    }

    /// Runs `operation` for every package of the effective order.
    ///
    /// Operation failures do not surface as `Err`; they are recorded in the
    /// returned summary together with the success count.
    ///
    /// # Errors
    ///
    /// Returns an error only if `start_from` cannot be resolved.
    pub async fn run<O>(&self, operation: Arc<O>) -> Result<RunSummary>
    where
        O: PackageOperation + ?Sized + 'static,
    {
        let start = self.resolve_start()?;
        let total = self.order.len() - start;

        if start > 0 {
            info!(
                skipped = start,
                start_from = %self.order.names()[start],
                "resuming run"
            );
        }
        self.reporter.run_started(total, start);

        let mut summary = RunSummary {
            total,
            skipped: start,
            succeeded: 0,
            failure: None,
            results: Vec::with_capacity(total),
            dry_run: self.options.dry_run,
            command_name: self.options.command_name.clone(),
            resume_args: self.options.resume_args.clone(),
        };

        if self.options.parallel {
            self.run_levels(&operation, start, &mut summary).await?;
        } else {
            self.run_sequential(&operation, start, &mut summary).await?;
        }

        match &summary.failure {
            Some(failure) => warn!(
                package = %failure.package,
                succeeded = summary.succeeded,
                "run stopped"
            ),
            None => info!(succeeded = summary.succeeded, "run completed"),
        }

        Ok(summary)
    }

    async fn run_sequential<O>(
        &self,
        operation: &Arc<O>,
        start: usize,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        O: PackageOperation + ?Sized + 'static,
    {
        for idx in start..self.order.len() {
            let task = self.dispatch(operation, idx)?;
            let settled = join_tagged([(idx, task)]).await;

            for tagged in settled {
                if self.record(tagged, summary) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn run_levels<O>(
        &self,
        operation: &Arc<O>,
        start: usize,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        O: PackageOperation + ?Sized + 'static,
    {
        let positions: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .skip(start)
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        for (level_idx, level) in self.levels.iter().enumerate() {
            let members: Vec<usize> = level
                .iter()
                .filter_map(|name| positions.get(name.as_str()).copied())
                .collect();

            if members.is_empty() {
                continue;
            }

            let names: Vec<String> = members
                .iter()
                .map(|&idx| self.order.names()[idx].clone())
                .collect();
            debug!(level = level_idx, packages = ?names, "dispatching level");
            self.reporter.level_started(level_idx, &names);

            let tasks = members
                .iter()
                .map(|&idx| Ok((idx, self.dispatch(operation, idx)?)))
                .collect::<Result<Vec<_>>>()?;

            let mut stop = false;
            for tagged in join_tagged(tasks).await {
                stop |= self.record(tagged, summary);
            }
            if stop {
                break;
            }
        }
        Ok(())
    }

    /// Builds the task future for the package at `idx` in the build order.
    fn dispatch<O>(
        &self,
        operation: &Arc<O>,
        idx: usize,
    ) -> Result<impl Future<Output = Result<OperationOutcome>> + Send + 'static>
    where
        O: PackageOperation + ?Sized + 'static,
    {
        let name = &self.order.names()[idx];
        let package = self
            .graph
            .get_package(name)
            .cloned()
            .ok_or_else(|| Error::PackageNotFound {
                name: name.clone(),
                available: self.order.names().join(", "),
            })?;

        let ctx = OperationContext {
            package,
            index: idx,
            total: self.order.len(),
            dry_run: self.options.dry_run,
        };
        let operation = Arc::clone(operation);
        let reporter = Arc::clone(&self.reporter);

        Ok(async move {
            reporter.package_started(ctx.name(), ctx.index, ctx.total);
            debug!(package = %ctx.name(), index = ctx.index, "running operation");
            operation.run(ctx).await
        })
    }

    /// Folds one settled task into the summary. Returns `true` if it failed.
    fn record(
        &self,
        tagged: Tagged<usize, Result<OperationOutcome>>,
        summary: &mut RunSummary,
    ) -> bool {
        let idx = tagged.tag;
        let name = self.order.names()[idx].clone();
        let dir_name = self.dir_name_of(&name);

        let (outcome, failure) = match tagged.settled {
            Settled::Completed(Ok(outcome)) if outcome.success => (outcome, None),
            Settled::Completed(Ok(mut outcome)) => {
                let message = outcome
                    .error
                    .get_or_insert_with(|| "operation reported failure".to_string())
                    .clone();
                let error = Error::PackageOperation {
                    package: name.clone(),
                    dir_name: dir_name.clone(),
                    message,
                    output: outcome.output.clone(),
                };
                (outcome, Some(error))
            }
            Settled::Completed(Err(e)) => {
                let message = e.to_string();
                let error = Error::UnexpectedRejection {
                    package: name.clone(),
                    dir_name: dir_name.clone(),
                    message: message.clone(),
                };
                (OperationOutcome::failure(message), Some(error))
            }
            Settled::Aborted(message) => {
                let error = Error::UnexpectedRejection {
                    package: name.clone(),
                    dir_name: dir_name.clone(),
                    message: message.clone(),
                };
                (OperationOutcome::failure(message), Some(error))
            }
        };

        let failure = match failure {
            Some(error) if self.options.dry_run => {
                warn!(package = %name, error = %error, "ignoring failure during dry run");
                None
            }
            other => other,
        };

        let result = PackageResult {
            name: name.clone(),
            dir_name: dir_name.clone(),
            index: idx,
            success: failure.is_none(),
            error: if failure.is_some() { outcome.error } else { None },
            output: outcome.output,
        };
        self.reporter.package_finished(&result);
        summary.results.push(result);

        match failure {
            None => {
                summary.succeeded += 1;
                false
            }
            Some(error) => {
                if summary.failure.is_none() {
                    summary.failure = Some(RunFailure {
                        package: name,
                        dir_name,
                        error,
                    });
                }
                true
            }
        }
    }

    fn dir_name_of(&self, name: &str) -> String {
        self.graph
            .get_package(name)
            .map(|p| p.dir_name())
            .unwrap_or_else(|| name.to_string())
    }
}
