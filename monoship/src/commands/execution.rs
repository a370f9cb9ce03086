//! Resumable execution commands.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;

use monoship_core::{
    DependencyGraph, ExecutionOptions, PackageOperation, PackageResult, RepoLocks, RunReporter,
    RunSummary, Runner, WorkspaceConfig,
};
use monoship_ops::{GitCommitOperation, PublishOperation, ShellOperation};

use crate::formatting::{
    create_progress_bar, format_duration, print_error, print_results_table, print_section_header,
    print_separator_with_spacing, print_success, print_summary_box, print_warning, SectionStyle,
};

use super::{load_config, load_graph, ExecutionArgs, GlobalArgs};

/// Drives the progress bar from runner events.
#[derive(Clone)]
struct ProgressReporter {
    bar: ProgressBar,
}

impl RunReporter for ProgressReporter {
    fn run_started(&self, total: usize, _skipped: usize) {
        self.bar.set_length(total as u64);
    }

    fn level_started(&self, level: usize, packages: &[String]) {
        self.bar
            .set_message(format!("level {} ({} packages)", level, packages.len()));
    }

    fn package_started(&self, name: &str, _index: usize, _total: usize) {
        self.bar.set_message(name.to_string());
    }

    fn package_finished(&self, result: &PackageResult) {
        if !result.success {
            self.bar
                .println(format!("  {} {}", "✗".red(), result.name.red().bold()));
        }
        self.bar.inc(1);
    }
}

/// The words that re-invoke a subcommand. `--start-from` is inserted
/// between `subcommand` and `trailing`.
struct Invocation {
    subcommand: Vec<String>,
    trailing: Vec<String>,
}

impl Invocation {
    fn new(subcommand: &[&str]) -> Self {
        Self {
            subcommand: subcommand.iter().map(|w| w.to_string()).collect(),
            trailing: Vec::new(),
        }
    }

    fn arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.subcommand.push(flag.to_string());
        self.subcommand.push(value.into());
        self
    }

    fn trailing(mut self, words: &[String]) -> Self {
        self.trailing = std::iter::once("--".to_string())
            .chain(words.iter().cloned())
            .collect();
        self
    }

    /// Shell-quoted command line up to (not including) `--start-from`.
    fn prefix(&self, global: &GlobalArgs, args: &ExecutionArgs) -> String {
        let mut words = vec![
            "monoship".to_string(),
            "--packages-dir".to_string(),
            global.packages_dir.display().to_string(),
        ];
        for pattern in &global.exclude {
            words.push("--exclude".to_string());
            words.push(pattern.clone());
        }
        words.extend(self.subcommand.iter().cloned());
        if args.parallel {
            words.push("--parallel".to_string());
        }
        if args.dry_run {
            words.push("--dry-run".to_string());
        }
        shell_words::join(words)
    }

    fn quoted_trailing(&self) -> Vec<String> {
        self.trailing
            .iter()
            .map(|word| shell_words::quote(word).into_owned())
            .collect()
    }
}

pub fn cmd_run(global: &GlobalArgs, command: Vec<String>, args: ExecutionArgs) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;
    let operation = ShellOperation::new(command.join(" ")).with_repo_locks(Arc::new(RepoLocks::new()));

    execute(
        graph,
        &config,
        global,
        args,
        Invocation::new(&["run"]).trailing(&command),
        &format!("Running `{}`", operation.command()),
        Arc::new(operation),
    )
}

pub fn cmd_commit(global: &GlobalArgs, message: Option<String>, args: ExecutionArgs) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;

    let mut invocation = Invocation::new(&["commit"]);
    if let Some(message) = &message {
        invocation = invocation.arg("--message", message.clone());
    }

    let mut operation = GitCommitOperation::new(Arc::new(RepoLocks::new()));
    if let Some(message) = message.or_else(|| config.commit_message.clone()) {
        operation = operation.with_message(message);
    }

    execute(
        graph,
        &config,
        global,
        args,
        invocation,
        "Committing packages",
        Arc::new(operation),
    )
}

pub fn cmd_publish(global: &GlobalArgs, tool: String, args: ExecutionArgs) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;

    execute(
        graph,
        &config,
        global,
        args,
        Invocation::new(&["publish"]).arg("--tool", tool.clone()),
        "Publishing packages",
        Arc::new(PublishOperation::new(tool)),
    )
}

fn execute<O>(
    graph: DependencyGraph,
    config: &WorkspaceConfig,
    global: &GlobalArgs,
    args: ExecutionArgs,
    invocation: Invocation,
    title: &str,
    operation: Arc<O>,
) -> Result<()>
where
    O: PackageOperation + 'static,
{
    let start = Instant::now();
    let options = ExecutionOptions {
        parallel: args.parallel || config.parallel,
        dry_run: args.dry_run,
        command_name: invocation.prefix(global, &args),
        resume_args: invocation.quoted_trailing(),
        start_from: args.start_from,
    };
    let parallel = options.parallel;
    let dry_run = options.dry_run;

    let title = if dry_run {
        format!("{} (dry run)", title)
    } else {
        title.to_string()
    };
    print_section_header(&title, SectionStyle::Primary);

    let bar = create_progress_bar(graph.len() as u64);
    let runner = Runner::new(graph)?
        .with_options(options)
        .with_reporter(ProgressReporter { bar: bar.clone() });

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let summary = rt.block_on(runner.run(operation));
    bar.finish_and_clear();
    let summary = summary?;

    print_results_table(&summary.results, dry_run);
    println!();
    print_outcome(&summary);

    print_separator_with_spacing();
    let mode = if parallel { "parallel" } else { "sequential" };
    print_summary_box(
        "Summary",
        &[
            ("Mode", mode),
            ("Succeeded", &format!("{}/{}", summary.succeeded, summary.total)),
            ("Skipped", &summary.skipped.to_string()),
            ("Duration", &format_duration(start.elapsed().as_secs_f64())),
        ],
    );
    println!();

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_outcome(summary: &RunSummary) {
    match (&summary.failure, summary.resume_command()) {
        (Some(failure), Some(resume)) => {
            print_error(&failure.error.to_string());
            print_warning(&format!(
                "{} of {} packages completed before the failure",
                summary.succeeded, summary.total
            ));
            println!();
            println!("  To resume, run:");
            println!("    {}", resume);
        }
        _ if summary.dry_run => print_success(&format!(
            "Dry run complete: {} packages checked",
            summary.succeeded
        )),
        _ => print_success(&format!("All {} packages succeeded", summary.succeeded)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use monoship_core::runner::resume_instruction;

    use super::*;

    fn global() -> GlobalArgs {
        GlobalArgs {
            packages_dir: PathBuf::from("my packages"),
            exclude: vec!["test-*".to_string()],
        }
    }

    fn flags(parallel: bool) -> ExecutionArgs {
        ExecutionArgs {
            parallel,
            dry_run: false,
            start_from: Some("core".to_string()),
        }
    }

    fn resume_words(invocation: &Invocation, args: &ExecutionArgs) -> Vec<String> {
        let line = resume_instruction(
            &invocation.prefix(&global(), args),
            "utils",
            &invocation.quoted_trailing(),
        );
        shell_words::split(&line).unwrap()
    }

    #[test]
    fn test_run_resume_keeps_command_words() {
        let command = vec!["test".to_string(), "!".to_string(), "-e".to_string(), "FAIL".to_string()];
        let invocation = Invocation::new(&["run"]).trailing(&command);

        assert_eq!(
            resume_words(&invocation, &flags(true)),
            vec![
                "monoship", "--packages-dir", "my packages", "--exclude", "test-*", "run",
                "--parallel", "--start-from", "utils", "--", "test", "!", "-e", "FAIL",
            ]
        );
    }

    #[test]
    fn test_commit_resume_keeps_message() {
        let invocation = Invocation::new(&["commit"]).arg("--message", "release: {name} it's done");

        assert_eq!(
            resume_words(&invocation, &flags(false)),
            vec![
                "monoship", "--packages-dir", "my packages", "--exclude", "test-*", "commit",
                "--message", "release: {name} it's done", "--start-from", "utils",
            ]
        );
    }

    #[test]
    fn test_publish_resume_keeps_tool() {
        let invocation = Invocation::new(&["publish"]).arg("--tool", "pnpm");
        let words = resume_words(&invocation, &flags(false));
        assert_eq!(&words[5..], &["publish", "--tool", "pnpm", "--start-from", "utils"]);
    }
}
