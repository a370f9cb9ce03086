mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use commands::{ExecutionArgs, GlobalArgs};

#[derive(Parser)]
#[command(name = "monoship")]
#[command(about = "Dependency-ordered, resumable release and commit runner for multi-package workspaces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "./packages", global = true)]
    packages_dir: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short, long, action, global = true)]
    quiet: bool,

    /// Glob pattern of package directories to skip (repeatable)
    #[arg(long, value_name = "PATTERN", global = true)]
    exclude: Vec<String>,
}

#[derive(Args)]
struct ExecutionFlags {
    /// Run each dependency level concurrently
    #[arg(long, action)]
    parallel: bool,

    /// Report what would happen without changing anything
    #[arg(long, action)]
    dry_run: bool,

    /// Resume at this package (directory or package name)
    #[arg(long, value_name = "PACKAGE")]
    start_from: Option<String>,
}

impl From<ExecutionFlags> for ExecutionArgs {
    fn from(flags: ExecutionFlags) -> Self {
        ExecutionArgs {
            parallel: flags.parallel,
            dry_run: flags.dry_run,
            start_from: flags.start_from,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered packages
    Scan {
        #[arg(long, action)]
        json: bool,
    },
    /// Print the build order
    Order {
        #[arg(long, action)]
        json: bool,
    },
    /// Print the dependency levels
    Levels {
        #[arg(long, action)]
        json: bool,
    },
    /// Run a shell command in every package directory
    Run {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        #[command(flatten)]
        flags: ExecutionFlags,
    },
    /// Commit each package directory in its repository
    Commit {
        #[arg(short, long)]
        message: Option<String>,
        #[command(flatten)]
        flags: ExecutionFlags,
    },
    /// Publish each package with the package manager
    Publish {
        #[arg(long, default_value = monoship_ops::DEFAULT_PUBLISH_TOOL)]
        tool: String,
        #[command(flatten)]
        flags: ExecutionFlags,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let global = GlobalArgs {
        packages_dir: cli.packages_dir,
        exclude: cli.exclude,
    };

    match cli.command {
        Commands::Scan { json } => commands::cmd_scan(&global, json)?,
        Commands::Order { json } => commands::cmd_order(&global, json)?,
        Commands::Levels { json } => commands::cmd_levels(&global, json)?,
        Commands::Run { command, flags } => commands::cmd_run(&global, command, flags.into())?,
        Commands::Commit { message, flags } => {
            commands::cmd_commit(&global, message, flags.into())?
        }
        Commands::Publish { tool, flags } => commands::cmd_publish(&global, tool, flags.into())?,
    }

    Ok(())
}
