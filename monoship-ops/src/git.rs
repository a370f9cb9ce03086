use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use git2::{Commit, ErrorCode, IndexAddOption, Repository, Signature, StatusOptions};
use monoship_core::error::{Error, Result};
use monoship_core::operation::{OperationContext, OperationOutcome, PackageOperation};
use monoship_core::repo_lock::RepoLocks;
use tracing::{debug, info};

pub const DEFAULT_COMMIT_MESSAGE: &str = "chore({name}): release {version}";

const FALLBACK_NAME: &str = "monoship";
const FALLBACK_EMAIL: &str = "monoship@localhost";

/// Commits each package directory's changes as its own commit.
///
/// Packages that share a repository are committed one at a time through
/// [`RepoLocks`], so staging and committing never interleave.
pub struct GitCommitOperation {
    message: String,
    locks: Arc<RepoLocks>,
}

impl GitCommitOperation {
    pub fn new(locks: Arc<RepoLocks>) -> Self {
        Self {
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            locks,
        }
    }

    /// Sets the message template. `{name}` and `{version}` are expanded
    /// per package.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message_for(&self, ctx: &OperationContext) -> String {
        self.message
            .replace("{name}", &ctx.package.name)
            .replace("{version}", &ctx.package.version)
    }
}

#[async_trait]
impl PackageOperation for GitCommitOperation {
    async fn run(&self, ctx: OperationContext) -> Result<OperationOutcome> {
        let message = self.message_for(&ctx);
        let path = ctx.package.path.clone();
        let dry_run = ctx.dry_run;

        let joined = self
            .locks
            .with_lock(&ctx.package.path, || {
                tokio::task::spawn_blocking(move || commit_package(&path, &message, dry_run))
            })
            .await?;

        match joined {
            Ok(Ok(outcome)) => {
                debug!(package = %ctx.name(), "git commit finished");
                Ok(outcome)
            }
            Ok(Err(e)) => Ok(OperationOutcome::failure(format!("git: {}", e.message()))),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))),
        }
    }
}

/// Stages everything under `dir` (removals included) and commits it.
///
/// Succeeds without committing when the staged tree matches `HEAD`.
fn commit_package(
    dir: &Path,
    message: &str,
    dry_run: bool,
) -> std::result::Result<OperationOutcome, git2::Error> {
    let repo = Repository::discover(dir)?;
    let pathspec = workdir_pathspec(&repo, dir)?;

    if dry_run {
        return preview(&repo, &pathspec);
    }

    let mut index = repo.index()?;
    index.add_all([pathspec.as_str()], IndexAddOption::DEFAULT, None)?;
    index.update_all([pathspec.as_str()], None)?;
    index.write()?;
    let tree_id = index.write_tree()?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(e),
    };

    let unchanged = match &parent {
        Some(parent) => parent.tree_id() == tree_id,
        None => index.is_empty(),
    };
    if unchanged {
        info!(path = %pathspec, "nothing to commit");
        return Ok(OperationOutcome::success().with_output("nothing to commit"));
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = repo
        .signature()
        .or_else(|_| Signature::now(FALLBACK_NAME, FALLBACK_EMAIL))?;
    let parents: Vec<&Commit> = parent.iter().collect();
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;

    let short = oid.to_string();
    info!(commit = %&short[..7], path = %pathspec, "committed");
    Ok(OperationOutcome::success().with_output(format!("[{}] {}", &short[..7], message)))
}

fn preview(
    repo: &Repository,
    pathspec: &str,
) -> std::result::Result<OperationOutcome, git2::Error> {
    let mut options = StatusOptions::new();
    options
        .pathspec(pathspec)
        .include_untracked(true)
        .recurse_untracked_dirs(true);

    let changed: Vec<String> = repo
        .statuses(Some(&mut options))?
        .iter()
        .filter_map(|entry| entry.path().map(str::to_string))
        .collect();

    let output = if changed.is_empty() {
        "nothing to commit".to_string()
    } else {
        format!("would commit {} path(s):\n{}", changed.len(), changed.join("\n"))
    };
    Ok(OperationOutcome::success().with_output(output))
}

/// `dir` relative to the repository work tree, using `/` separators.
fn workdir_pathspec(repo: &Repository, dir: &Path) -> std::result::Result<String, git2::Error> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| git2::Error::from_str("cannot commit in a bare repository"))?;
    let workdir = canonical(workdir);
    let dir = canonical(dir);

    let relative = dir.strip_prefix(&workdir).map_err(|_| {
        git2::Error::from_str(&format!(
            "{} is outside the work tree {}",
            dir.display(),
            workdir.display()
        ))
    })?;

    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(if joined.is_empty() { ".".to_string() } else { joined })
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
