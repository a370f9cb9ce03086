use std::fs;
use std::path::Path;
use std::sync::Arc;

use git2::Repository;
use monoship_core::{
    DependencyGraph, ExecutionOptions, OperationContext, PackageNode, PackageOperation,
    RepoLocks, Runner,
};
use monoship_ops::GitCommitOperation;
use tempfile::TempDir;

fn init_workspace() -> (TempDir, Repository) {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Release Bot").unwrap();
        config.set_str("user.email", "release@example.com").unwrap();
    }
    for name in ["a", "b"] {
        let dir = temp.path().join("packages").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{}","version":"1.0.0"}}"#, name),
        )
        .unwrap();
        fs::write(dir.join("CHANGELOG.md"), "# 1.0.0\n").unwrap();
    }
    (temp, repo)
}

fn commit_count(repo: &Repository) -> usize {
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.count()
}

fn graph(root: &Path) -> DependencyGraph {
    DependencyGraph::new(vec![
        PackageNode::new("a", Some("1.0.0".into()), root.join("packages/a"), Vec::<String>::new()),
        PackageNode::new("b", Some("1.0.0".into()), root.join("packages/b"), Vec::<String>::new()),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_parallel_commits_in_one_repository() {
    let (temp, repo) = init_workspace();
    let locks = Arc::new(RepoLocks::new());
    let op = Arc::new(GitCommitOperation::new(Arc::clone(&locks)));

    let runner = Runner::new(graph(temp.path())).unwrap().with_options(ExecutionOptions {
        parallel: true,
        ..ExecutionOptions::default()
    });
    let summary = runner.run(Arc::clone(&op)).await.unwrap();

    assert!(summary.is_success(), "{:?}", summary.failure);
    assert_eq!(commit_count(&repo), 2);

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.author().email(), Some("release@example.com"));
    let message = head.message().unwrap().to_string();
    assert!(message == "chore(a): release 1.0.0" || message == "chore(b): release 1.0.0");
    assert_eq!(locks.stats().locked_roots, 0);

    // nothing changed since: success without new commits
    let summary = runner.run(op).await.unwrap();
    assert!(summary.is_success());
    assert_eq!(commit_count(&repo), 2);
}

#[tokio::test]
async fn test_commit_stages_only_the_package_directory() {
    let (temp, repo) = init_workspace();
    fs::write(temp.path().join("ROOT.md"), "untouched").unwrap();

    let op = GitCommitOperation::new(Arc::new(RepoLocks::new())).with_message("release {name}");
    let package = PackageNode::new(
        "a",
        Some("1.0.0".into()),
        temp.path().join("packages/a"),
        Vec::<String>::new(),
    );
    let outcome = op
        .run(OperationContext {
            package,
            index: 0,
            total: 1,
            dry_run: false,
        })
        .await
        .unwrap();
    assert!(outcome.success);

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("release a"));
    let tree = head.tree().unwrap();
    assert!(tree.get_path(Path::new("packages/a/package.json")).is_ok());
    assert!(tree.get_path(Path::new("packages/b/package.json")).is_err());
    assert!(tree.get_path(Path::new("ROOT.md")).is_err());
}

#[tokio::test]
async fn test_dry_run_lists_changes_without_committing() {
    let (temp, repo) = init_workspace();

    let op = GitCommitOperation::new(Arc::new(RepoLocks::new()));
    let outcome = op
        .run(OperationContext {
            package: PackageNode::new(
                "b",
                None,
                temp.path().join("packages/b"),
                Vec::<String>::new(),
            ),
            index: 0,
            total: 1,
            dry_run: true,
        })
        .await
        .unwrap();

    assert!(outcome.success);
    let output = outcome.output.unwrap();
    assert!(output.starts_with("would commit 2 path(s)"));
    assert!(output.contains("packages/b/CHANGELOG.md"));
    assert!(repo.head().is_err());
}

#[test]
fn test_message_template_expansion() {
    let op = GitCommitOperation::new(Arc::new(RepoLocks::new()))
        .with_message("{name} v{version}");
    let ctx = OperationContext {
        package: PackageNode::new("@acme/ui", Some("3.0.0".into()), "/tmp/ui", Vec::<String>::new()),
        index: 0,
        total: 1,
        dry_run: false,
    };
    assert_eq!(op.message_for(&ctx), "@acme/ui v3.0.0");
}
