//! Operations that run once per package: shell commands, git commits and
//! registry publishing.

pub mod git;
pub mod publish;
pub mod shell;

pub use git::{GitCommitOperation, DEFAULT_COMMIT_MESSAGE};
pub use publish::{PublishOperation, DEFAULT_PUBLISH_TOOL};
pub use shell::ShellOperation;
