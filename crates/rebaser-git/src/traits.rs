//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts the version-control
//! operations the rebaser needs, enabling dependency injection and testability.

use std::path::Path;

use crate::{Oid, Result};

/// Flags for a single `git push` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Report what would be pushed without touching the remote (`-n`).
    pub dry_run: bool,
    /// Overwrite the remote reference unconditionally (`-f`).
    pub force: bool,
    /// Also push annotated tags reachable from the pushed ref (`--follow-tags`).
    pub follow_tags: bool,
}

impl PushOptions {
    /// Plain push, optionally as a dry run.
    #[must_use]
    pub const fn plain(dry_run: bool) -> Self {
        Self {
            dry_run,
            force: false,
            follow_tags: false,
        }
    }

    /// Force push including reachable tags, optionally as a dry run.
    #[must_use]
    pub const fn force_with_tags(dry_run: bool) -> Self {
        Self {
            dry_run,
            force: true,
            follow_tags: true,
        }
    }

    /// Command-line flags in the order git receives them.
    #[must_use]
    pub fn to_args(self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if self.dry_run {
            args.push("-n");
        }
        if self.force {
            args.push("-f");
        }
        if self.follow_tags {
            args.push("--follow-tags");
        }
        args
    }
}

/// Trait for git repository operations.
///
/// This trait abstracts git operations, allowing for:
/// - Dependency injection in the rebaser and services
/// - Mock implementations for testing
///
/// Revisions are passed as strings (`remote/branch`, tag names, SHAs) because
/// the rebaser compares refs that only exist by name.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the working directory path.
    fn workdir(&self) -> Option<&Path>;

    // === Remote Operations ===

    /// List configured remote names.
    fn remote_names(&self) -> Result<Vec<String>>;

    /// Add a remote.
    fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// Get the push URL of a remote, falling back to its fetch URL.
    fn remote_url(&self, name: &str) -> Result<String>;

    /// Fetch a single remote.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Fetch all remotes.
    fn fetch_all(&self) -> Result<()>;

    /// Check whether `remote/branch` exists as a remote-tracking branch.
    fn remote_branch_exists(&self, remote: &str, branch: &str) -> bool;

    /// Push a single ref to a remote.
    fn push(&self, remote: &str, refname: &str, options: PushOptions) -> Result<()>;

    // === Branch Operations ===

    /// Create `branch` at `start_point`, or hard-reset it there if it exists,
    /// and check it out.
    fn reset_branch_to(&self, branch: &str, start_point: &str) -> Result<()>;

    /// Create a new branch at `commit`. Fails if the branch exists.
    fn create_branch_at(&self, branch: &str, commit: &str) -> Result<Oid>;

    /// Checkout a local branch.
    fn checkout(&self, branch: &str) -> Result<()>;

    // === Rebase Operations ===

    /// Rebase `branch` onto `onto`.
    ///
    /// A stopped rebase is left in progress and reported as
    /// [`crate::Error::RebaseFailed`].
    fn rebase(&self, branch: &str, onto: &str) -> Result<()>;

    /// Skip the patch the in-progress rebase stopped on and continue.
    fn rebase_skip(&self) -> Result<()>;

    /// Abort the in-progress rebase, restoring the pre-rebase branch.
    fn rebase_abort(&self) -> Result<()>;

    // === Tag Operations ===

    /// Create a lightweight tag pointing at `target`.
    fn create_tag(&self, name: &str, target: &str) -> Result<()>;

    /// Delete a local tag.
    fn delete_tag(&self, name: &str) -> Result<()>;

    // === Commit Operations ===

    /// Check whether two revisions resolve to the same commit.
    fn same_commit(&self, one: &str, two: &str) -> Result<bool>;

    /// Count commits reachable from `head` but not from `base`.
    fn count_ahead(&self, head: &str, base: &str) -> Result<usize>;

    /// Stage the given paths (relative to the workdir) and commit them on HEAD.
    fn commit_paths(&self, paths: &[&str], message: &str) -> Result<Oid>;
}
