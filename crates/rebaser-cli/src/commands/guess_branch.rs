//! `patch-rebaser guess-branch` command - Resolve a distgit branch.

use std::path::Path;

use anyhow::{Context, Result, bail};
use rebaser_core::find_patches_branch;
use rebaser_git::Repository;

use crate::output;

/// Print the patches branch matching `distgit_branch` on `remote`.
pub fn run(distgit_branch: &str, remote: &str, repo_path: &Path) -> Result<()> {
    let repo = Repository::open(repo_path)
        .with_context(|| format!("Not a git repository: {}", repo_path.display()))?;

    match find_patches_branch(&repo, remote, distgit_branch) {
        Some(branch) => {
            output::essential(&branch);
            Ok(())
        }
        None => bail!("No patches branch on {remote} matches {distgit_branch}"),
    }
}
