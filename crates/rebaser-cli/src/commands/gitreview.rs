//! `patch-rebaser gitreview` command - Regenerate `.gitreview`.

use std::path::Path;

use anyhow::{Context, Result};
use rebaser_core::GitReviewGenerator;
use rebaser_core::gitreview::GITREVIEW_FILE;
use rebaser_core::rebase::MetadataGenerator;
use rebaser_git::Repository;

use crate::output;

/// Write `.gitreview` for `remote`/`branch`, committing it when `commit`.
pub fn run(remote: &str, branch: &str, repo_path: &Path, commit: bool) -> Result<()> {
    let repo = Repository::open(repo_path)
        .with_context(|| format!("Not a git repository: {}", repo_path.display()))?;
    let generator = GitReviewGenerator::new(remote, branch);

    if commit {
        generator.regenerate(&repo)?;
        output::success(&format!("Committed {GITREVIEW_FILE} for {remote}/{branch}"));
    } else {
        generator.write(&repo)?;
        output::success(&format!("Wrote {GITREVIEW_FILE} for {remote}/{branch}"));
    }
    Ok(())
}
