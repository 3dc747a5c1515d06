//! Patches branch resolution.
//!
//! Distgit branches look like `rhos-17.1-rhel-9` or `rhos-18.0-trunk-rhel-9`;
//! the matching patches branch is some prefix of that name followed by
//! `-patches` (or `-trunk-patches` for trunk builds). The prefix is found by
//! asking the remote, longest candidate first.

use std::path::Path;

use ini::Ini;
use log::{debug, warn};
use rebaser_git::{GitOps, PushOptions};

use crate::config::lookup;
use crate::error::{Error, Result};
use crate::gitreview::GitReviewGenerator;
use crate::rebase::MetadataGenerator;

/// Guess the patches branch for `distgit_branch` on `remote`.
///
/// Returns `None` when no candidate exists.
pub fn find_patches_branch(
    repo: &dyn GitOps,
    remote: &str,
    distgit_branch: &str,
) -> Option<String> {
    let suffix = if distgit_branch.contains("trunk") {
        "trunk-patches"
    } else {
        "patches"
    };

    let mut parts: Vec<&str> = distgit_branch.split('-').collect();
    while !parts.is_empty() {
        let branch = format!("{}-{suffix}", parts.join("-"));
        debug!("Checking if branch {branch} exists...");
        if repo.remote_branch_exists(remote, &branch) {
            return Some(branch);
        }
        parts.pop();
    }
    None
}

/// Read `downstream_distro_branch` from the `[driver]` section of DLRN's
/// `projects.ini`, falling back to `[DEFAULT]`.
///
/// # Errors
/// Returns error if the file can't be read or lacks the option.
pub fn downstream_distgit_branch(projects_ini: &Path, driver: &str) -> Result<String> {
    let ini = Ini::load_from_file(projects_ini)?;
    lookup(&ini, driver, "downstream_distro_branch")
        .map(String::from)
        .ok_or_else(|| Error::MissingOption {
            file: projects_ini.to_path_buf(),
            section: driver.into(),
            option: "downstream_distro_branch".into(),
        })
}

/// Determine the patches branch for this run.
///
/// An explicit `PATCHES_BRANCH` wins, but only if it exists on the remote.
/// Otherwise the branch is guessed from DLRN's downstream distgit branch.
///
/// # Errors
/// Returns error if `projects.ini` has to be read and can't be.
pub fn get_patches_branch(
    repo: &dyn GitOps,
    remote: &str,
    explicit: Option<&str>,
    projects_ini: &Path,
    driver: &str,
) -> Result<Option<String>> {
    if let Some(branch) = explicit {
        debug!("Checking if branch {branch} exists...");
        return Ok(repo
            .remote_branch_exists(remote, branch)
            .then(|| branch.to_string()));
    }

    let distgit_branch = downstream_distgit_branch(projects_ini, driver)?;
    warn!("No PATCHES_BRANCH env var found, trying to guess it");
    Ok(find_patches_branch(repo, remote, &distgit_branch))
}

/// Extract the release label used in safety tag names.
///
/// `rhos-13.0-patches` gives `13.0`; `rhos-13.0-octavia-trunk-patches`
/// gives `13.0-octavia`. Names with fewer than three segments give `Unknown`.
#[must_use]
pub fn release_from_branch_name(branch: &str) -> String {
    let parts: Vec<&str> = branch.split('-').collect();
    match parts.as_slice() {
        [_, release, post, ..] if *post != "trunk" && *post != "patches" => {
            format!("{release}-{post}")
        }
        [_, release, _, ..] => (*release).to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Create `branch` at `commit`, seed it with `.gitreview` and push it.
///
/// In dev mode the push is a dry run.
///
/// # Errors
/// Returns error if the branch exists or any git operation fails.
pub fn create_patches_branch(
    repo: &dyn GitOps,
    branch: &str,
    commit: &str,
    remote: &str,
    dev_mode: bool,
) -> Result<()> {
    repo.create_branch_at(branch, commit)?;
    repo.checkout(branch)?;
    GitReviewGenerator::new(remote, branch).regenerate(repo)?;

    if dev_mode {
        warn!("Dev mode: executing push commands in dry-run mode");
    } else {
        warn!("Pushing {branch} to {remote}");
    }
    repo.push(remote, branch, PushOptions::plain(dev_mode))?;
    Ok(())
}
