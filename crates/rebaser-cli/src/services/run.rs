//! Run service: the DLRN pre-processing pipeline.
//!
//! Given a repository and a package index, wires the remote, resolves the
//! patches branch and hands the rebase to [`Rebaser`].

use anyhow::{Context, Result};
use log::{info, warn};
use rebaser_core::branch::{create_patches_branch, get_patches_branch};
use rebaser_core::rebase::Backoff;
use rebaser_core::{
    Config, DlrnEnv, PackageIndex, RebaseJob, RebaseOutcome, Rebaser, release_from_branch_name,
};
use rebaser_git::GitOps;

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Distroinfo lists no patches repository for the package.
    NoPatchesRepo,
    /// No patches branch and creation is disabled.
    BranchMissing,
    /// The patches branch was created from the upstream commit.
    BranchCreated { branch: String },
    /// The rebase ran to completion.
    Rebased {
        branch: String,
        tag: String,
        outcome: RebaseOutcome,
    },
}

/// Service for the run pipeline with trait-based dependencies.
pub struct RunService<'a, G: GitOps, P: PackageIndex> {
    repo: &'a G,
    packages: &'a P,
    backoff: Option<Box<dyn Backoff + 'a>>,
}

impl<'a, G: GitOps, P: PackageIndex> RunService<'a, G, P> {
    /// Create a new run service.
    #[must_use]
    pub const fn new(repo: &'a G, packages: &'a P) -> Self {
        Self {
            repo,
            packages,
            backoff: None,
        }
    }

    /// Replace the retry back-off.
    #[must_use]
    #[allow(dead_code)] // Used by tests
    pub fn with_backoff(mut self, backoff: impl Backoff + 'a) -> Self {
        self.backoff = Some(Box::new(backoff));
        self
    }

    /// Run the pipeline for `env.package_name`.
    ///
    /// `timestamp` names the safety tag.
    pub fn run(&self, env: &DlrnEnv, config: &Config, timestamp: &str) -> Result<RunOutcome> {
        let remote = &config.remote_name;

        let Some(patches_repo) = self
            .packages
            .patches_repo(&env.package_name, &config.patches_repo_key)?
        else {
            return Ok(RunOutcome::NoPatchesRepo);
        };

        self.ensure_remote(remote, &patches_repo)?;
        self.repo.fetch_all().context("Could not fetch remotes")?;

        let branch = get_patches_branch(
            self.repo,
            remote,
            env.patches_branch.as_deref(),
            &config.dlrn_projects_ini,
            &config.dlrn_driver,
        )?;

        // Not every project has a -patches branch for every release
        let Some(branch) = branch else {
            return self.handle_missing_branch(env, config);
        };

        let job = RebaseJob::new(&branch, &env.commit, remote, timestamp)
            .with_release(release_from_branch_name(&branch))
            .with_dev_mode(config.dev_mode)
            .with_max_retries(config.max_retries);

        let rebaser = Rebaser::new(self.repo, job);
        let rebaser = match &self.backoff {
            Some(backoff) => rebaser.with_backoff(backoff.as_ref()),
            None => rebaser,
        };
        let tag = rebaser.tag_name().to_string();
        let outcome = rebaser.rebase_and_update_remote()?;

        Ok(RunOutcome::Rebased {
            branch,
            tag,
            outcome,
        })
    }

    fn ensure_remote(&self, remote: &str, url: &str) -> Result<()> {
        if self.repo.remote_names()?.iter().any(|name| name == remote) {
            return Ok(());
        }
        info!("Adding remote {remote} ({url})");
        self.repo
            .add_remote(remote, url)
            .with_context(|| format!("Could not add remote {remote} ({url})"))
    }

    /// The branch is created at the upstream commit, so there is nothing to
    /// rebase afterwards.
    fn handle_missing_branch(&self, env: &DlrnEnv, config: &Config) -> Result<RunOutcome> {
        if !config.create_patches_branch {
            warn!("Patches branch does not exist, not creating it");
            return Ok(RunOutcome::BranchMissing);
        }

        warn!("Patches branch does not exist, creating it");
        let branch = env
            .patches_branch
            .clone()
            .ok_or(rebaser_core::Error::NoBranchToCreate)?;
        create_patches_branch(
            self.repo,
            &branch,
            &env.commit,
            &config.remote_name,
            config.dev_mode,
        )
        .context("Could not create -patches branch")?;

        Ok(RunOutcome::BranchCreated { branch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_mocks::{MockGitOps, MockPackageIndex, RecordingBackoff};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const PATCHES_URL: &str = "ssh://review.example.com:29418/rhos/nova";

    fn env(patches_branch: Option<&str>) -> DlrnEnv {
        DlrnEnv {
            user: "dlrn".into(),
            local_repo: PathBuf::from("/home/dlrn/data/nova"),
            commit: "61a18a2a".into(),
            distroinfo_repo: "/home/dlrn/di/rdo.yml".into(),
            package_name: "openstack-nova".into(),
            patches_branch: patches_branch.map(String::from),
        }
    }

    fn config() -> Config {
        let mut config = Config::defaults("dlrn");
        config.remote_name = "patches".into();
        config.dlrn_projects_ini = PathBuf::from("/nonexistent/projects.ini");
        config
    }

    fn index() -> MockPackageIndex {
        MockPackageIndex::new().with_repo("openstack-nova", "patches", PATCHES_URL)
    }

    #[test]
    fn test_no_patches_repo_stops_early() {
        let repo = MockGitOps::new();
        let packages = MockPackageIndex::new().with_package("openstack-nova");

        let outcome = RunService::new(&repo, &packages)
            .run(&env(None), &config(), "20240102030405")
            .unwrap();

        assert_eq!(outcome, RunOutcome::NoPatchesRepo);
        assert!(repo.calls.borrow().is_empty());
    }

    #[test]
    fn test_unknown_package_is_an_error() {
        let repo = MockGitOps::new();
        let packages = MockPackageIndex::new();

        let result = RunService::new(&repo, &packages).run(&env(None), &config(), "0");
        assert!(result.is_err());
    }

    #[test]
    fn test_adds_missing_remote_then_fetches() {
        let repo = MockGitOps::new().with_remote_branch("patches", "rhos-17.1-patches");
        let packages = index();

        let outcome = RunService::new(&repo, &packages)
            .run(&env(Some("rhos-17.1-patches")), &config(), "20240102030405")
            .unwrap();

        let calls = repo.calls.borrow();
        assert_eq!(calls[0], format!("add-remote patches {PATCHES_URL}"));
        assert_eq!(calls[1], "fetch-all");
        assert!(matches!(outcome, RunOutcome::Rebased { .. }));
    }

    #[test]
    fn test_existing_remote_is_reused() {
        let repo = MockGitOps::new()
            .with_remote("patches", PATCHES_URL)
            .with_remote_branch("patches", "rhos-17.1-patches");
        let packages = index();

        RunService::new(&repo, &packages)
            .run(&env(Some("rhos-17.1-patches")), &config(), "0")
            .unwrap();

        assert_eq!(repo.count("add-remote"), 0);
    }

    #[test]
    fn test_add_remote_failure_is_an_error() {
        let repo = MockGitOps::new().with_failure("add-remote");
        let packages = index();

        let err = RunService::new(&repo, &packages)
            .run(&env(None), &config(), "0")
            .unwrap_err();

        assert!(err.to_string().contains("Could not add remote patches"));
        assert_eq!(repo.count("fetch-all"), 0);
    }

    #[test]
    fn test_rebase_job_from_branch_and_config() {
        let repo = MockGitOps::new().with_remote_branch("patches", "rhos-13.0-octavia-patches");
        let packages = index();
        let mut config = config();
        config.dev_mode = false;

        let outcome = RunService::new(&repo, &packages)
            .run(&env(Some("rhos-13.0-octavia-patches")), &config, "20240102030405")
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Rebased {
                branch: "rhos-13.0-octavia-patches".into(),
                tag: "private-rebaser-13.0-octavia-20240102030405-previous".into(),
                outcome: RebaseOutcome::Pushed {
                    attempts: 1,
                    commits: 1,
                },
            }
        );
        assert_eq!(repo.args_of("rebase"), vec!["rhos-13.0-octavia-patches 61a18a2a"]);
        // Tag first, then the branch, both for real
        let pushes = repo.pushes.borrow();
        assert_eq!(pushes.len(), 2);
        assert!(pushes.iter().all(|(_, _, options)| !options.dry_run));
    }

    #[test]
    fn test_config_retries_reach_the_rebaser() {
        let repo = MockGitOps::new()
            .with_remote_branch("patches", "rhos-17.1-patches")
            .with_remote_moving(10);
        let packages = index();
        let backoff = RecordingBackoff::default();
        let mut config = config();
        config.max_retries = 1;

        let outcome = RunService::new(&repo, &packages)
            .with_backoff(&backoff)
            .run(&env(Some("rhos-17.1-patches")), &config, "0")
            .unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Rebased {
                outcome: RebaseOutcome::RetriesExhausted { attempts: 2 },
                ..
            }
        ));
        assert_eq!(backoff.waits.borrow().len(), 1);
        assert_eq!(repo.count("push"), 0);
    }

    #[test]
    fn test_missing_branch_not_created_by_default() {
        let repo = MockGitOps::new();
        let packages = index();

        let outcome = RunService::new(&repo, &packages)
            .run(&env(Some("rhos-17.1-patches")), &config(), "0")
            .unwrap();

        assert_eq!(outcome, RunOutcome::BranchMissing);
        assert_eq!(repo.count("create-branch"), 0);
        assert_eq!(repo.count("rebase"), 0);
    }

    #[test]
    fn test_missing_branch_created_when_enabled() {
        let temp = TempDir::new().unwrap();
        let repo = MockGitOps::new().with_workdir(temp.path());
        let packages = index();
        let mut config = config();
        config.create_patches_branch = true;

        let outcome = RunService::new(&repo, &packages)
            .run(&env(Some("rhos-17.1-patches")), &config, "0")
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::BranchCreated {
                branch: "rhos-17.1-patches".into()
            }
        );
        assert!(fs::read_to_string(temp.path().join(".gitreview")).is_ok());
        // Created at the upstream commit, so no rebase follows
        assert_eq!(repo.count("rebase"), 0);
        assert_eq!(repo.args_of("create-branch"), vec!["rhos-17.1-patches 61a18a2a"]);
    }

    #[test]
    fn test_branch_creation_needs_patches_branch() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("projects.ini"),
            "[downstream_driver]\ndownstream_distro_branch=rhos-17.1-rhel-9\n",
        )
        .unwrap();
        let repo = MockGitOps::new();
        let packages = index();
        let mut config = config();
        config.create_patches_branch = true;
        config.dlrn_projects_ini = temp.path().join("projects.ini");

        let err = RunService::new(&repo, &packages)
            .run(&env(None), &config, "0")
            .unwrap_err();

        assert!(err.to_string().contains("PATCHES_BRANCH"));
    }

    #[test]
    fn test_guessed_branch_is_rebased() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("projects.ini"),
            "[downstream_driver]\ndownstream_distro_branch=rhos-17.1-rhel-9\n",
        )
        .unwrap();
        let repo = MockGitOps::new().with_remote_branch("patches", "rhos-17.1-patches");
        let packages = index();
        let mut config = config();
        config.dlrn_projects_ini = temp.path().join("projects.ini");

        let outcome = RunService::new(&repo, &packages)
            .run(&env(None), &config, "0")
            .unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Rebased { ref branch, .. } if branch == "rhos-17.1-patches"
        ));
    }
}
