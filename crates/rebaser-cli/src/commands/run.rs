//! `patch-rebaser run` command - DLRN pre-processing hook.
//!
//! Loads the DLRN environment and `patch_rebaser.ini`, then rebases the
//! package's patches branch onto the commit DLRN is about to build.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use rebaser_core::{Config, DistroInfo, DlrnEnv};
use rebaser_git::Repository;

use crate::output;
use crate::services::{RunOutcome, RunService};

/// Format of the timestamp embedded in safety tags.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Run the rebase pipeline.
pub fn run(config_path: Option<&Path>, dev_mode: Option<bool>) -> Result<()> {
    let env = DlrnEnv::from_env()?;

    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path, &env.user)
        .with_context(|| format!("Could not load {}", config_path.display()))?;
    if let Some(dev_mode) = dev_mode {
        config.dev_mode = dev_mode;
    }

    if !config.should_process(&env.package_name) {
        info!(
            "Skipping {}, as package not in list of packages_to_process",
            env.package_name
        );
        return Ok(());
    }

    let repo = Repository::open(&env.local_repo)
        .with_context(|| format!("Cannot open {}", env.local_repo.display()))?
        .with_identity(config.identity());

    let distroinfo = DistroInfo::load(&env.distroinfo_repo)
        .with_context(|| format!("Cannot load distroinfo from {}", env.distroinfo_repo))?;

    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let outcome = RunService::new(&repo, &distroinfo).run(&env, &config, &timestamp)?;

    match outcome {
        RunOutcome::NoPatchesRepo => {
            output::info(&format!("No patches repository for {}", env.package_name));
        }
        RunOutcome::BranchMissing => {
            output::warn("Patches branch does not exist, nothing to rebase");
        }
        RunOutcome::BranchCreated { branch } => {
            output::success(&format!("Created {branch} at {}", env.commit));
        }
        RunOutcome::Rebased {
            branch,
            tag,
            outcome,
        } => {
            output::success(&format!("Rebased {branch} onto {}", env.commit));
            output::detail(&format!("  {}", output::outcome_summary(&outcome, config.dev_mode)));
            output::detail(&format!("  Safety tag: {tag}"));
        }
    }

    Ok(())
}
