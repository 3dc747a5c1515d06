//! Command definitions and argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

pub mod gitreview;
pub mod guess_branch;
pub mod run;

/// Keep downstream -patches branches rebased on top of upstream commits.
#[derive(Debug, Parser)]
#[command(name = "patch-rebaser", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default `env_logger` filter for the chosen verbosity.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebase the package's patches branch, as a DLRN pre-processing hook.
    ///
    /// Reads DLRN_USER, DLRN_SOURCEDIR, DLRN_SOURCE_COMMIT,
    /// DLRN_DISTROINFO_REPO, DLRN_PACKAGE_NAME and optionally PATCHES_BRANCH.
    Run {
        /// Config file (default: patch_rebaser.ini next to the executable).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Force dry-run pushes regardless of the config.
        #[arg(long, conflicts_with = "no_dev_mode")]
        dev_mode: bool,

        /// Force real pushes regardless of the config.
        #[arg(long)]
        no_dev_mode: bool,
    },

    /// Print the patches branch matching a distgit branch.
    GuessBranch {
        /// Distgit branch, e.g. rhos-17.1-rhel-9.
        distgit_branch: String,

        /// Remote hosting the patches branches.
        #[arg(long, default_value = "patches")]
        remote: String,

        /// Repository to inspect.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },

    /// Regenerate .gitreview for a remote and branch.
    Gitreview {
        /// Remote whose URL points at Gerrit.
        #[arg(long)]
        remote: String,

        /// Branch written as defaultbranch.
        #[arg(long)]
        branch: String,

        /// Repository to write into.
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Write the file without committing it.
        #[arg(long)]
        no_commit: bool,
    },
}

impl Commands {
    /// Dev mode override from `--dev-mode` / `--no-dev-mode`.
    #[must_use]
    pub const fn dev_mode_override(dev_mode: bool, no_dev_mode: bool) -> Option<bool> {
        match (dev_mode, no_dev_mode) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter() {
        let cli = Cli::parse_from(["patch-rebaser", "run"]);
        assert_eq!(cli.log_filter(), "info");

        let cli = Cli::parse_from(["patch-rebaser", "-vv", "run"]);
        assert_eq!(cli.log_filter(), "trace");

        let cli = Cli::parse_from(["patch-rebaser", "run", "-q"]);
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_dev_mode_flags() {
        let cli = Cli::parse_from(["patch-rebaser", "run", "--no-dev-mode"]);
        let Commands::Run {
            dev_mode,
            no_dev_mode,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(Commands::dev_mode_override(dev_mode, no_dev_mode), Some(false));
        assert_eq!(Commands::dev_mode_override(false, false), None);

        assert!(Cli::try_parse_from(["patch-rebaser", "run", "--dev-mode", "--no-dev-mode"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["patch-rebaser", "-v", "-q", "run"]).is_err());
    }
}
