//! # rebaser-core
//!
//! Core library for patch-rebaser: keeps a downstream `-patches` branch
//! rebased on top of incoming upstream commits and publishes the result,
//! retrying when the remote branch moves underneath the rebase.
//!
//! - [`branch`] guesses which patches branch belongs to a distgit branch.
//! - [`rebase`] owns the fetch / tag / rebase / compare / push protocol.
//! - [`gitreview`] regenerates the `.gitreview` file the rebase may drop.
//! - [`config`], [`env`] and [`distroinfo`] load the inputs for a run.

pub mod branch;
pub mod config;
pub mod distroinfo;
pub mod env;
pub mod error;
pub mod gitreview;
pub mod rebase;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

pub use branch::{find_patches_branch, release_from_branch_name};
pub use config::Config;
pub use distroinfo::{DistroInfo, PackageIndex};
pub use env::DlrnEnv;
pub use error::{Error, Result};
pub use gitreview::{GitReview, GitReviewGenerator};
pub use rebase::{RebaseJob, RebaseOutcome, Rebaser};
