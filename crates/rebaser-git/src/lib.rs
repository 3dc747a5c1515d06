//! # rebaser-git
//!
//! Git operations abstraction layer for patch-rebaser, built on git2-rs.
//! Ref bookkeeping (branches, tags, commit comparison) goes through libgit2;
//! network and rebase operations shell out to the `git` executable so that
//! credentials, hooks and `rebase --skip` behave exactly as on the command line.

mod command;
mod error;
mod repository;
mod traits;

pub use command::{GitOutput, Identity};
pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::Repository;
pub use traits::{GitOps, PushOptions};
