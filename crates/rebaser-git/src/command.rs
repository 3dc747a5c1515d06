//! Runner for the `git` executable.
//!
//! Network operations and rebases go through the real `git` binary. Output is
//! captured and a non-zero exit becomes an [`Error::CommandFailed`], which
//! callers narrow into more specific variants.

use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// Author and committer identity applied to every git invocation.
///
/// Passed explicitly instead of being exported through the process
/// environment, so two repositories in one process never share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Name used as both author and committer.
    pub name: String,
    /// Email used as both author and committer.
    pub email: String,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn apply(&self, command: &mut Command) {
        command
            .env("GIT_AUTHOR_NAME", &self.name)
            .env("GIT_AUTHOR_EMAIL", &self.email)
            .env("GIT_COMMITTER_NAME", &self.name)
            .env("GIT_COMMITTER_EMAIL", &self.email);
    }
}

/// Captured output of a successful git command.
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    /// Standard output (trimmed).
    pub stdout: String,
    /// Standard error (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Both streams joined, as git prints conflict details on either.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Run `git <args>` in `cwd`.
///
/// # Errors
/// Returns [`Error::Io`] if git cannot be executed and
/// [`Error::CommandFailed`] on a non-zero exit status.
pub(crate) fn run_git(cwd: &Path, identity: Option<&Identity>, args: &[&str]) -> Result<GitOutput> {
    let mut command = Command::new("git");
    command.current_dir(cwd).args(args);
    // Never wait on an editor during rebase --skip or commit.
    command.env("GIT_EDITOR", "true");
    if let Some(identity) = identity {
        identity.apply(&mut command);
    }

    log::debug!("Running git {}", args.join(" "));
    let output = command.output()?;
    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        Err(Error::CommandFailed {
            command: args.first().copied().unwrap_or_default().to_string(),
            detail: git_output.combined(),
        })
    }
}
