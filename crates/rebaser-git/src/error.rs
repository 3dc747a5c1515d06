//! Error types for rebaser-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Reference (branch, tag or revision) not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Remote not found.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// Remote has no usable URL.
    #[error("remote '{0}' has no URL configured")]
    RemoteWithoutUrl(String),

    /// Rebase stopped; the payload is the combined git output, which names
    /// the conflicting paths.
    #[error("rebase failed: {0}")]
    RebaseFailed(String),

    /// Push failed.
    #[error("push failed: {0}")]
    PushFailed(String),

    /// Fetch failed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Any other git command exited non-zero.
    #[error("git {command} failed: {detail}")]
    CommandFailed {
        /// The git subcommand that was run.
        command: String,
        /// Captured stdout and stderr.
        detail: String,
    },

    /// IO error, including failure to spawn the git executable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Human-readable detail of a failed command, used by conflict classifiers.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::RebaseFailed(detail)
            | Self::PushFailed(detail)
            | Self::FetchFailed(detail)
            | Self::CommandFailed { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
