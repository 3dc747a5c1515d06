//! Error types for rebaser-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rebaser-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file does not exist.
    #[error("configuration file {0} not found")]
    ConfigNotFound(PathBuf),

    /// A configuration value has the wrong shape.
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidConfigValue {
        /// Option name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// A required INI section or option is missing.
    #[error("no option '{option}' in section '{section}' of {file}")]
    MissingOption {
        /// File that was read.
        file: PathBuf,
        /// Section that was searched.
        section: String,
        /// Missing option.
        option: String,
    },

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// Remote URL doesn't look like `scheme://host[:port]/project`.
    #[error("cannot parse gerrit remote url '{0}'")]
    InvalidRemoteUrl(String),

    /// Package not listed in the distroinfo data.
    #[error("package '{0}' not found in distroinfo")]
    PackageNotFound(String),

    /// Distroinfo file failed to parse or has the wrong layout.
    #[error("failed to parse {file}: {message}")]
    DistroInfoParse { file: PathBuf, message: String },

    /// No `PATCHES_BRANCH` to create.
    #[error("no PATCHES_BRANCH env var found, cannot create branch")]
    NoBranchToCreate,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// INI parsing error.
    #[error("ini error: {0}")]
    Ini(#[from] ini::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] rebaser_git::Error),
}
