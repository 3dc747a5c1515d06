//! Variables DLRN exports to its custom pre-processing scripts.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment of a DLRN pre-processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlrnEnv {
    /// `DLRN_USER`: system user DLRN runs as.
    pub user: String,
    /// `DLRN_SOURCEDIR`: checkout of the package's source repository.
    pub local_repo: PathBuf,
    /// `DLRN_SOURCE_COMMIT`: upstream commit being built.
    pub commit: String,
    /// `DLRN_DISTROINFO_REPO`: path or URL of the distroinfo file.
    pub distroinfo_repo: String,
    /// `DLRN_PACKAGE_NAME`: package being built.
    pub package_name: String,
    /// `PATCHES_BRANCH`: explicit patches branch, bypassing the guess.
    pub patches_branch: Option<String>,
}

impl DlrnEnv {
    /// Read the variables from the process environment.
    ///
    /// # Errors
    /// Returns `MissingEnv` naming the first required variable that is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the variables through `lookup`.
    ///
    /// # Errors
    /// Returns `MissingEnv` naming the first required variable that is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| Error::MissingEnv(key.into()));

        Ok(Self {
            user: required("DLRN_USER")?,
            local_repo: PathBuf::from(required("DLRN_SOURCEDIR")?),
            commit: required("DLRN_SOURCE_COMMIT")?,
            distroinfo_repo: required("DLRN_DISTROINFO_REPO")?,
            package_name: required("DLRN_PACKAGE_NAME")?,
            patches_branch: lookup("PATCHES_BRANCH").filter(|b| !b.is_empty()),
        })
    }
}
