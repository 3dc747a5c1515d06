//! Mock implementations for testing services.
//!
//! Git and back-off mocks come from rebaser-core; the package index mock
//! lives here since only the service layer consumes `PackageIndex`.

use std::collections::{BTreeMap, HashMap};

use rebaser_core::{Error as CoreError, PackageIndex, Result as CoreResult};

pub use rebaser_core::test_mocks::{MockGitOps, RecordingBackoff};

/// In-memory package index keyed by package name.
#[derive(Default)]
pub struct MockPackageIndex {
    packages: HashMap<String, BTreeMap<String, String>>,
}

impl MockPackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Package with no repository keys.
    pub fn with_package(mut self, name: &str) -> Self {
        self.packages.entry(name.to_string()).or_default();
        self
    }

    pub fn with_repo(mut self, name: &str, key: &str, url: &str) -> Self {
        self.packages
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), url.to_string());
        self
    }
}

impl PackageIndex for MockPackageIndex {
    fn patches_repo(&self, package: &str, key: &str) -> CoreResult<Option<String>> {
        let pkg = self
            .packages
            .get(package)
            .ok_or_else(|| CoreError::PackageNotFound(package.into()))?;
        Ok(pkg.get(key).cloned())
    }
}
