//! Package metadata lookup from distroinfo (rdoinfo-style) YAML.
//!
//! The info file lists `packages`, each a mapping of string keys. A package
//! may name a template from `package-configs` in its `conf` key; template
//! values act as defaults and `%(key)s` placeholders are filled from the
//! package's own values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rebaser_git::Repository;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Maps a package name to the repository carrying its patches branch.
pub trait PackageIndex {
    /// URL stored under `key` for `package`, or `None` if the package has
    /// no such key.
    ///
    /// # Errors
    /// Returns `PackageNotFound` if the package isn't listed.
    fn patches_repo(&self, package: &str, key: &str) -> Result<Option<String>>;
}

/// Split a distroinfo path into `(file, repo, is_remote)`.
///
/// The repo part is remote when it is an `http(s)` URL.
#[must_use]
pub fn parse_distro_info_path(path: &str) -> (String, String, bool) {
    let path = path.trim();
    let (repo, file) = path.rsplit_once('/').unwrap_or(("", path));
    (file.to_string(), repo.to_string(), repo.starts_with("http"))
}

#[derive(Debug, Deserialize)]
struct InfoFile {
    #[serde(default)]
    packages: Vec<BTreeMap<String, Value>>,
    #[serde(default, rename = "package-configs", alias = "package_configs")]
    package_configs: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Resolved package metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistroInfo {
    packages: Vec<BTreeMap<String, String>>,
}

impl DistroInfo {
    /// Load distroinfo from a local path or an `http(s)` git repository URL
    /// followed by the info file name.
    ///
    /// # Errors
    /// Returns error if the repository can't be cloned or the file parsed.
    pub fn load(distroinfo_repo: &str) -> Result<Self> {
        let (file, repo, remote) = parse_distro_info_path(distroinfo_repo);
        let dir = if remote {
            clone_info_repo(&repo)?
        } else {
            PathBuf::from(repo)
        };
        Self::load_file(&dir.join(file))
    }

    /// Load a local info file.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            Error::Yaml(err) => Error::DistroInfoParse {
                file: path.to_path_buf(),
                message: err.to_string(),
            },
            other => other,
        })
    }

    /// Parse info file contents.
    ///
    /// # Errors
    /// Returns error on invalid YAML or unknown `conf` templates.
    pub fn parse(content: &str) -> Result<Self> {
        let info: InfoFile = serde_yaml::from_str(content)?;

        let packages = info
            .packages
            .iter()
            .map(|raw| resolve_package(raw, &info.package_configs))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { packages })
    }

    /// Look a package up by `name`.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.packages
            .iter()
            .find(|pkg| pkg.get("name").is_some_and(|n| n == name))
    }
}

impl PackageIndex for DistroInfo {
    fn patches_repo(&self, package: &str, key: &str) -> Result<Option<String>> {
        let pkg = self
            .package(package)
            .ok_or_else(|| Error::PackageNotFound(package.into()))?;

        let repo = pkg.get(key).filter(|url| !url.is_empty()).cloned();
        if repo.is_none() {
            log::warn!("No {key} repo listed for package {package}");
        }
        Ok(repo)
    }
}

fn resolve_package(
    raw: &BTreeMap<String, Value>,
    configs: &BTreeMap<String, BTreeMap<String, Value>>,
) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();

    if let Some(conf) = raw.get("conf").and_then(Value::as_str) {
        let template = configs.get(conf).ok_or_else(|| Error::DistroInfoParse {
            file: PathBuf::new(),
            message: format!("unknown package config '{conf}'"),
        })?;
        values.extend(scalars(template));
    }
    values.extend(scalars(raw));

    let context = values.clone();
    for value in values.values_mut() {
        *value = interpolate(value, &context);
    }
    Ok(values)
}

/// String-convertible entries of a YAML mapping; lists and maps are dropped.
fn scalars(map: &BTreeMap<String, Value>) -> impl Iterator<Item = (String, String)> + '_ {
    map.iter().filter_map(|(key, value)| {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        Some((key.clone(), value))
    })
}

/// Replace `%(key)s` with `context[key]`; unknown keys are left as-is.
fn interpolate(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find(")s") {
            Some(end) => {
                let key = &after[..end];
                match context.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Shallow-clone a remote info repository into the temp directory,
/// replacing any earlier clone.
fn clone_info_repo(url: &str) -> Result<PathBuf> {
    let slug: String = url
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let dest = std::env::temp_dir()
        .join("patch-rebaser-distroinfo")
        .join(slug);

    if dest.exists() {
        fs::remove_dir_all(&dest)?;
    }
    log::debug!("Cloning distroinfo repository {url}");
    Repository::clone_shallow(url, &dest)?;
    Ok(dest)
}
