//! Configuration management for patch-rebaser.
//!
//! Settings come from `patch_rebaser.ini`. Options live in `[DEFAULT]`,
//! except `patches_repo_key` which lives in `[distroinfo]`. Like Python's
//! configparser, every section falls back to `[DEFAULT]`, and options missing
//! from the file fall back to built-in defaults.

use std::path::{Path, PathBuf};

use ini::Ini;
use rebaser_git::Identity;

use crate::error::{Error, Result};

/// Name of the configuration file looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "patch_rebaser.ini";

const DEFAULT_SECTION: &str = "DEFAULT";
const DISTROINFO_SECTION: &str = "distroinfo";

/// Typed patch-rebaser settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Run every push as a dry run.
    pub dev_mode: bool,
    /// Name of the git remote that hosts the patches branch.
    pub remote_name: String,
    /// Author/committer name for rebased commits.
    pub git_name: String,
    /// Author/committer email for rebased commits.
    pub git_email: String,
    /// Packages to rebase; empty means every package.
    pub packages_to_process: Vec<String>,
    /// DLRN `projects.ini` holding `downstream_distro_branch`.
    pub dlrn_projects_ini: PathBuf,
    /// Create the patches branch when none exists.
    pub create_patches_branch: bool,
    /// Section of `projects.ini` to read.
    pub dlrn_driver: String,
    /// How many times to retry when the remote moves during a rebase.
    pub max_retries: u32,
    /// Distroinfo key holding the patches repository URL.
    pub patches_repo_key: String,
}

impl Config {
    /// Built-in defaults for a DLRN user.
    #[must_use]
    pub fn defaults(dlrn_user: &str) -> Self {
        Self {
            dev_mode: true,
            remote_name: "remote_name".into(),
            git_name: "Your Name".into(),
            git_email: "you@example.com".into(),
            packages_to_process: Vec::new(),
            dlrn_projects_ini: PathBuf::from(format!(
                "/usr/local/share/dlrn/{dlrn_user}/projects.ini"
            )),
            create_patches_branch: false,
            dlrn_driver: "downstream_driver".into(),
            max_retries: 3,
            patches_repo_key: "patches".into(),
        }
    }

    /// Default config location: `patch_rebaser.ini` beside the running binary.
    ///
    /// # Errors
    /// Returns error if the executable path can't be determined.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()?.canonicalize()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    /// Load config from an INI file.
    ///
    /// # Errors
    /// Returns `ConfigNotFound` if the file is missing, or an error if it
    /// can't be parsed or holds invalid values.
    pub fn load(path: impl AsRef<Path>, dlrn_user: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini, dlrn_user)
    }

    /// Build config from parsed INI data.
    ///
    /// # Errors
    /// Returns `InvalidConfigValue` for malformed booleans or numbers.
    pub fn from_ini(ini: &Ini, dlrn_user: &str) -> Result<Self> {
        let defaults = Self::defaults(dlrn_user);
        let get = |key: &str| lookup(ini, DEFAULT_SECTION, key);

        Ok(Self {
            dev_mode: get("dev_mode")
                .map(|v| parse_bool("dev_mode", v))
                .transpose()?
                .unwrap_or(defaults.dev_mode),
            remote_name: get("remote_name").map_or(defaults.remote_name, String::from),
            git_name: get("git_name").map_or(defaults.git_name, String::from),
            git_email: get("git_email").map_or(defaults.git_email, String::from),
            packages_to_process: get("packages_to_process")
                .map(parse_list)
                .unwrap_or_default(),
            dlrn_projects_ini: get("dlrn_projects_ini")
                .map_or(defaults.dlrn_projects_ini, PathBuf::from),
            create_patches_branch: get("create_patches_branch")
                .map(|v| parse_bool("create_patches_branch", v))
                .transpose()?
                .unwrap_or(defaults.create_patches_branch),
            dlrn_driver: get("dlrn_driver").map_or(defaults.dlrn_driver, String::from),
            max_retries: get("max_retries")
                .map(|v| {
                    v.trim().parse().map_err(|_| Error::InvalidConfigValue {
                        key: "max_retries".into(),
                        value: v.into(),
                    })
                })
                .transpose()?
                .unwrap_or(defaults.max_retries),
            patches_repo_key: lookup(ini, DISTROINFO_SECTION, "patches_repo_key")
                .map_or(defaults.patches_repo_key, String::from),
        })
    }

    /// Whether `package` is selected by `packages_to_process`.
    #[must_use]
    pub fn should_process(&self, package: &str) -> bool {
        self.packages_to_process.is_empty() || self.packages_to_process.iter().any(|p| p == package)
    }

    /// Identity applied to rebased and generated commits.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(&self.git_name, &self.git_email)
    }
}

/// Look `key` up in `section`, falling back to `[DEFAULT]` and then to
/// entries placed before any section header.
pub(crate) fn lookup<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section))
        .and_then(|props| props.get(key))
        .or_else(|| {
            ini.section(Some(DEFAULT_SECTION))
                .and_then(|props| props.get(key))
        })
        .or_else(|| ini.general_section().get(key))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(Error::InvalidConfigValue {
            key: key.into(),
            value: value.into(),
        }),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
