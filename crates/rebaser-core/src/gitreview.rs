//! `.gitreview` generation.
//!
//! Patches branches carry a `.gitreview` pointing at the internal Gerrit
//! instead of the upstream one. Upstream edits to that file conflict with it
//! on every rebase, so the rebaser drops the conflicting patch and writes the
//! file again from the remote's push URL.

use std::fs;
use std::path::Path;

use rebaser_git::GitOps;

use crate::error::{Error, Result};
use crate::rebase::MetadataGenerator;

/// File name, relative to the repository root.
pub const GITREVIEW_FILE: &str = ".gitreview";

/// Port used when the remote URL doesn't specify one.
pub const DEFAULT_GERRIT_PORT: &str = "29418";

/// Message of the commit that (re)introduces the file.
pub const GITREVIEW_COMMIT_MESSAGE: &str = "RHOS:  use internal gerrit - DROP-IN-RPM\n\n\
     Change-Id: I400187d0e03127743aad09d859988991e965ff7e";

/// Gerrit coordinates parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerritRemote {
    pub host: String,
    pub port: String,
    /// Project path without a trailing `.git`; may contain `/`.
    pub project: String,
}

/// Parse `scheme://host[:port]/project[/...]`.
///
/// # Errors
/// Returns `InvalidRemoteUrl` if the URL has no `scheme://host` part.
pub fn parse_gerrit_remote_url(url: &str) -> Result<GerritRemote> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 3 || !parts[0].ends_with(':') || !parts[1].is_empty() || parts[2].is_empty()
    {
        return Err(Error::InvalidRemoteUrl(url.into()));
    }

    let (host, port) = match parts[2].split_once(':') {
        Some((host, port)) if !port.is_empty() => (host, port),
        Some((host, _)) => (host, DEFAULT_GERRIT_PORT),
        None => (parts[2], DEFAULT_GERRIT_PORT),
    };
    // Strip any user@ prefix; gerrit host names never contain '@'.
    let host = host.rsplit('@').next().unwrap_or(host);

    let project = parts[3..].join("/");
    let project = project.strip_suffix(".git").unwrap_or(&project).to_string();

    Ok(GerritRemote {
        host: host.to_string(),
        port: port.to_string(),
        project,
    })
}

/// Contents of a `.gitreview` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitReview {
    pub remote: GerritRemote,
    /// Value of `defaultbranch`.
    pub branch: String,
    /// Value of `defaultremote`.
    pub remote_name: String,
}

impl GitReview {
    /// Render the file.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[gerrit]\n\
             host={}\n\
             port={}\n\
             project={}.git\n\
             defaultbranch={}\n\
             defaultremote={}\n\
             defaultrebase=1\n",
            self.remote.host, self.remote.port, self.remote.project, self.branch, self.remote_name
        )
    }

    /// Write the file into `dir`, replacing any existing one.
    ///
    /// # Errors
    /// Returns error if the file can't be written.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join(GITREVIEW_FILE), self.render())?;
        Ok(())
    }
}

/// Rewrites and commits `.gitreview` for one remote/branch pair.
#[derive(Debug, Clone)]
pub struct GitReviewGenerator {
    remote: String,
    branch: String,
}

impl GitReviewGenerator {
    #[must_use]
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// Build the file contents from the remote's URL.
    ///
    /// # Errors
    /// Returns error if the remote is missing or its URL can't be parsed.
    pub fn gitreview(&self, repo: &dyn GitOps) -> Result<GitReview> {
        let url = repo.remote_url(&self.remote)?;
        Ok(GitReview {
            remote: parse_gerrit_remote_url(&url)?,
            branch: self.branch.clone(),
            remote_name: self.remote.clone(),
        })
    }

    /// Write the file without committing it.
    ///
    /// # Errors
    /// Returns error if the repository is bare or the write fails.
    pub fn write(&self, repo: &dyn GitOps) -> Result<()> {
        let workdir = repo.workdir().ok_or(rebaser_git::Error::NotARepository)?;
        self.gitreview(repo)?.write(workdir)
    }
}

impl MetadataGenerator for GitReviewGenerator {
    fn file_name(&self) -> &str {
        GITREVIEW_FILE
    }

    fn regenerate(&self, repo: &dyn GitOps) -> Result<()> {
        self.write(repo)?;
        repo.commit_paths(&[GITREVIEW_FILE], GITREVIEW_COMMIT_MESSAGE)?;
        log::info!("Regenerated {GITREVIEW_FILE} for {}/{}", self.remote, self.branch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_with_port() {
        let remote = parse_gerrit_remote_url("ssh://review.example.com:22/openstack/nova").unwrap();
        assert_eq!(remote.host, "review.example.com");
        assert_eq!(remote.port, "22");
        assert_eq!(remote.project, "openstack/nova");
    }

    #[test]
    fn test_parse_url_default_port() {
        let remote = parse_gerrit_remote_url("https://review.example.com/nova").unwrap();
        assert_eq!(remote.port, DEFAULT_GERRIT_PORT);
        assert_eq!(remote.project, "nova");
    }

    #[test]
    fn test_parse_url_strips_user_and_git_suffix() {
        let remote =
            parse_gerrit_remote_url("ssh://bot@review.example.com:29418/rhos/openstack/nova.git")
                .unwrap();
        assert_eq!(remote.host, "review.example.com");
        assert_eq!(remote.project, "rhos/openstack/nova");
    }

    #[test]
    fn test_parse_url_rejects_paths() {
        assert!(parse_gerrit_remote_url("/repos/patches_repo").is_err());
        assert!(parse_gerrit_remote_url("git@example.com:nova.git").is_err());
    }

    #[test]
    fn test_render() {
        let review = GitReview {
            remote: GerritRemote {
                host: "review.example.com".into(),
                port: "29418".into(),
                project: "openstack/nova".into(),
            },
            branch: "rhos-17.1-patches".into(),
            remote_name: "patches".into(),
        };

        assert_eq!(
            review.render(),
            "[gerrit]\n\
             host=review.example.com\n\
             port=29418\n\
             project=openstack/nova.git\n\
             defaultbranch=rhos-17.1-patches\n\
             defaultremote=patches\n\
             defaultrebase=1\n"
        );
    }

    #[test]
    fn test_commit_message_has_change_id_trailer() {
        let (subject, trailer) = GITREVIEW_COMMIT_MESSAGE.split_once("\n\n").unwrap();
        assert_eq!(subject, "RHOS:  use internal gerrit - DROP-IN-RPM");
        assert!(trailer.starts_with("Change-Id: I"));
    }
}
