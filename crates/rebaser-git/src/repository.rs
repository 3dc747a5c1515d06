//! Repository wrapper providing high-level git operations.

use std::fs;
use std::path::Path;

use git2::{BranchType, ObjectType, Oid, RepositoryState, Signature};

use crate::command::{GitOutput, Identity, run_git};
use crate::error::{Error, Result};
use crate::traits::{GitOps, PushOptions};

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
    identity: Option<Identity>,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        Ok(Self {
            inner,
            identity: None,
        })
    }

    /// Shallow-clone `url` into `dest` with the git executable.
    ///
    /// # Errors
    /// Returns error if `dest` can't be created or the clone fails.
    pub fn clone_shallow(url: &str, dest: &Path) -> Result<Self> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let dest_arg = dest.to_string_lossy();
        run_git(parent, None, &["clone", "--depth", "1", url, &dest_arg])?;
        Self::open(dest)
    }

    /// Use `identity` as author and committer for everything this repository
    /// commits or rebases.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Get the configured identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Check if there's a rebase in progress.
    #[must_use]
    pub fn is_rebasing(&self) -> bool {
        matches!(
            self.inner.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
        )
    }

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::RefNotFound("HEAD".into()));
        }

        head.shorthand()
            .map(String::from)
            .ok_or_else(|| Error::RefNotFound("HEAD".into()))
    }

    /// Resolve any revision (branch, remote branch, tag, SHA) to a commit.
    ///
    /// # Errors
    /// Returns `RefNotFound` if the revision doesn't resolve.
    pub fn resolve_commit(&self, rev: &str) -> Result<Oid> {
        let object = self
            .inner
            .revparse_single(rev)
            .map_err(|_| Error::RefNotFound(rev.into()))?;
        Ok(object.peel_to_commit()?.id())
    }

    /// Get the signature for commits: the configured identity, or git config.
    ///
    /// # Errors
    /// Returns error if no identity was set and git config lacks user.name/email.
    pub fn signature(&self) -> Result<Signature<'static>> {
        match &self.identity {
            Some(identity) => Ok(Signature::now(&identity.name, &identity.email)?),
            None => Ok(self.inner.signature()?),
        }
    }

    /// Run a git command in the working directory with this repository's identity.
    ///
    /// # Errors
    /// Returns error if the repository is bare or the command fails.
    pub fn git(&self, args: &[&str]) -> Result<GitOutput> {
        let workdir = self.workdir().ok_or(Error::NotARepository)?;
        run_git(workdir, self.identity.as_ref(), args)
    }

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl GitOps for Repository {
    fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        let remotes = self.inner.remotes()?;
        Ok(remotes.iter().flatten().map(String::from).collect())
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.inner.remote(name, url)?;
        Ok(())
    }

    fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self
            .inner
            .find_remote(name)
            .map_err(|_| Error::RemoteNotFound(name.into()))?;

        remote
            .pushurl()
            .or_else(|| remote.url())
            .map(String::from)
            .ok_or_else(|| Error::RemoteWithoutUrl(name.into()))
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.git(&["fetch", remote])
            .map_err(|e| Error::FetchFailed(e.detail()))?;
        Ok(())
    }

    fn fetch_all(&self) -> Result<()> {
        self.git(&["fetch", "--all"])
            .map_err(|e| Error::FetchFailed(e.detail()))?;
        Ok(())
    }

    fn remote_branch_exists(&self, remote: &str, branch: &str) -> bool {
        self.inner
            .find_branch(&format!("{remote}/{branch}"), BranchType::Remote)
            .is_ok()
    }

    fn push(&self, remote: &str, refname: &str, options: PushOptions) -> Result<()> {
        let mut args = vec!["push"];
        args.extend(options.to_args());
        args.extend([remote, refname]);

        self.git(&args).map_err(|e| Error::PushFailed(e.detail()))?;
        Ok(())
    }

    fn reset_branch_to(&self, branch: &str, start_point: &str) -> Result<()> {
        self.git(&["checkout", "-f", "-B", branch, start_point])?;
        Ok(())
    }

    fn create_branch_at(&self, branch: &str, commit: &str) -> Result<Oid> {
        let oid = self.resolve_commit(commit)?;
        let target = self.inner.find_commit(oid)?;
        let created = self.inner.branch(branch, &target, false)?;

        created
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(branch.into()))
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        if self.inner.find_branch(branch, BranchType::Local).is_err() {
            return Err(Error::BranchNotFound(branch.into()));
        }
        self.git(&["checkout", branch])?;
        Ok(())
    }

    fn rebase(&self, branch: &str, onto: &str) -> Result<()> {
        self.git(&["rebase", onto, branch])
            .map_err(|e| Error::RebaseFailed(e.detail()))?;
        Ok(())
    }

    fn rebase_skip(&self) -> Result<()> {
        self.git(&["rebase", "--skip"])
            .map_err(|e| Error::RebaseFailed(e.detail()))?;
        Ok(())
    }

    fn rebase_abort(&self) -> Result<()> {
        self.git(&["rebase", "--abort"])?;
        Ok(())
    }

    fn create_tag(&self, name: &str, target: &str) -> Result<()> {
        let object = self
            .inner
            .revparse_single(target)
            .map_err(|_| Error::RefNotFound(target.into()))?
            .peel(ObjectType::Commit)?;
        self.inner.tag_lightweight(name, &object, false)?;
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.inner
            .tag_delete(name)
            .map_err(|_| Error::RefNotFound(name.into()))
    }

    fn same_commit(&self, one: &str, two: &str) -> Result<bool> {
        Ok(self.resolve_commit(one)? == self.resolve_commit(two)?)
    }

    fn count_ahead(&self, head: &str, base: &str) -> Result<usize> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.push(self.resolve_commit(head)?)?;
        revwalk.hide(self.resolve_commit(base)?)?;

        Ok(revwalk.count())
    }

    fn commit_paths(&self, paths: &[&str], message: &str) -> Result<Oid> {
        let mut index = self.inner.index()?;
        // The git executable may have rewritten the index since it was cached.
        index.read(false)?;
        for path in paths {
            index.add_path(Path::new(path))?;
        }
        index.write()?;

        let tree = self.inner.find_tree(index.write_tree()?)?;
        let parent = self.inner.head()?.peel_to_commit()?;
        let signature = self.signature()?;

        Ok(self.inner.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_identity() -> Identity {
        Identity::new("Test User", "test@example.com")
    }

    fn init_test_repo() -> (TempDir, Repository) {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();

        // Create initial commit (scoped to drop borrows before moving repo)
        {
            let sig = Signature::now("Test User", "test@example.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap();
        }

        let wrapped = Repository {
            inner: repo,
            identity: Some(test_identity()),
        };
        (temp, wrapped)
    }

    fn commit_file(temp: &TempDir, repo: &Repository, name: &str, content: &str) -> Oid {
        fs::write(temp.path().join(name), content).unwrap();
        repo.commit_paths(&[name], &format!("Update {name}")).unwrap()
    }

    #[test]
    fn test_tag_lifecycle() {
        let (_temp, repo) = init_test_repo();
        let head = repo.current_branch().unwrap();

        repo.create_tag("private-rebaser-0000-previous", &head)
            .unwrap();
        assert!(repo.same_commit("private-rebaser-0000-previous", &head).unwrap());

        // Creating the same tag twice is refused
        assert!(repo.create_tag("private-rebaser-0000-previous", &head).is_err());

        repo.delete_tag("private-rebaser-0000-previous").unwrap();
        assert!(matches!(
            repo.delete_tag("private-rebaser-0000-previous"),
            Err(Error::RefNotFound(_))
        ));
    }

    #[test]
    fn test_same_commit_detects_movement() {
        let (temp, repo) = init_test_repo();
        let head = repo.current_branch().unwrap();
        repo.create_tag("before", &head).unwrap();

        commit_file(&temp, &repo, "file.txt", "content");

        assert!(!repo.same_commit("before", &head).unwrap());
    }

    #[test]
    fn test_count_ahead() {
        let (temp, repo) = init_test_repo();
        let head = repo.current_branch().unwrap();
        repo.create_tag("base", &head).unwrap();

        commit_file(&temp, &repo, "a.txt", "a");
        commit_file(&temp, &repo, "b.txt", "b");

        assert_eq!(repo.count_ahead(&head, "base").unwrap(), 2);
        assert_eq!(repo.count_ahead("base", &head).unwrap(), 0);
    }

    #[test]
    fn test_commit_paths_uses_identity() {
        let (temp, repo) = init_test_repo();
        let oid = commit_file(&temp, &repo, ".gitreview", "[gerrit]\n");

        let commit = repo.inner().find_commit(oid).unwrap();
        assert_eq!(commit.author().name(), Some("Test User"));
        assert_eq!(commit.committer().email(), Some("test@example.com"));
        assert!(commit.tree().unwrap().get_name(".gitreview").is_some());
    }

    #[test]
    fn test_remotes() {
        let (_temp, repo) = init_test_repo();
        assert!(repo.remote_names().unwrap().is_empty());

        repo.add_remote("patches", "ssh://review.example.com:29418/openstack/nova")
            .unwrap();

        assert_eq!(repo.remote_names().unwrap(), vec!["patches".to_string()]);
        assert_eq!(
            repo.remote_url("patches").unwrap(),
            "ssh://review.example.com:29418/openstack/nova"
        );
        assert!(matches!(
            repo.remote_url("missing"),
            Err(Error::RemoteNotFound(_))
        ));
        assert!(!repo.remote_branch_exists("patches", "master"));
    }

    #[test]
    fn test_create_branch_at_and_checkout() {
        let (temp, repo) = init_test_repo();
        let first = repo.resolve_commit("HEAD").unwrap();
        commit_file(&temp, &repo, "a.txt", "a");

        let oid = repo
            .create_branch_at("rhos-17.1-patches", &first.to_string())
            .unwrap();
        assert_eq!(oid, first);

        repo.checkout("rhos-17.1-patches").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "rhos-17.1-patches");
        assert!(matches!(
            repo.checkout("does-not-exist"),
            Err(Error::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_rebase_conflict_reports_paths_and_aborts() {
        let (temp, repo) = init_test_repo();
        let base = repo.resolve_commit("HEAD").unwrap().to_string();

        commit_file(&temp, &repo, ".gitreview", "upstream\n");
        let upstream = repo.resolve_commit("HEAD").unwrap().to_string();

        repo.reset_branch_to("patches", &base).unwrap();
        let patch = commit_file(&temp, &repo, ".gitreview", "downstream\n");

        let err = repo.rebase("patches", &upstream).unwrap_err();
        assert!(matches!(err, Error::RebaseFailed(_)));
        assert!(err.detail().contains(".gitreview"));
        assert!(repo.is_rebasing());

        repo.rebase_abort().unwrap();
        assert!(!repo.is_rebasing());
        assert_eq!(repo.resolve_commit("patches").unwrap(), patch);
    }

    #[test]
    fn test_rebase_skip_drops_conflicting_patch() {
        let (temp, repo) = init_test_repo();
        let base = repo.resolve_commit("HEAD").unwrap().to_string();

        commit_file(&temp, &repo, ".gitreview", "upstream\n");
        let upstream = repo.resolve_commit("HEAD").unwrap();

        repo.reset_branch_to("patches", &base).unwrap();
        commit_file(&temp, &repo, ".gitreview", "downstream\n");

        assert!(repo.rebase("patches", &upstream.to_string()).is_err());
        repo.rebase_skip().unwrap();

        assert!(!repo.is_rebasing());
        assert_eq!(repo.resolve_commit("patches").unwrap(), upstream);
    }
}
