//! Mock implementations for testing the rebaser without real repositories.
//!
//! Available to other crates' tests through the `test-utils` feature.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rebaser_git::{Error as GitError, GitOps, Oid, PushOptions, Result as GitResult};

use crate::error::{Error, Result};
use crate::rebase::{Backoff, MetadataGenerator};

/// Scripted, call-recording implementation of `GitOps`.
pub struct MockGitOps {
    pub workdir: Option<PathBuf>,
    /// Every operation, in order, rendered as `"<op> <args...>"`.
    pub calls: RefCell<Vec<String>>,
    /// Existing remote-tracking branches as `remote/branch`.
    pub remote_branches: RefCell<HashSet<String>>,
    pub remotes: RefCell<Vec<(String, String)>>,
    pub tags: RefCell<HashSet<String>>,
    /// Consumed by `rebase`; an empty queue means success.
    /// `Err(detail)` becomes `RebaseFailed(detail)`.
    pub rebase_results: RefCell<VecDeque<std::result::Result<(), String>>>,
    /// Consumed by `same_commit`; `true` means the remote moved.
    pub remote_changes: RefCell<VecDeque<bool>>,
    pub ahead: RefCell<usize>,
    pub pushes: RefCell<Vec<(String, String, PushOptions)>>,
    /// Operation name that should fail, e.g. `"fetch"`.
    pub fail_on: RefCell<Option<&'static str>>,
    /// Only fail `fail_on` after this many successful calls to it.
    pub fail_after: RefCell<usize>,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitOps {
    pub fn new() -> Self {
        Self {
            workdir: None,
            calls: RefCell::new(Vec::new()),
            remote_branches: RefCell::new(HashSet::new()),
            remotes: RefCell::new(Vec::new()),
            tags: RefCell::new(HashSet::new()),
            rebase_results: RefCell::new(VecDeque::new()),
            remote_changes: RefCell::new(VecDeque::new()),
            ahead: RefCell::new(1),
            pushes: RefCell::new(Vec::new()),
            fail_on: RefCell::new(None),
            fail_after: RefCell::new(0),
        }
    }

    pub fn with_workdir(mut self, path: &Path) -> Self {
        self.workdir = Some(path.to_path_buf());
        self
    }

    pub fn with_remote_branch(self, remote: &str, branch: &str) -> Self {
        self.remote_branches
            .borrow_mut()
            .insert(format!("{remote}/{branch}"));
        self
    }

    pub fn with_remote(self, name: &str, url: &str) -> Self {
        self.remotes
            .borrow_mut()
            .push((name.to_string(), url.to_string()));
        self
    }

    pub fn with_rebase_failure(self, detail: &str) -> Self {
        self.rebase_results
            .borrow_mut()
            .push_back(Err(detail.to_string()));
        self
    }

    /// Remote moves during each of the next `times` attempts.
    pub fn with_remote_moving(self, times: usize) -> Self {
        self.remote_changes
            .borrow_mut()
            .extend(std::iter::repeat_n(true, times));
        self
    }

    pub fn with_ahead(self, ahead: usize) -> Self {
        *self.ahead.borrow_mut() = ahead;
        self
    }

    pub fn with_failure(self, op: &'static str) -> Self {
        *self.fail_on.borrow_mut() = Some(op);
        self
    }

    pub fn with_failure_after(self, op: &'static str, successes: usize) -> Self {
        *self.fail_after.borrow_mut() = successes;
        self.with_failure(op)
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    /// Arguments of every recorded `op` call.
    pub fn args_of(&self, op: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| {
                let (name, args) = c.split_once(' ').unwrap_or((c.as_str(), ""));
                (name == op).then(|| args.to_string())
            })
            .collect()
    }

    pub fn ops(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.split(' ').next().map(String::from))
            .collect()
    }

    fn record(&self, op: &'static str, args: &[&str]) -> GitResult<()> {
        let mut call = op.to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        self.calls.borrow_mut().push(call);

        if *self.fail_on.borrow() == Some(op) {
            let mut remaining = self.fail_after.borrow_mut();
            if *remaining == 0 {
                return Err(GitError::CommandFailed {
                    command: op.to_string(),
                    detail: format!("mock {op} failure"),
                });
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

impl GitOps for MockGitOps {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn remote_names(&self) -> GitResult<Vec<String>> {
        Ok(self.remotes.borrow().iter().map(|(n, _)| n.clone()).collect())
    }

    fn add_remote(&self, name: &str, url: &str) -> GitResult<()> {
        self.record("add-remote", &[name, url])?;
        self.remotes
            .borrow_mut()
            .push((name.to_string(), url.to_string()));
        Ok(())
    }

    fn remote_url(&self, name: &str) -> GitResult<String> {
        self.remotes
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, url)| url.clone())
            .ok_or_else(|| GitError::RemoteNotFound(name.into()))
    }

    fn fetch(&self, remote: &str) -> GitResult<()> {
        self.record("fetch", &[remote])
    }

    fn fetch_all(&self) -> GitResult<()> {
        self.record("fetch-all", &[])
    }

    fn remote_branch_exists(&self, remote: &str, branch: &str) -> bool {
        let name = format!("{remote}/{branch}");
        let _ = self.record("exists", &[name.as_str()]);
        self.remote_branches.borrow().contains(&name)
    }

    fn push(&self, remote: &str, refname: &str, options: PushOptions) -> GitResult<()> {
        self.record("push", &[remote, refname])?;
        self.pushes
            .borrow_mut()
            .push((remote.to_string(), refname.to_string(), options));
        Ok(())
    }

    fn reset_branch_to(&self, branch: &str, start_point: &str) -> GitResult<()> {
        self.record("reset", &[branch, start_point])
    }

    fn create_branch_at(&self, branch: &str, commit: &str) -> GitResult<Oid> {
        self.record("create-branch", &[branch, commit])?;
        Ok(Oid::zero())
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        self.record("checkout", &[branch])
    }

    fn rebase(&self, branch: &str, onto: &str) -> GitResult<()> {
        self.record("rebase", &[branch, onto])?;
        match self.rebase_results.borrow_mut().pop_front() {
            Some(Err(detail)) => Err(GitError::RebaseFailed(detail)),
            _ => Ok(()),
        }
    }

    fn rebase_skip(&self) -> GitResult<()> {
        self.record("skip", &[])
            .map_err(|e| GitError::RebaseFailed(e.detail()))
    }

    fn rebase_abort(&self) -> GitResult<()> {
        self.record("abort", &[])
    }

    fn create_tag(&self, name: &str, target: &str) -> GitResult<()> {
        self.record("tag", &[name, target])?;
        if !self.tags.borrow_mut().insert(name.to_string()) {
            return Err(GitError::CommandFailed {
                command: "tag".into(),
                detail: format!("tag '{name}' already exists"),
            });
        }
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> GitResult<()> {
        self.record("delete-tag", &[name])?;
        if self.tags.borrow_mut().remove(name) {
            Ok(())
        } else {
            Err(GitError::RefNotFound(name.into()))
        }
    }

    fn same_commit(&self, one: &str, two: &str) -> GitResult<bool> {
        self.record("same", &[one, two])?;
        let moved = self.remote_changes.borrow_mut().pop_front().unwrap_or(false);
        Ok(!moved)
    }

    fn count_ahead(&self, head: &str, base: &str) -> GitResult<usize> {
        self.record("ahead", &[head, base])?;
        Ok(*self.ahead.borrow())
    }

    fn commit_paths(&self, paths: &[&str], _message: &str) -> GitResult<Oid> {
        self.record("commit", paths)?;
        Ok(Oid::zero())
    }
}

/// Records back-off waits instead of sleeping.
#[derive(Default)]
pub struct RecordingBackoff {
    pub waits: RefCell<Vec<Duration>>,
}

impl Backoff for RecordingBackoff {
    fn wait(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

/// Records regenerations; optionally fails them.
#[derive(Default)]
pub struct MockGenerator {
    pub regenerated: RefCell<usize>,
    pub fail: bool,
}

impl MetadataGenerator for MockGenerator {
    fn file_name(&self) -> &str {
        ".gitreview"
    }

    fn regenerate(&self, repo: &dyn GitOps) -> Result<()> {
        if self.fail {
            return Err(Error::InvalidRemoteUrl("mock".into()));
        }
        *self.regenerated.borrow_mut() += 1;
        repo.commit_paths(&[".gitreview"], "regenerated")?;
        Ok(())
    }
}
