//! Rebase-and-publish protocol.
//!
//! The [`Rebaser`] mirrors `remote/branch` locally, tags its tip, rebases the
//! branch onto the target commit and fetches again. If the remote tip still
//! equals the tag, nobody pushed during the rebase and the result is
//! force-pushed together with the tag. Otherwise the whole attempt is
//! repeated after a back-off, up to `max_retries` times.

use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use rebaser_git::{GitOps, PushOptions};

use crate::error::Result;
use crate::gitreview::{GITREVIEW_FILE, GitReviewGenerator};

/// Wait between an attempt that saw the remote move and the next attempt.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(20);

/// Retries used when the caller doesn't choose.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Name of the tag marking the remote tip before a rebase.
#[must_use]
pub fn safety_tag_name(release: Option<&str>, timestamp: &str) -> String {
    match release {
        Some(release) => format!("private-rebaser-{release}-{timestamp}-previous"),
        None => format!("private-rebaser-{timestamp}-previous"),
    }
}

/// What to do about a failed rebase step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Abort and report the failure.
    None,
    /// Skip the conflicting patch and regenerate the managed file.
    SkipAndRegenerate,
}

/// Maps a rebase failure detail to a recovery.
pub type ConflictClassifier = fn(&str) -> Recovery;

/// Default classifier: only conflicts touching `.gitreview` are recoverable.
#[must_use]
pub fn classify_conflict(detail: &str) -> Recovery {
    if detail.contains(GITREVIEW_FILE) {
        Recovery::SkipAndRegenerate
    } else {
        Recovery::None
    }
}

/// Rewrites and commits a generated file after its patch was skipped.
pub trait MetadataGenerator {
    /// File the generator owns, relative to the repository root.
    fn file_name(&self) -> &str;

    /// Write the file and commit it on the current branch.
    ///
    /// # Errors
    /// Returns error if the file can't be produced or committed.
    fn regenerate(&self, repo: &dyn GitOps) -> Result<()>;
}

impl<T: MetadataGenerator + ?Sized> MetadataGenerator for &T {
    fn file_name(&self) -> &str {
        (**self).file_name()
    }

    fn regenerate(&self, repo: &dyn GitOps) -> Result<()> {
        (**self).regenerate(repo)
    }
}

/// Waits between attempts.
pub trait Backoff {
    fn wait(&self, duration: Duration);
}

impl<T: Backoff + ?Sized> Backoff for &T {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration);
    }
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Backoff for ThreadSleep {
    fn wait(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Identity of one rebase run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseJob {
    /// Branch to rebase; same name locally and on the remote.
    pub branch: String,
    /// Commit to rebase onto.
    pub commit: String,
    /// Remote used as base and as push target.
    pub remote: String,
    /// Timestamp embedded in the safety tag.
    pub timestamp: String,
    /// Release label embedded in the safety tag, informational only.
    pub release: Option<String>,
    /// Run pushes as dry runs.
    pub dev_mode: bool,
    /// Retries allowed when the remote moves during the rebase.
    pub max_retries: u32,
}

impl RebaseJob {
    /// New job in dev mode with the default retry budget.
    #[must_use]
    pub fn new(
        branch: impl Into<String>,
        commit: impl Into<String>,
        remote: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            commit: commit.into(),
            remote: remote.into(),
            timestamp: timestamp.into(),
            release: None,
            dev_mode: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    #[must_use]
    pub const fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Safety tag name for this job.
    #[must_use]
    pub fn tag_name(&self) -> String {
        safety_tag_name(self.release.as_deref(), &self.timestamp)
    }

    /// `remote/branch`.
    #[must_use]
    pub fn remote_branch(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

/// How a rebase run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Tag and branch were pushed (dry-run in dev mode).
    Pushed {
        /// Rebase attempts made.
        attempts: u32,
        /// Local commits that were not on the remote.
        commits: usize,
    },

    /// The rebased branch had nothing the remote lacked.
    NothingToPush { attempts: u32 },

    /// The remote moved during every attempt; the rebase result is kept
    /// locally and not pushed.
    RetriesExhausted { attempts: u32 },
}

/// Rebases a patches branch and publishes the result.
pub struct Rebaser<'a, G: GitOps> {
    repo: &'a G,
    job: RebaseJob,
    tag_name: String,
    remote_branch: String,
    classifier: ConflictClassifier,
    generator: Box<dyn MetadataGenerator + 'a>,
    backoff: Box<dyn Backoff + 'a>,
}

impl<'a, G: GitOps> Rebaser<'a, G> {
    /// Rebaser that regenerates `.gitreview` on recoverable conflicts and
    /// sleeps between retries.
    #[must_use]
    pub fn new(repo: &'a G, job: RebaseJob) -> Self {
        let generator = GitReviewGenerator::new(&job.remote, &job.branch);
        Self {
            repo,
            tag_name: job.tag_name(),
            remote_branch: job.remote_branch(),
            job,
            classifier: classify_conflict,
            generator: Box::new(generator),
            backoff: Box::new(ThreadSleep),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: ConflictClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: impl MetadataGenerator + 'a) -> Self {
        self.generator = Box::new(generator);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: impl Backoff + 'a) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Safety tag used by every attempt of this job.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    #[must_use]
    pub const fn job(&self) -> &RebaseJob {
        &self.job
    }

    /// Rebase the branch onto the job's commit and push the result.
    ///
    /// # Errors
    /// Returns the first git failure, or a rebase failure that couldn't be
    /// recovered. The rebase is aborted and the current safety tag deleted
    /// before returning.
    pub fn rebase_and_update_remote(&self) -> Result<RebaseOutcome> {
        let mut retries_left = self.job.max_retries;
        let mut attempts = 0;

        loop {
            attempts += 1;

            self.repo.fetch(&self.job.remote)?;
            // Reset the local branch to the latest remote state
            self.repo
                .reset_branch_to(&self.job.branch, &self.remote_branch)?;
            // Tag the remote HEAD before rebasing
            self.repo.create_tag(&self.tag_name, &self.remote_branch)?;

            let remote_moved = self.rebase_and_check_remote().inspect_err(|_| self.discard_tag())?;

            if !remote_moved {
                return self
                    .update_remote_patches_branch(attempts)
                    .inspect_err(|_| self.discard_tag());
            }

            if retries_left == 0 {
                warn!(
                    "Remote changed multiple times during rebase, not pushing. \
                     The build will include the current rebase result."
                );
                return Ok(RebaseOutcome::RetriesExhausted { attempts });
            }

            info!("Remote changed during rebase. Remaining attempts: {retries_left}");
            self.backoff.wait(RETRY_BACKOFF);
            retries_left -= 1;
            // The next attempt tags the new remote HEAD
            self.repo.delete_tag(&self.tag_name)?;
        }
    }

    /// Rebase, fetch, and report whether the remote tip moved past the tag.
    fn rebase_and_check_remote(&self) -> Result<bool> {
        self.perform_rebase()?;
        self.repo.fetch(&self.job.remote)?;
        Ok(!self.repo.same_commit(&self.tag_name, &self.remote_branch)?)
    }

    /// Rebase the local branch onto the job's commit, recovering from
    /// conflicts the classifier accepts.
    fn perform_rebase(&self) -> Result<()> {
        loop {
            info!("Rebasing {} to {}", self.job.branch, self.job.commit);
            let err = match self.repo.rebase(&self.job.branch, &self.job.commit) {
                Ok(()) => return Ok(()),
                Err(err @ rebaser_git::Error::RebaseFailed(_)) => err,
                Err(other) => return Err(other.into()),
            };

            if self.try_automated_rebase_fix(&err.detail()) {
                continue;
            }

            info!("Could not rebase. Cleaning up.");
            if let Err(abort_err) = self.repo.rebase_abort() {
                error!("Failed to abort rebase: {abort_err}");
            }
            return Err(err.into());
        }
    }

    /// Returns true when the failed step was skipped and the generated file
    /// rewritten, so the rebase can be retried.
    fn try_automated_rebase_fix(&self, detail: &str) -> bool {
        match (self.classifier)(detail) {
            Recovery::None => false,
            Recovery::SkipAndRegenerate => {
                warn!(
                    "A patch including the {} file failed to rebase, skipping it.",
                    self.generator.file_name()
                );
                let fixed = self
                    .repo
                    .rebase_skip()
                    .map_err(Into::into)
                    .and_then(|()| self.generator.regenerate(self.repo));
                match fixed {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Failed to fix rebase error: {e}");
                        false
                    }
                }
            }
        }
    }

    /// Force-push the branch, preceded by the safety tag.
    ///
    /// Nothing is pushed when the local branch has no commit the remote
    /// lacks; the tag is dropped instead.
    fn update_remote_patches_branch(&self, attempts: u32) -> Result<RebaseOutcome> {
        let commits = self
            .repo
            .count_ahead(&self.job.branch, &self.remote_branch)?;

        if commits == 0 {
            info!("Deleting tag without pushing (no changes)");
            self.repo.delete_tag(&self.tag_name)?;
            return Ok(RebaseOutcome::NothingToPush { attempts });
        }

        if self.job.dev_mode {
            warn!("Dev mode: executing push commands in dry-run mode");
        } else {
            warn!(
                "Force-pushing {} to {} ({})",
                self.job.branch, self.job.remote, self.job.timestamp
            );
        }

        let dry_run = self.job.dev_mode;
        self.repo
            .push(&self.job.remote, &self.tag_name, PushOptions::plain(dry_run))?;
        self.repo.push(
            &self.job.remote,
            &self.job.branch,
            PushOptions::force_with_tags(dry_run),
        )?;

        Ok(RebaseOutcome::Pushed { attempts, commits })
    }

    fn discard_tag(&self) {
        if let Err(e) = self.repo.delete_tag(&self.tag_name) {
            warn!("Could not delete tag {}: {e}", self.tag_name);
        }
    }
}
