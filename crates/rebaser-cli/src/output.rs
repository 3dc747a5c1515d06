//! Terminal output formatting utilities.
//!
//! User-facing results go through here; diagnostics go through `log`.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use rebaser_core::RebaseOutcome;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like branch names.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// One-line summary of a rebase run.
#[must_use]
pub fn outcome_summary(outcome: &RebaseOutcome, dev_mode: bool) -> String {
    let attempts = |n: u32| {
        if n == 1 {
            "1 attempt".to_string()
        } else {
            format!("{n} attempts")
        }
    };

    match outcome {
        RebaseOutcome::Pushed { attempts: n, commits } => {
            let verb = if dev_mode { "Dry-run pushed" } else { "Pushed" };
            format!("{verb} {commits} new commit(s) after {}", attempts(*n))
        }
        RebaseOutcome::NothingToPush { attempts: n } => {
            format!("Nothing to push after {}", attempts(*n))
        }
        RebaseOutcome::RetriesExhausted { attempts: n } => format!(
            "Remote kept moving; kept local rebase unpushed after {}",
            attempts(*n)
        ),
    }
}
