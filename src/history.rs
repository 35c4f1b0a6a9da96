//! Commit history per file
//!
//! Counts the commits touching a file and how many of them look like bug
//! fixes, using `git log --follow`.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex_lite::Regex;
use thiserror::Error;

use crate::metrics::CommitHistory;

/// Default pattern for bug-flagged commit messages
pub const DEFAULT_BUG_PATTERN: &str = "(?i)bug";

/// Errors that can occur while reading history
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git log failed for {}: {stderr}", .path.display())]
    GitFailed { path: PathBuf, stderr: String },

    #[error("Invalid bug pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// Source of per-file commit history
pub trait HistoryProvider: Send + Sync {
    fn commit_history(&self, path: &Path) -> Result<CommitHistory, HistoryError>;
}

/// [`HistoryProvider`] backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitHistory {
    bug_pattern: Regex,
    /// Only count commits from the last N months
    months: Option<usize>,
}

impl GitHistory {
    pub fn new(bug_pattern: &str, months: Option<usize>) -> Result<Self, HistoryError> {
        Ok(Self {
            bug_pattern: Regex::new(bug_pattern)?,
            months: months.filter(|m| *m > 0),
        })
    }
}

impl HistoryProvider for GitHistory {
    fn commit_history(&self, path: &Path) -> Result<CommitHistory, HistoryError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut command = Command::new("git");
        command
            .current_dir(dir)
            .args(["log", "--follow", "--oneline"]);
        if let Some(months) = self.months {
            command.arg(format!("--since={} months ago", months));
        }
        // git runs inside the file's directory, so the bare file name is enough
        command
            .arg("--")
            .arg(path.file_name().unwrap_or(path.as_os_str()));

        let output = command.output()?;
        if !output.status.success() {
            return Err(HistoryError::GitFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(count_commits(
            &String::from_utf8_lossy(&output.stdout),
            &self.bug_pattern,
        ))
    }
}

/// Count `git log --oneline` lines and those matching `bug_pattern`
pub fn count_commits(log: &str, bug_pattern: &Regex) -> CommitHistory {
    let mut history = CommitHistory::default();
    for line in log.lines().filter(|l| !l.trim().is_empty()) {
        history.commits += 1;
        if bug_pattern.is_match(line) {
            history.bug_commits += 1;
        }
    }
    history
}
