// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code-review sweeps.
//!
//! After agents land work, the sweeper measures what changed since the
//! last review checkpoint and asks the review oracle whether the delta
//! warrants a review issue. The checkpoint records the SHA the metrics
//! were computed against, never a later `HEAD`, and is saved atomically
//! with the review issue id so a crash cannot double-file.

use crate::subprocess::{run_with_timeout, GIT_COMMAND_TIMEOUT};
use crate::supervisor::ReviewOracle;
use crate::writer::EventWriter;
use crate::EngineError;
use chrono::Utc;
use drover_core::{EventType, IssueType, Priority, ReviewCheckpoint, SYSTEM_ISSUE};
use drover_store::{IssueStore, NewIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Git's well-known empty tree, used as the diff base before the first
/// checkpoint exists.
const EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMetrics {
    /// Checkpoint SHA the metrics are measured from, when one existed.
    pub base_sha: Option<String>,
    /// SHA the metrics are measured to; this is what the next checkpoint
    /// records.
    pub head_sha: String,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub warranted: bool,
    #[serde(default)]
    pub reason: String,
    /// Human description of what the review should cover.
    #[serde(default)]
    pub scope: String,
}

pub struct ReviewSweeper {
    repo_dir: PathBuf,
    oracle: Arc<dyn ReviewOracle>,
    store: Arc<dyn IssueStore>,
    writer: EventWriter,
}

impl ReviewSweeper {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        oracle: Arc<dyn ReviewOracle>,
        store: Arc<dyn IssueStore>,
        writer: EventWriter,
    ) -> Self {
        Self { repo_dir: repo_dir.into(), oracle, store, writer }
    }

    /// Measure, decide, and possibly file one review issue. Returns
    /// whether a review was scheduled. Sweep failures are best-effort:
    /// logged, swallowed, retried on the next close.
    pub async fn sweep(&self, _token: &CancellationToken) -> Result<bool, EngineError> {
        let checkpoint = self.store.latest_review_checkpoint().await?;
        let base_sha = checkpoint.map(|(c, _)| c.commit_sha);

        let head_sha = match git_head(&self.repo_dir).await {
            Ok(sha) => sha,
            Err(err) => {
                tracing::warn!(repo = %self.repo_dir.display(), error = %err, "review sweep skipped");
                return Ok(false);
            }
        };
        if base_sha.as_deref() == Some(head_sha.as_str()) {
            return Ok(false);
        }

        let metrics = match diff_metrics(&self.repo_dir, base_sha.as_deref(), &head_sha).await {
            Ok(metrics) => metrics,
            Err(err) => {
                tracing::warn!(repo = %self.repo_dir.display(), error = %err, "diff metrics failed");
                return Ok(false);
            }
        };

        let decision = match self.oracle.review_warranted(&metrics).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(error = %err, "review oracle failed");
                return Ok(false);
            }
        };

        self.writer.emit(
            self.writer
                .event(EventType::CodeReviewDecision, SYSTEM_ISSUE, "code review decision")
                .with_field("warranted", decision.warranted)
                .with_field("reason", decision.reason.clone())
                .with_field("files_changed", metrics.files_changed)
                .with_field("insertions", metrics.insertions)
                .with_field("deletions", metrics.deletions)
                .with_field("commits", metrics.commits)
                .with_field("head_sha", metrics.head_sha.clone()),
        );

        if !decision.warranted {
            return Ok(false);
        }

        let scope = if decision.scope.is_empty() {
            format!("{} files changed", metrics.files_changed)
        } else {
            decision.scope.clone()
        };
        let review = self
            .store
            .create_issue(NewIssue {
                title: format!("Code review: {scope}"),
                description: format!(
                    "Review the changes between {} and {head_sha}.\n\n{}",
                    base_sha.as_deref().unwrap_or("the initial commit"),
                    decision.reason
                ),
                priority: Priority::P2,
                issue_type: IssueType::Task,
                labels: vec!["code-review".to_string()],
                ..NewIssue::default()
            })
            .await?;

        // Checkpoint carries the SHA the metrics used; commits landing
        // during the sweep fall into the next one.
        self.store
            .save_review_checkpoint(
                ReviewCheckpoint {
                    commit_sha: metrics.head_sha.clone(),
                    timestamp: Utc::now(),
                    scope,
                },
                &review.id,
            )
            .await?;

        self.writer.emit(
            self.writer
                .event(EventType::CodeReviewCreated, SYSTEM_ISSUE, "code review issue filed")
                .with_field("review_id", review.id.clone())
                .with_field("head_sha", metrics.head_sha.clone()),
        );
        Ok(true)
    }
}

async fn git(repo: &Path, args: &[&str], label: &str) -> Result<String, String> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo)
        .args(args)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, label)
        .await
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(format!(
            "{label} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn git_head(repo: &Path) -> Result<String, String> {
    git(repo, &["rev-parse", "HEAD"], "git rev-parse").await
}

/// Diff and commit-count metrics between the checkpoint SHA and `head`.
async fn diff_metrics(
    repo: &Path,
    base: Option<&str>,
    head: &str,
) -> Result<DiffMetrics, String> {
    let diff_base = base.unwrap_or(EMPTY_TREE_SHA);
    let range = format!("{diff_base}..{head}");

    let shortstat =
        git(repo, &["diff", "--shortstat", diff_base, head], "git diff").await?;
    let (files_changed, insertions, deletions) = parse_shortstat(&shortstat);

    let commits = match base {
        Some(_) => git(repo, &["rev-list", "--count", &range], "git rev-list").await?,
        None => git(repo, &["rev-list", "--count", head], "git rev-list").await?,
    }
    .parse::<u64>()
    .map_err(|e| format!("bad commit count: {e}"))?;

    Ok(DiffMetrics {
        base_sha: base.map(String::from),
        head_sha: head.to_string(),
        files_changed,
        insertions,
        deletions,
        commits,
    })
}

/// Parse `N files changed, M insertions(+), K deletions(-)`; every clause
/// is optional in git's output.
fn parse_shortstat(line: &str) -> (u64, u64, u64) {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        match Regex::new(
            r"(?:(\d+) files? changed)?(?:,? ?(\d+) insertions?\(\+\))?(?:,? ?(\d+) deletions?\(-\))?",
        ) {
            Ok(re) => re,
            Err(_) => unreachable!("invalid built-in pattern"),
        }
    });
    let caps = match pattern.captures(line.trim()) {
        Some(caps) => caps,
        None => return (0, 0, 0),
    };
    let group = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    (group(1), group(2), group(3))
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
