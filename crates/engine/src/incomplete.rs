// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incomplete-work handling.
//!
//! When an agent run fails, or the supervisor judges the acceptance
//! criteria unsatisfied, the issue either goes back to open for another
//! attempt or escalates to a human. Attempt counting is derived from the
//! supervisor's own comment trail, so it survives executor restarts and
//! ignores unrelated chatter on the issue.

use drover_core::{Analysis, Issue, IssueStatus, LABEL_NEEDS_HUMAN_REVIEW};
use drover_store::{IssueStore, StoreError};
use regex::Regex;
use std::sync::OnceLock;

/// Author of every comment the executor posts on behalf of the AI
/// supervisor. Only this author's comments count toward attempts.
pub const SUPERVISOR_ACTOR: &str = "ai-supervisor";

fn attempt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        match Regex::new(r"Incomplete Work Detected \(Attempt #(\d+)\)") {
            Ok(re) => re,
            Err(_) => unreachable!("invalid built-in pattern"),
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompleteOutcome {
    /// 1-based number of this attempt.
    pub attempt: u32,
    pub escalated: bool,
}

/// Record an incomplete attempt and either reopen or escalate.
///
/// The new attempt number is `max(prior attempt numbers) + 1`; a number
/// beyond `max_retries` escalates (label `needs-human-review`, status
/// blocked). Absent analysis is handled as empty, not as a crash.
pub async fn handle_incomplete_work(
    store: &dyn IssueStore,
    issue: &Issue,
    analysis: Option<&Analysis>,
    max_retries: u32,
) -> Result<IncompleteOutcome, StoreError> {
    let comments = store.get_comments(&issue.id).await?;
    let prior_attempts: Vec<&drover_store::Comment> = comments
        .iter()
        .filter(|c| c.author == SUPERVISOR_ACTOR && attempt_pattern().is_match(&c.body))
        .collect();
    let last_attempt = prior_attempts
        .iter()
        .filter_map(|c| attempt_pattern().captures(&c.body))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let attempt = last_attempt + 1;

    let summary = analysis
        .map(|a| a.summary.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("The agent exited without satisfying the acceptance criteria.");

    if attempt > max_retries {
        let mut body = format!(
            "## Incomplete Work Escalated\n\n\
             This issue was attempted {attempt} times without satisfying its \
             acceptance criteria and needs human review.\n\n{summary}\n"
        );
        if !prior_attempts.is_empty() {
            body.push_str("\n### Prior attempts\n");
            for comment in &prior_attempts {
                if let Some(first_line) =
                    comment.body.lines().find(|l| !l.trim().is_empty())
                {
                    body.push_str(&format!("- {}\n", first_line.trim_start_matches('#').trim()));
                }
            }
        }

        // The comment goes first so the escalation record survives a
        // label or status failure.
        store.add_comment(&issue.id, SUPERVISOR_ACTOR, &body).await?;
        store.add_label(&issue.id, LABEL_NEEDS_HUMAN_REVIEW).await?;
        store.update_status(&issue.id, IssueStatus::Blocked).await?;

        tracing::warn!(
            issue = %issue.id,
            attempt,
            "incomplete work escalated to human review"
        );
        return Ok(IncompleteOutcome { attempt, escalated: true });
    }

    let mut body = format!("## Incomplete Work Detected (Attempt #{attempt})\n\n{summary}\n");
    if let Some(analysis) = analysis {
        if !analysis.punted_items.is_empty() {
            body.push_str("\n### Punted\n");
            for item in &analysis.punted_items {
                body.push_str(&format!("- {item}\n"));
            }
        }
        if !analysis.quality_issues.is_empty() {
            body.push_str("\n### Quality issues\n");
            for item in &analysis.quality_issues {
                body.push_str(&format!("- {item}\n"));
            }
        }
    }

    store.add_comment(&issue.id, SUPERVISOR_ACTOR, &body).await?;
    store.update_status(&issue.id, IssueStatus::Open).await?;

    tracing::info!(issue = %issue.id, attempt, "incomplete work, returned to open");
    Ok(IncompleteOutcome { attempt, escalated: false })
}

#[cfg(test)]
#[path = "incomplete_tests.rs"]
mod tests;
