// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue model and status transition rules.
//!
//! Issues are owned by the issue store; the executor holds a snapshot and
//! mutates through store primitives. The transition table here is the
//! single source of truth both sides validate against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Subtype marking an epic as the root of a discovery tree. Missions get
/// their quality gates deferred to a dedicated QA worker.
pub const MISSION_SUBTYPE: &str = "mission";

/// Label added when incomplete work escalates past the retry limit.
pub const LABEL_NEEDS_HUMAN_REVIEW: &str = "needs-human-review";

/// Label added when a mission's gates are deferred.
pub const LABEL_NEEDS_QUALITY_GATES: &str = "needs-quality-gates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
}

impl IssueStatus {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Open issues can only be claimed; in-progress issues can close, block,
    /// or be released back to open; blocked issues reopen once a human
    /// clears them. Closed is terminal.
    pub fn can_transition_to(self, next: IssueStatus) -> bool {
        use IssueStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (InProgress, Closed)
                | (InProgress, Blocked)
                | (InProgress, Open)
                | (Blocked, Open)
        )
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::InProgress => write!(f, "in-progress"),
            IssueStatus::Blocked => write!(f, "blocked"),
            IssueStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition for {id}: {from} -> {to}")]
pub struct TransitionError {
    pub id: String,
    pub from: IssueStatus,
    pub to: IssueStatus,
}

/// Issue priority, 0 (urgent) through 3 (backlog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_u8(self) -> u8 {
        match self {
            Priority::P0 => 0,
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
        }
    }

    /// Clamping conversion; values above 3 become P3.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Priority::P0,
            1 => Priority::P1,
            2 => Priority::P2,
            _ => Priority::P3,
        }
    }

    /// Parse the "P0".."P3" notation used by AI analysis output.
    /// Unrecognized input maps to the default priority.
    pub fn parse_label(label: &str) -> Self {
        match label.trim() {
            "P0" | "p0" => Priority::P0,
            "P1" | "p1" => Priority::P1,
            "P3" | "p3" => Priority::P3,
            _ => Priority::P2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P2
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Task,
    Bug,
    Feature,
    Epic,
    Chore,
}

impl Default for IssueType {
    fn default() -> Self {
        IssueType::Task
    }
}

impl IssueType {
    /// Parse the free-form type strings AI analysis emits.
    /// Unrecognized input maps to `Task`.
    pub fn parse_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "bug" => IssueType::Bug,
            "feature" => IssueType::Feature,
            "epic" => IssueType::Epic,
            "chore" => IssueType::Chore,
            _ => IssueType::Task,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::Task => write!(f, "task"),
            IssueType::Bug => write!(f, "bug"),
            IssueType::Feature => write!(f, "feature"),
            IssueType::Epic => write!(f, "epic"),
            IssueType::Chore => write!(f, "chore"),
        }
    }
}

/// One unit of work in the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: Priority,
    pub issue_type: IssueType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Instance id of the claim holder while in-progress.
    #[serde(default)]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Missions are epics with subtype `mission`.
    pub fn is_mission(&self) -> bool {
        self.issue_type == IssueType::Epic && self.subtype.as_deref() == Some(MISSION_SUBTYPE)
    }

    /// Validate and return the transition, without applying it.
    pub fn check_transition(&self, to: IssueStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError { id: self.id.clone(), from: self.status, to })
        }
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
