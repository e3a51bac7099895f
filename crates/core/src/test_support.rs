// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across the workspace.

use crate::issue::{Issue, IssueStatus, IssueType, Priority};
use chrono::Utc;
use std::collections::BTreeSet;

/// Builder for issues in tests. Defaults to an open P2 task.
#[derive(Debug, Clone)]
pub struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            issue: Issue {
                id: id.into(),
                title: "test issue".to_string(),
                description: String::new(),
                status: IssueStatus::Open,
                priority: Priority::P2,
                issue_type: IssueType::Task,
                subtype: None,
                acceptance_criteria: String::new(),
                labels: BTreeSet::new(),
                assignee: None,
                created_at: now,
                updated_at: now,
                closed_at: None,
            },
        }
    }

    /// Shorthand for an in-progress epic with subtype `mission`.
    pub fn mission(id: impl Into<String>) -> Self {
        Self::new(id)
            .issue_type(IssueType::Epic)
            .subtype(crate::issue::MISSION_SUBTYPE)
            .status(IssueStatus::InProgress)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.issue.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.issue.description = description.into();
        self
    }

    pub fn status(mut self, status: IssueStatus) -> Self {
        self.issue.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.issue.priority = priority;
        self
    }

    pub fn issue_type(mut self, issue_type: IssueType) -> Self {
        self.issue.issue_type = issue_type;
        self
    }

    pub fn subtype(mut self, subtype: impl Into<String>) -> Self {
        self.issue.subtype = Some(subtype.into());
        self
    }

    pub fn acceptance_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.issue.acceptance_criteria = criteria.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.issue.labels.insert(label.into());
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.issue.assignee = Some(assignee.into());
        self
    }

    pub fn build(self) -> Issue {
        self.issue
    }
}
