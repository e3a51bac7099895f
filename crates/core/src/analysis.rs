// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shapes exchanged with the AI supervisor.
//!
//! These are the supervisor's output formats, kept deliberately stringly
//! (priority as "P0".."P3", type as free text) because model output is
//! mapped into the issue model at the deduplication gateway, not here.

use serde::{Deserialize, Serialize};

/// Pre-execution assessment of a claimed issue, used to enrich the agent
/// prompt. Free-form; an absent or failed assessment degrades to spawning
/// with the raw issue body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub summary: String,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Post-execution judgement of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Whether the acceptance criteria are satisfied.
    pub completed: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub discovered_issues: Vec<DiscoveredIssue>,
    #[serde(default)]
    pub quality_issues: Vec<String>,
    #[serde(default)]
    pub punted_items: Vec<String>,
}

/// New work the agent uncovered while executing its parent issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// "P0".."P3" notation; mapped by [`crate::Priority::parse_label`].
    #[serde(default)]
    pub priority: String,
    /// Free-form type string; mapped by [`crate::IssueType::parse_label`].
    #[serde(default)]
    pub issue_type: String,
}

/// AI-recommended watchdog backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffAdvice {
    pub should_back_off: bool,
    /// Recommended supervisory check interval.
    pub interval_ms: u64,
    #[serde(default)]
    pub reason: String,
}
