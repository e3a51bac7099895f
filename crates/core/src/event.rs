// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform observability records.
//!
//! Every notable thing the executor does becomes an [`AgentEvent`], from
//! claiming an issue to individual tool calls parsed out of agent output.
//! The envelope carries the owning issue and executor instance as
//! first-class fields; the free-form `data` map must never duplicate them.

use crate::id::{EventId, InstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The full event taxonomy. Adding a variant is an observability-schema
/// change; consumers match on the wire name, so variants are never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IssueClaimed,
    AssessmentStarted,
    AssessmentCompleted,
    AgentSpawned,
    AgentToolUse,
    AgentCompleted,
    ResultsProcessingStarted,
    ResultsProcessingCompleted,
    AnalysisStarted,
    AnalysisCompleted,
    QualityGatesStarted,
    QualityGatesCompleted,
    QualityGatesSkipped,
    QualityGatesDeferred,
    DeduplicationBatchStarted,
    DeduplicationBatchCompleted,
    DeduplicationDecision,
    CodeReviewDecision,
    CodeReviewCreated,
    HealthCheckCompleted,
    HealthCheckFailed,
    EventCleanupCompleted,
    InstanceCleanupCompleted,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::IssueClaimed => "issue_claimed",
            EventType::AssessmentStarted => "assessment_started",
            EventType::AssessmentCompleted => "assessment_completed",
            EventType::AgentSpawned => "agent_spawned",
            EventType::AgentToolUse => "agent_tool_use",
            EventType::AgentCompleted => "agent_completed",
            EventType::ResultsProcessingStarted => "results_processing_started",
            EventType::ResultsProcessingCompleted => "results_processing_completed",
            EventType::AnalysisStarted => "analysis_started",
            EventType::AnalysisCompleted => "analysis_completed",
            EventType::QualityGatesStarted => "quality_gates_started",
            EventType::QualityGatesCompleted => "quality_gates_completed",
            EventType::QualityGatesSkipped => "quality_gates_skipped",
            EventType::QualityGatesDeferred => "quality_gates_deferred",
            EventType::DeduplicationBatchStarted => "deduplication_batch_started",
            EventType::DeduplicationBatchCompleted => "deduplication_batch_completed",
            EventType::DeduplicationDecision => "deduplication_decision",
            EventType::CodeReviewDecision => "code_review_decision",
            EventType::CodeReviewCreated => "code_review_created",
            EventType::HealthCheckCompleted => "health_check_completed",
            EventType::HealthCheckFailed => "health_check_failed",
            EventType::EventCleanupCompleted => "event_cleanup_completed",
            EventType::InstanceCleanupCompleted => "instance_cleanup_completed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Envelope fields that must never appear in the data map.
const RESERVED_DATA_KEYS: [&str; 2] = ["issue_id", "executor_id"];

/// One observability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// Owning issue, or [`crate::SYSTEM_ISSUE`] for process-wide events.
    pub issue_id: String,
    pub executor_id: InstanceId,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Source line number when derived from agent output.
    #[serde(default)]
    pub source_line: Option<u64>,
}

impl AgentEvent {
    pub fn new(
        event_type: EventType,
        issue_id: impl Into<String>,
        executor_id: InstanceId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            timestamp: Utc::now(),
            issue_id: issue_id.into(),
            executor_id,
            agent_id: None,
            severity: Severity::Info,
            message: message.into(),
            data: Map::new(),
            source_line: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_source_line(mut self, line: u64) -> Self {
        self.source_line = Some(line);
        self
    }

    /// Attach a data field. Reserved envelope keys are dropped so the
    /// `issue_id`/`executor_id` never get duplicated inside `data`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_DATA_KEYS.contains(&key.as_str()) {
            self.data.insert(key, value.into());
        }
        self
    }

    /// Merge a whole map of data fields, dropping reserved keys.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        for (key, value) in data {
            if !RESERVED_DATA_KEYS.contains(&key.as_str()) {
                self.data.insert(key, value);
            }
        }
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
