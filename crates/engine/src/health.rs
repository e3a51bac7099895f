// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health monitoring orchestration.
//!
//! Monitors are external collaborators registered by the embedder; the
//! engine runs the registry once after every successful close (event-based
//! scheduling, one tick per close) and files whatever they find. One
//! failing monitor never stops the others.

use crate::writer::EventWriter;
use async_trait::async_trait;
use drover_core::{EventType, Priority, Severity, SYSTEM_ISSUE};
use drover_store::{IssueStore, NewIssue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthSeverity {
    High,
    Medium,
    Low,
}

impl HealthSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthSeverity::High => "high",
            HealthSeverity::Medium => "medium",
            HealthSeverity::Low => "low",
        }
    }

    /// Priority for a filed finding: high maps to P1, medium to P2,
    /// everything else to P3.
    pub fn priority(self) -> Priority {
        match self {
            HealthSeverity::High => Priority::P1,
            HealthSeverity::Medium => Priority::P2,
            HealthSeverity::Low => Priority::P3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: HealthSeverity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub issues_found: Vec<HealthIssue>,
}

#[async_trait]
pub trait HealthMonitor: Send + Sync {
    fn name(&self) -> &str;

    /// Label category attached to every finding from this monitor.
    fn category(&self) -> &str;

    async fn check(&self, token: &CancellationToken) -> Result<CheckResult, MonitorError>;
}

#[derive(Default)]
pub struct HealthRegistry {
    monitors: Vec<Arc<dyn HealthMonitor>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, monitor: Arc<dyn HealthMonitor>) {
        self.monitors.push(monitor);
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Monitors due this tick. Scheduling is event-based (one tick per
    /// successful close), so every registered monitor is due.
    pub fn scheduled(&self) -> &[Arc<dyn HealthMonitor>] {
        &self.monitors
    }
}

/// Run every scheduled monitor and file findings. Returns how many issues
/// were filed.
pub async fn run_health_checks(
    registry: &HealthRegistry,
    store: &dyn IssueStore,
    writer: &EventWriter,
    token: &CancellationToken,
) -> u64 {
    let mut filed = 0;
    for monitor in registry.scheduled() {
        match monitor.check(token).await {
            Ok(result) => {
                for finding in &result.issues_found {
                    let new = NewIssue {
                        title: finding.title.clone(),
                        description: finding.description.clone(),
                        priority: finding.severity.priority(),
                        issue_type: drover_core::IssueType::Task,
                        labels: vec![
                            "health".to_string(),
                            monitor.category().to_string(),
                            format!("severity:{}", finding.severity.as_str()),
                        ],
                        ..NewIssue::default()
                    };
                    match store.create_issue(new).await {
                        Ok(_) => filed += 1,
                        Err(err) => tracing::warn!(
                            monitor = monitor.name(),
                            title = %finding.title,
                            error = %err,
                            "failed to file health finding"
                        ),
                    }
                }
                writer.emit(
                    writer
                        .event(
                            EventType::HealthCheckCompleted,
                            SYSTEM_ISSUE,
                            format!("health check completed: {}", monitor.name()),
                        )
                        .with_field("monitor", monitor.name())
                        .with_field("category", monitor.category())
                        .with_field("issues_found", result.issues_found.len()),
                );
            }
            Err(err) => {
                tracing::warn!(monitor = monitor.name(), error = %err, "health monitor failed");
                writer.emit(
                    writer
                        .event(
                            EventType::HealthCheckFailed,
                            SYSTEM_ISSUE,
                            format!("health check failed: {}", monitor.name()),
                        )
                        .with_severity(Severity::Error)
                        .with_field("monitor", monitor.name())
                        .with_field("error", err.to_string()),
                );
            }
        }
    }
    filed
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
