// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The post-agent decision machine.
//!
//! Given one claimed issue and the reduced result of its agent run, decide
//! the terminal action: close, reopen for retry, escalate, or (for
//! missions) defer gates and leave the issue in-progress. All lifecycle
//! events for one issue are emitted in the order of the steps below;
//! persistence order across events is not guaranteed.

use crate::dedup::{map_candidate, DedupGateway};
use crate::gates::GateRunnerFactory;
use crate::incomplete::{handle_incomplete_work, IncompleteOutcome};
use crate::supervisor::Supervisor;
use crate::writer::EventWriter;
use crate::EngineError;
use drover_core::{
    AgentResult, Analysis, EventType, Issue, Severity, WatchdogState, LABEL_NEEDS_QUALITY_GATES,
};
use drover_store::{DependencyEdge, IssueStore, NewIssue};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_incomplete_retries: u32,
    /// Directory gates run in (the agent's working directory).
    pub working_dir: PathBuf,
}

/// What the processor decided, for the loop and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub completed: bool,
    pub gates_passed: bool,
    pub retried: bool,
    pub escalated: bool,
    pub review_scheduled: bool,
}

pub struct ResultsProcessor {
    store: Arc<dyn IssueStore>,
    writer: EventWriter,
    supervisor: Option<Arc<dyn Supervisor>>,
    gates: Option<Arc<dyn GateRunnerFactory>>,
    dedup: Option<DedupGateway>,
    watchdog: Arc<Mutex<WatchdogState>>,
    config: ProcessorConfig,
}

impl ResultsProcessor {
    pub fn new(
        store: Arc<dyn IssueStore>,
        writer: EventWriter,
        supervisor: Option<Arc<dyn Supervisor>>,
        gates: Option<Arc<dyn GateRunnerFactory>>,
        dedup: Option<DedupGateway>,
        watchdog: Arc<Mutex<WatchdogState>>,
        config: ProcessorConfig,
    ) -> Self {
        Self { store, writer, supervisor, gates, dedup, watchdog, config }
    }

    /// Decide and apply the terminal action for one agent run.
    pub async fn process(
        &self,
        issue: &Issue,
        result: &AgentResult,
        token: &CancellationToken,
    ) -> Result<ProcessResult, EngineError> {
        self.writer.emit(
            self.writer
                .event(EventType::ResultsProcessingStarted, &issue.id, "processing agent result")
                .with_field("success", result.success)
                .with_field("exit_code", result.exit_code)
                .with_field("duration_ms", result.duration_ms),
        );

        let analysis = self.analyze(issue, result).await;

        // Failure path: agent failed outright, or the supervisor judged
        // the work incomplete.
        let analysis_incomplete = analysis.as_ref().map(|a| !a.completed).unwrap_or(false);
        if !result.success || analysis_incomplete {
            self.writer.emit(
                self.writer
                    .event(EventType::QualityGatesSkipped, &issue.id, "quality gates skipped")
                    .with_field("reason", "agent execution failed"),
            );
            let outcome = handle_incomplete_work(
                self.store.as_ref(),
                issue,
                analysis.as_ref(),
                self.config.max_incomplete_retries,
            )
            .await?;
            return Ok(self.finish_incomplete(issue, outcome));
        }

        // Mission deferral: gates belong to a dedicated QA worker; the
        // mission stays in-progress until its discoveries converge.
        if issue.is_mission() {
            if let Err(err) = self.store.add_label(&issue.id, LABEL_NEEDS_QUALITY_GATES).await {
                tracing::warn!(issue = %issue.id, error = %err, "failed to label mission for qa");
            }
            self.writer.emit(
                self.writer
                    .event(
                        EventType::QualityGatesDeferred,
                        &issue.id,
                        "quality gates deferred to qa worker",
                    )
                    .with_field("mission_id", issue.id.clone())
                    .with_field("reason", "delegated-to-qa-worker"),
            );
            self.emit_completed(&issue.id, "deferred");
            return Ok(ProcessResult {
                completed: false,
                gates_passed: true,
                ..ProcessResult::default()
            });
        }

        // Inline gates.
        if !self.run_gates(issue, token).await {
            let outcome = handle_incomplete_work(
                self.store.as_ref(),
                issue,
                analysis.as_ref(),
                self.config.max_incomplete_retries,
            )
            .await?;
            return Ok(self.finish_incomplete(issue, outcome));
        }

        // Discovered issues survive deduplication and get filed as
        // children before the close; per-child failures are logged and do
        // not undo the close.
        if let Some(analysis) = &analysis {
            self.file_discoveries(issue, analysis).await;
        }

        let summary = analysis
            .as_ref()
            .map(|a| a.summary.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Agent run completed successfully.".to_string());
        self.store
            .close_issue(&issue.id, &summary, self.writer.executor_id().as_str())
            .await?;
        self.watchdog.lock().record_progress();
        self.emit_completed(&issue.id, "closed");

        Ok(ProcessResult { completed: true, gates_passed: true, ..ProcessResult::default() })
    }

    async fn analyze(&self, issue: &Issue, result: &AgentResult) -> Option<Analysis> {
        let supervisor = self.supervisor.as_ref()?;
        self.writer.emit(self.writer.event(
            EventType::AnalysisStarted,
            &issue.id,
            "analyzing execution result",
        ));
        match supervisor.analyze_execution_result(issue, result).await {
            Ok(analysis) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AnalysisCompleted, &issue.id, "analysis completed")
                        .with_field("completed", analysis.completed)
                        .with_field("discovered_issues", analysis.discovered_issues.len())
                        .with_field("punted_items", analysis.punted_items.len()),
                );
                Some(analysis)
            }
            Err(err) => {
                tracing::error!(issue = %issue.id, error = %err, "result analysis failed");
                self.writer.emit(
                    self.writer
                        .event(EventType::AnalysisCompleted, &issue.id, "analysis failed")
                        .with_severity(Severity::Error)
                        .with_field("error", err.to_string()),
                );
                None
            }
        }
    }

    /// Run inline gates if configured and applicable. Returns whether the
    /// close may proceed.
    async fn run_gates(&self, issue: &Issue, token: &CancellationToken) -> bool {
        let factory = match &self.gates {
            Some(factory) => factory,
            None => {
                self.writer.emit(
                    self.writer
                        .event(EventType::QualityGatesSkipped, &issue.id, "quality gates skipped")
                        .with_field("reason", "gates not configured"),
                );
                return true;
            }
        };

        if !factory.applicable(&self.config.working_dir) {
            self.writer.emit(
                self.writer
                    .event(EventType::QualityGatesSkipped, &issue.id, "quality gates skipped")
                    .with_field("reason", "gates not applicable to working directory"),
            );
            return true;
        }

        self.writer.emit(self.writer.event(
            EventType::QualityGatesStarted,
            &issue.id,
            "running quality gates",
        ));

        let report = match factory.build(&self.config.working_dir) {
            Ok(runner) => match runner.run(token).await {
                Ok(report) => report,
                Err(err) => {
                    tracing::error!(issue = %issue.id, error = %err, "gate run failed");
                    self.writer.emit(
                        self.writer
                            .event(
                                EventType::QualityGatesCompleted,
                                &issue.id,
                                "quality gates failed to run",
                            )
                            .with_severity(Severity::Error)
                            .with_field("success", false)
                            .with_field("error", err.to_string()),
                    );
                    return false;
                }
            },
            Err(err) => {
                tracing::error!(issue = %issue.id, error = %err, "gate runner construction failed");
                self.writer.emit(
                    self.writer
                        .event(
                            EventType::QualityGatesCompleted,
                            &issue.id,
                            "gate runner construction failed",
                        )
                        .with_severity(Severity::Error)
                        .with_field("success", false)
                        .with_field("error", err.to_string()),
                );
                return false;
            }
        };

        self.writer.emit(
            self.writer
                .event(EventType::QualityGatesCompleted, &issue.id, "quality gates completed")
                .with_field("all_passed", report.all_passed)
                .with_field(
                    "gates_run",
                    Value::from(report.gates_run.clone()),
                )
                .with_field(
                    "failures",
                    Value::from(
                        report.failures.iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
                    ),
                ),
        );
        report.all_passed
    }

    async fn file_discoveries(&self, issue: &Issue, analysis: &Analysis) {
        if analysis.discovered_issues.is_empty() {
            return;
        }
        let survivors = match &self.dedup {
            Some(gateway) => gateway.filter(issue, &analysis.discovered_issues).await,
            None => analysis.discovered_issues.iter().map(map_candidate).collect(),
        };
        for candidate in survivors {
            let created = self
                .store
                .create_issue(NewIssue {
                    title: candidate.title.clone(),
                    description: candidate.description,
                    priority: candidate.priority,
                    issue_type: candidate.issue_type,
                    ..NewIssue::default()
                })
                .await;
            match created {
                Ok(child) => {
                    if let Err(err) = self
                        .store
                        .add_dependency(DependencyEdge::discovered_from(&child.id, &issue.id))
                        .await
                    {
                        tracing::warn!(
                            issue = %issue.id,
                            child = %child.id,
                            error = %err,
                            "failed to link discovered issue"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        issue = %issue.id,
                        title = %candidate.title,
                        error = %err,
                        "failed to create discovered issue"
                    );
                }
            }
        }
    }

    fn finish_incomplete(&self, issue: &Issue, outcome: IncompleteOutcome) -> ProcessResult {
        self.emit_completed(&issue.id, if outcome.escalated { "escalated" } else { "retried" });
        ProcessResult {
            retried: !outcome.escalated,
            escalated: outcome.escalated,
            ..ProcessResult::default()
        }
    }

    fn emit_completed(&self, issue_id: &str, outcome: &str) {
        self.writer.emit(
            self.writer
                .event(EventType::ResultsProcessingCompleted, issue_id, "results processing completed")
                .with_field("outcome", outcome),
        );
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
