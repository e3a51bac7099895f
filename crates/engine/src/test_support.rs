// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators shared across the workspace's tests.

use crate::dedup::{DedupCandidate, DedupDecision, DedupOutcome, DedupStats};
use crate::gates::{GateError, GateFailure, GateReport, GateRunner, GateRunnerFactory};
use crate::health::{CheckResult, HealthIssue, HealthMonitor, MonitorError};
use crate::review::{DiffMetrics, ReviewDecision};
use crate::supervisor::{DedupOracle, ReviewOracle, Supervisor, SupervisorError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drover_core::{
    AgentEvent, AgentResult, Analysis, Assessment, BackoffAdvice, ExecutorInstance, InstanceId,
    Issue, IssueStatus, ReviewCheckpoint,
};
use drover_store::{
    Comment, DependencyEdge, EventCleanup, EventFilter, IssueStore, NewIssue, StoreError,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Scriptable supervisor: returns the configured analysis, or an error
/// when none is configured.
#[derive(Default)]
pub struct FakeSupervisor {
    analysis: Mutex<Option<Analysis>>,
    assessment: Mutex<Assessment>,
    backoff: Mutex<Option<BackoffAdvice>>,
    pub analyze_calls: AtomicUsize,
}

impl FakeSupervisor {
    /// Analysis that confirms completion.
    pub fn completed() -> Self {
        Self {
            analysis: Mutex::new(Some(Analysis {
                completed: true,
                summary: "All acceptance criteria satisfied.".to_string(),
                ..Analysis::default()
            })),
            ..Self::default()
        }
    }

    /// Analysis that reports incomplete work.
    pub fn incomplete(summary: &str) -> Self {
        Self {
            analysis: Mutex::new(Some(Analysis {
                completed: false,
                summary: summary.to_string(),
                ..Analysis::default()
            })),
            ..Self::default()
        }
    }

    /// Analyzer that always errors.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_analysis(self, analysis: Analysis) -> Self {
        *self.analysis.lock() = Some(analysis);
        self
    }

    pub fn with_backoff(self, advice: BackoffAdvice) -> Self {
        *self.backoff.lock() = Some(advice);
        self
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    async fn assess_issue(&self, _issue: &Issue) -> Result<Assessment, SupervisorError> {
        Ok(self.assessment.lock().clone())
    }

    async fn analyze_execution_result(
        &self,
        _issue: &Issue,
        _result: &AgentResult,
    ) -> Result<Analysis, SupervisorError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis
            .lock()
            .clone()
            .ok_or_else(|| SupervisorError::Unavailable("fake analyzer down".to_string()))
    }

    async fn recommend_backoff(
        &self,
        _issue: &Issue,
        _result: &AgentResult,
    ) -> Result<Option<BackoffAdvice>, SupervisorError> {
        Ok(self.backoff.lock().clone())
    }
}

/// Oracle that marks the configured titles duplicates and passes the rest
/// through, or fails outright.
#[derive(Default)]
pub struct FakeDedupOracle {
    pub fail: bool,
    pub duplicate_titles: BTreeSet<String>,
    pub calls: AtomicUsize,
}

impl FakeDedupOracle {
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with_duplicates(titles: &[&str]) -> Self {
        Self {
            duplicate_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl DedupOracle for FakeDedupOracle {
    async fn dedup(&self, candidates: &[DedupCandidate]) -> Result<DedupOutcome, SupervisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SupervisorError::Unavailable("fake oracle down".to_string()));
        }
        let mut outcome = DedupOutcome::default();
        for candidate in candidates {
            let is_duplicate = self.duplicate_titles.contains(&candidate.title);
            outcome.decisions.push(DedupDecision {
                candidate_title: candidate.title.clone(),
                is_duplicate,
                duplicate_of: is_duplicate.then(|| "drv-existing".to_string()),
                confidence: if is_duplicate { 0.95 } else { 0.8 },
                reasoning: "scripted".to_string(),
            });
            if !is_duplicate {
                outcome.unique.push(candidate.clone());
            }
        }
        outcome.stats = DedupStats {
            total: candidates.len(),
            unique: outcome.unique.len(),
            duplicates: candidates.len() - outcome.unique.len(),
            within_batch_duplicates: 0,
            comparisons: candidates.len(),
            ai_calls: 1,
            processing_time_ms: 1,
        };
        Ok(outcome)
    }
}

/// Gate factory with scripted applicability, construction, and verdict.
pub struct FakeGateFactory {
    pub applicable: bool,
    pub build_fails: bool,
    pub pass: bool,
    pub runs: std::sync::Arc<AtomicUsize>,
}

impl FakeGateFactory {
    pub fn passing() -> Self {
        Self {
            applicable: true,
            build_fails: false,
            pass: true,
            runs: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self { pass: false, ..Self::passing() }
    }

    pub fn not_applicable() -> Self {
        Self { applicable: false, ..Self::passing() }
    }

    pub fn broken() -> Self {
        Self { build_fails: true, ..Self::passing() }
    }
}

impl GateRunnerFactory for FakeGateFactory {
    fn applicable(&self, _working_dir: &Path) -> bool {
        self.applicable
    }

    fn build(&self, _working_dir: &Path) -> Result<Box<dyn GateRunner>, GateError> {
        if self.build_fails {
            return Err(GateError::Construction("scripted construction failure".to_string()));
        }
        Ok(Box::new(FakeGateRunner { pass: self.pass, runs: std::sync::Arc::clone(&self.runs) }))
    }
}

#[derive(Debug)]
pub struct FakeGateRunner {
    pass: bool,
    runs: std::sync::Arc<AtomicUsize>,
}

#[async_trait]
impl GateRunner for FakeGateRunner {
    async fn run(&self, _token: &CancellationToken) -> Result<GateReport, GateError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.pass {
            Ok(GateReport {
                all_passed: true,
                gates_run: vec!["fake".to_string()],
                failures: Vec::new(),
            })
        } else {
            Ok(GateReport {
                all_passed: false,
                gates_run: vec!["fake".to_string()],
                failures: vec![GateFailure {
                    name: "fake".to_string(),
                    detail: "scripted gate failure".to_string(),
                }],
            })
        }
    }
}

/// Monitor returning a fixed set of findings, or a scripted failure.
pub struct StaticMonitor {
    pub monitor_name: String,
    pub monitor_category: String,
    pub issues: Vec<HealthIssue>,
    pub fail: bool,
}

impl StaticMonitor {
    pub fn healthy(name: &str, category: &str) -> Self {
        Self {
            monitor_name: name.to_string(),
            monitor_category: category.to_string(),
            issues: Vec::new(),
            fail: false,
        }
    }

    pub fn finding(name: &str, category: &str, issues: Vec<HealthIssue>) -> Self {
        Self { issues, ..Self::healthy(name, category) }
    }

    pub fn failing(name: &str, category: &str) -> Self {
        Self { fail: true, ..Self::healthy(name, category) }
    }
}

#[async_trait]
impl HealthMonitor for StaticMonitor {
    fn name(&self) -> &str {
        &self.monitor_name
    }

    fn category(&self) -> &str {
        &self.monitor_category
    }

    async fn check(&self, _token: &CancellationToken) -> Result<CheckResult, MonitorError> {
        if self.fail {
            return Err(MonitorError::Failed("scripted monitor failure".to_string()));
        }
        Ok(CheckResult { issues_found: self.issues.clone() })
    }
}

/// Review oracle with a fixed verdict.
pub struct FakeReviewOracle {
    pub warranted: bool,
    pub calls: AtomicUsize,
}

impl FakeReviewOracle {
    pub fn approving() -> Self {
        Self { warranted: true, calls: AtomicUsize::new(0) }
    }

    pub fn declining() -> Self {
        Self { warranted: false, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ReviewOracle for FakeReviewOracle {
    async fn review_warranted(
        &self,
        metrics: &DiffMetrics,
    ) -> Result<ReviewDecision, SupervisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReviewDecision {
            warranted: self.warranted,
            reason: "scripted".to_string(),
            scope: format!("{} files since {}", metrics.files_changed, metrics.base_sha.as_deref().unwrap_or("start")),
        })
    }
}

/// Store whose every operation fails, for best-effort failure-path tests.
pub struct FailingStore;

macro_rules! fail {
    () => {
        Err(StoreError::Backend("injected failure".to_string()))
    };
}

#[async_trait]
impl IssueStore for FailingStore {
    async fn create_issue(&self, _new: NewIssue) -> Result<Issue, StoreError> {
        fail!()
    }
    async fn get_issue(&self, _id: &str) -> Result<Issue, StoreError> {
        fail!()
    }
    async fn next_ready_issue(&self) -> Result<Option<Issue>, StoreError> {
        fail!()
    }
    async fn claim_issue(&self, _id: &str, _instance: &InstanceId) -> Result<bool, StoreError> {
        fail!()
    }
    async fn release_issue(&self, _id: &str, _instance: &InstanceId) -> Result<(), StoreError> {
        fail!()
    }
    async fn close_issue(&self, _id: &str, _summary: &str, _actor: &str) -> Result<(), StoreError> {
        fail!()
    }
    async fn update_status(&self, _id: &str, _status: IssueStatus) -> Result<(), StoreError> {
        fail!()
    }
    async fn add_label(&self, _id: &str, _label: &str) -> Result<(), StoreError> {
        fail!()
    }
    async fn get_labels(&self, _id: &str) -> Result<Vec<String>, StoreError> {
        fail!()
    }
    async fn add_comment(&self, _id: &str, _author: &str, _body: &str) -> Result<(), StoreError> {
        fail!()
    }
    async fn get_comments(&self, _id: &str) -> Result<Vec<Comment>, StoreError> {
        fail!()
    }
    async fn add_dependency(&self, _edge: DependencyEdge) -> Result<(), StoreError> {
        fail!()
    }
    async fn get_dependencies(
        &self,
        _id: &str,
        _edge_type: &str,
    ) -> Result<Vec<String>, StoreError> {
        fail!()
    }
    async fn get_dependents(&self, _id: &str, _edge_type: &str) -> Result<Vec<String>, StoreError> {
        fail!()
    }
    async fn store_agent_event(&self, _event: AgentEvent) -> Result<(), StoreError> {
        fail!()
    }
    async fn get_agent_events(&self, _filter: EventFilter) -> Result<Vec<AgentEvent>, StoreError> {
        fail!()
    }
    async fn delete_agent_events(&self, _cleanup: EventCleanup) -> Result<u64, StoreError> {
        fail!()
    }
    async fn register_instance(&self, _instance: ExecutorInstance) -> Result<(), StoreError> {
        fail!()
    }
    async fn heartbeat(&self, _id: &InstanceId, _at: DateTime<Utc>) -> Result<(), StoreError> {
        fail!()
    }
    async fn mark_stopped(&self, _id: &InstanceId) -> Result<(), StoreError> {
        fail!()
    }
    async fn list_instances(&self) -> Result<Vec<ExecutorInstance>, StoreError> {
        fail!()
    }
    async fn reap_stale_instances(&self, _cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        fail!()
    }
    async fn save_review_checkpoint(
        &self,
        _checkpoint: ReviewCheckpoint,
        _review_id: &str,
    ) -> Result<(), StoreError> {
        fail!()
    }
    async fn latest_review_checkpoint(
        &self,
    ) -> Result<Option<(ReviewCheckpoint, String)>, StoreError> {
        fail!()
    }
}
