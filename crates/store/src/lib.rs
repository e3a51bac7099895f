// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-store: the issue-store contract and an in-memory implementation.
//!
//! The executor never locks across instances; fleet correctness rests on
//! the store's atomic primitives (claim, label-add, close, checkpoint
//! save). Any backend that honors [`IssueStore`] can drive the engine; the
//! bundled [`MemoryStore`] honors it with a single process-wide lock.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drover_core::{
    AgentEvent, EventType, ExecutorInstance, InstanceId, Issue, IssueStatus, IssueType, Priority,
    ReviewCheckpoint,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The dependency edge type the engine consumes: `child` was discovered
/// while an agent worked on `parent`.
pub const DISCOVERED_FROM: &str = "discovered-from";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("issue not found: {0}")]
    NotFound(String),
    #[error("issue {id} is claimed by {holder}")]
    NotClaimHolder { id: String, holder: String },
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: IssueStatus,
        to: IssueStatus,
    },
    #[error("dependency {child} -> {parent} would form a cycle")]
    DependencyCycle { child: String, parent: String },
    #[error("dependency {child} -> {parent} already exists")]
    DuplicateDependency { child: String, parent: String },
    #[error("store backend: {0}")]
    Backend(String),
}

impl From<drover_core::TransitionError> for StoreError {
    fn from(err: drover_core::TransitionError) -> Self {
        StoreError::InvalidTransition { id: err.id, from: err.from, to: err.to }
    }
}

/// Directed, typed dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub child: String,
    pub parent: String,
    pub edge_type: String,
}

impl DependencyEdge {
    pub fn discovered_from(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            edge_type: DISCOVERED_FROM.to_string(),
        }
    }
}

/// Comment on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input shape for `create_issue`; the store assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub issue_type: IssueType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Query filter for stored agent events. All clauses are conjunctive;
/// `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub issue_id: Option<String>,
    pub event_type: Option<EventType>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Retention clauses for event cleanup. Caps keep the newest events.
#[derive(Debug, Clone, Default)]
pub struct EventCleanup {
    pub older_than: Option<DateTime<Utc>>,
    pub per_issue_cap: Option<usize>,
    pub global_cap: Option<usize>,
}

/// Persistence contract the executor requires.
///
/// `claim_issue` is the one operation whose atomicity the whole fleet
/// leans on: of N concurrent claims for the same open issue, exactly one
/// returns `true`.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn create_issue(&self, new: NewIssue) -> Result<Issue, StoreError>;
    async fn get_issue(&self, id: &str) -> Result<Issue, StoreError>;

    /// Next claimable issue by priority then age, if any.
    async fn next_ready_issue(&self) -> Result<Option<Issue>, StoreError>;

    /// Atomically claim an open issue. `false` means somebody else won.
    async fn claim_issue(&self, id: &str, instance: &InstanceId) -> Result<bool, StoreError>;

    /// Return a claimed issue to open. Only the claim holder may release.
    async fn release_issue(&self, id: &str, instance: &InstanceId) -> Result<(), StoreError>;

    /// Close with a summary comment attributed to `actor`.
    async fn close_issue(&self, id: &str, summary: &str, actor: &str) -> Result<(), StoreError>;

    /// Validated status transition outside the claim/release/close paths
    /// (escalation to blocked, reopening).
    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<(), StoreError>;

    async fn add_label(&self, id: &str, label: &str) -> Result<(), StoreError>;
    async fn get_labels(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn add_comment(&self, id: &str, author: &str, body: &str) -> Result<(), StoreError>;
    async fn get_comments(&self, id: &str) -> Result<Vec<Comment>, StoreError>;

    /// Insert an edge. Self-edges and cycles are rejected.
    async fn add_dependency(&self, edge: DependencyEdge) -> Result<(), StoreError>;

    /// Parents of `id` under `edge_type` (edges where `id` is the child).
    async fn get_dependencies(&self, id: &str, edge_type: &str) -> Result<Vec<String>, StoreError>;

    /// Children of `id` under `edge_type` (edges where `id` is the parent).
    async fn get_dependents(&self, id: &str, edge_type: &str) -> Result<Vec<String>, StoreError>;

    async fn store_agent_event(&self, event: AgentEvent) -> Result<(), StoreError>;
    async fn get_agent_events(&self, filter: EventFilter) -> Result<Vec<AgentEvent>, StoreError>;

    /// Apply retention and return the number of events deleted.
    async fn delete_agent_events(&self, cleanup: EventCleanup) -> Result<u64, StoreError>;

    async fn register_instance(&self, instance: ExecutorInstance) -> Result<(), StoreError>;
    async fn heartbeat(&self, id: &InstanceId, at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn mark_stopped(&self, id: &InstanceId) -> Result<(), StoreError>;
    async fn list_instances(&self) -> Result<Vec<ExecutorInstance>, StoreError>;

    /// Mark running instances with a heartbeat before `cutoff` as stopped;
    /// returns how many were reaped.
    async fn reap_stale_instances(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Persist the checkpoint and the review issue id as one atomic write.
    async fn save_review_checkpoint(
        &self,
        checkpoint: ReviewCheckpoint,
        review_id: &str,
    ) -> Result<(), StoreError>;
    async fn latest_review_checkpoint(
        &self,
    ) -> Result<Option<(ReviewCheckpoint, String)>, StoreError>;
}
