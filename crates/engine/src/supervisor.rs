// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI supervisor contracts.
//!
//! The supervisor is an external collaborator; the engine only depends on
//! these traits. Implementations wrap whatever model access the embedder
//! has. Every method is a suspension point and failures are survivable:
//! the processor degrades to "analysis absent", the dedup gateway to "no
//! survivors", the review sweeper to "no review".

use crate::dedup::{DedupCandidate, DedupOutcome};
use crate::review::{DiffMetrics, ReviewDecision};
use async_trait::async_trait;
use drover_core::{AgentResult, Analysis, Assessment, BackoffAdvice, Issue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("supervisor unavailable: {0}")]
    Unavailable(String),
    #[error("malformed supervisor output: {0}")]
    Malformed(String),
}

/// Assessment and post-execution analysis.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Pre-execution read of the issue, used to enrich the agent prompt.
    async fn assess_issue(&self, issue: &Issue) -> Result<Assessment, SupervisorError>;

    /// Judge one agent run against the issue's acceptance criteria.
    async fn analyze_execution_result(
        &self,
        issue: &Issue,
        result: &AgentResult,
    ) -> Result<Analysis, SupervisorError>;

    /// Optional backoff recommendation after a non-completed run.
    async fn recommend_backoff(
        &self,
        issue: &Issue,
        result: &AgentResult,
    ) -> Result<Option<BackoffAdvice>, SupervisorError>;
}

/// Duplicate detection over a batch of discovered-issue candidates.
#[async_trait]
pub trait DedupOracle: Send + Sync {
    async fn dedup(&self, candidates: &[DedupCandidate]) -> Result<DedupOutcome, SupervisorError>;
}

/// Decides whether accumulated changes warrant filing a review issue.
#[async_trait]
pub trait ReviewOracle: Send + Sync {
    async fn review_warranted(
        &self,
        metrics: &DiffMetrics,
    ) -> Result<ReviewDecision, SupervisorError>;
}
