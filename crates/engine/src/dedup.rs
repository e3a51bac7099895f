// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplication gateway.
//!
//! Discovered issues pass through an AI dedup oracle before being filed.
//! The gateway bounds batch sizes, maps the supervisor's stringly
//! candidate shape into the issue model, and contains oracle failures by
//! returning an empty survivor list: losing discoveries is safer than
//! amplifying model noise into the tracker.

use crate::supervisor::DedupOracle;
use crate::writer::EventWriter;
use drover_core::{DiscoveredIssue, EventType, Issue, IssueType, Priority, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Issue-shaped candidate, mapped from the analysis shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupCandidate {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub issue_type: IssueType,
}

/// Map one discovered issue into issue shape: "P0".."P3" to priorities,
/// free-form type strings to the type enum, unknowns to defaults.
pub fn map_candidate(discovered: &DiscoveredIssue) -> DedupCandidate {
    DedupCandidate {
        title: discovered.title.clone(),
        description: discovered.description.clone(),
        priority: Priority::parse_label(&discovered.priority),
        issue_type: IssueType::parse_label(&discovered.issue_type),
    }
}

/// One per-candidate verdict from the oracle. `duplicate_of` names either
/// an existing issue id or a within-batch anchor (`candidate_N`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupDecision {
    pub candidate_title: String,
    pub is_duplicate: bool,
    #[serde(default)]
    pub duplicate_of: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub within_batch_duplicates: usize,
    pub comparisons: usize,
    pub ai_calls: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupOutcome {
    pub unique: Vec<DedupCandidate>,
    pub decisions: Vec<DedupDecision>,
    pub stats: DedupStats,
}

pub struct DedupGateway {
    oracle: Arc<dyn DedupOracle>,
    writer: EventWriter,
    batch_size: usize,
}

impl DedupGateway {
    pub fn new(oracle: Arc<dyn DedupOracle>, writer: EventWriter, batch_size: usize) -> Self {
        Self { oracle, writer, batch_size: batch_size.max(1) }
    }

    /// Run one batch for `issue`'s discoveries and return the survivors.
    pub async fn filter(&self, issue: &Issue, discovered: &[DiscoveredIssue]) -> Vec<DedupCandidate> {
        if discovered.is_empty() {
            return Vec::new();
        }

        let batch = &discovered[..discovered.len().min(self.batch_size)];
        let dropped = discovered.len() - batch.len();
        let mut started = self
            .writer
            .event(
                EventType::DeduplicationBatchStarted,
                &issue.id,
                format!("deduplicating {} discovered issues", batch.len()),
            )
            .with_field("candidates", batch.len());
        if dropped > 0 {
            started = started
                .with_severity(Severity::Warning)
                .with_field("dropped", dropped)
                .with_field("batch_size", self.batch_size);
        }
        self.writer.emit(started);

        let candidates: Vec<DedupCandidate> = batch.iter().map(map_candidate).collect();
        let start = Instant::now();
        match self.oracle.dedup(&candidates).await {
            Ok(outcome) => {
                for decision in &outcome.decisions {
                    let mut event = self
                        .writer
                        .event(
                            EventType::DeduplicationDecision,
                            &issue.id,
                            format!(
                                "{}: {}",
                                if decision.is_duplicate { "duplicate" } else { "unique" },
                                decision.candidate_title
                            ),
                        )
                        .with_field("candidate_title", decision.candidate_title.clone())
                        .with_field("is_duplicate", decision.is_duplicate)
                        .with_field("confidence", decision.confidence)
                        .with_field("reasoning", decision.reasoning.clone());
                    if let Some(duplicate_of) = &decision.duplicate_of {
                        event = event.with_field("duplicate_of", duplicate_of.clone());
                    }
                    self.writer.emit(event);
                }

                let stats = outcome.stats;
                self.writer.emit(
                    self.writer
                        .event(
                            EventType::DeduplicationBatchCompleted,
                            &issue.id,
                            format!("{} unique of {} candidates", stats.unique, stats.total),
                        )
                        .with_field("total", stats.total)
                        .with_field("unique", stats.unique)
                        .with_field("duplicates", stats.duplicates)
                        .with_field("within_batch_duplicates", stats.within_batch_duplicates)
                        .with_field("comparisons", stats.comparisons)
                        .with_field("ai_calls", stats.ai_calls)
                        .with_field("processing_time_ms", stats.processing_time_ms),
                );
                outcome.unique
            }
            Err(err) => {
                tracing::error!(issue = %issue.id, error = %err, "dedup oracle failed");
                self.writer.emit(
                    self.writer
                        .event(
                            EventType::DeduplicationBatchCompleted,
                            &issue.id,
                            "deduplication failed, dropping discovered issues",
                        )
                        .with_severity(Severity::Error)
                        .with_field("error", err.to_string())
                        .with_field(
                            "processing_time_ms",
                            start.elapsed().as_millis() as u64,
                        ),
                );
                // No survivors on failure: the parent close proceeds
                // without filing anything.
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
