// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory issue store.
//!
//! All tables live behind one process-wide lock, which makes every trait
//! operation trivially atomic. Issue ids are `drv-N` with a monotonic
//! counter so test assertions stay readable.

use crate::{
    Comment, DependencyEdge, EventCleanup, EventFilter, IssueStore, NewIssue, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drover_core::{
    AgentEvent, ExecutorInstance, InstanceId, InstanceStatus, Issue, IssueStatus,
    ReviewCheckpoint,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    seq: u64,
    issues: HashMap<String, Issue>,
    comments: HashMap<String, Vec<Comment>>,
    edges: Vec<DependencyEdge>,
    events: Vec<AgentEvent>,
    instances: HashMap<InstanceId, ExecutorInstance>,
    checkpoints: Vec<(ReviewCheckpoint, String)>,
}

impl Tables {
    fn issue(&self, id: &str) -> Result<&Issue, StoreError> {
        self.issues.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn issue_mut(&mut self, id: &str) -> Result<&mut Issue, StoreError> {
        self.issues.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Ancestors of `start` under `edge_type`, following child -> parent.
    fn ancestors(&self, start: &str, edge_type: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(current) = stack.pop() {
            for edge in self.edges.iter().filter(|e| e.edge_type == edge_type) {
                if edge.child == current && seen.insert(edge.parent.clone()) {
                    stack.push(edge.parent.clone());
                }
            }
        }
        seen
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events, for retention tests and diagnostics.
    pub fn event_count(&self) -> usize {
        self.tables.lock().events.len()
    }

    /// Insert a pre-built issue, keeping the given id and status.
    ///
    /// The create path always starts issues open; tests and importers need
    /// to seed in-progress or closed issues directly.
    pub fn seed_issue(&self, issue: Issue) {
        self.tables.lock().issues.insert(issue.id.clone(), issue);
    }

    /// Insert an edge without self-edge/cycle validation.
    ///
    /// The convergence engine defends against cycles the store should
    /// never produce; this is the only way to manufacture one.
    #[cfg(any(test, feature = "test-support"))]
    pub fn add_dependency_unchecked(&self, edge: DependencyEdge) {
        self.tables.lock().edges.push(edge);
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn create_issue(&self, new: NewIssue) -> Result<Issue, StoreError> {
        let mut tables = self.tables.lock();
        tables.seq += 1;
        let now = Utc::now();
        let issue = Issue {
            id: format!("drv-{}", tables.seq),
            title: new.title,
            description: new.description,
            status: IssueStatus::Open,
            priority: new.priority,
            issue_type: new.issue_type,
            subtype: new.subtype,
            acceptance_criteria: new.acceptance_criteria,
            labels: new.labels.into_iter().collect(),
            assignee: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        tables.issues.insert(issue.id.clone(), issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: &str) -> Result<Issue, StoreError> {
        self.tables.lock().issue(id).cloned()
    }

    async fn next_ready_issue(&self) -> Result<Option<Issue>, StoreError> {
        let tables = self.tables.lock();
        let mut ready: Vec<&Issue> =
            tables.issues.values().filter(|i| i.status == IssueStatus::Open).collect();
        ready.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at))
        });
        Ok(ready.first().map(|i| (*i).clone()))
    }

    async fn claim_issue(&self, id: &str, instance: &InstanceId) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        let issue = tables.issue_mut(id)?;
        if issue.status != IssueStatus::Open {
            return Ok(false);
        }
        issue.status = IssueStatus::InProgress;
        issue.assignee = Some(instance.as_str().to_string());
        issue.updated_at = Utc::now();
        Ok(true)
    }

    async fn release_issue(&self, id: &str, instance: &InstanceId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let issue = tables.issue_mut(id)?;
        match issue.assignee.as_deref() {
            Some(holder) if holder == instance.as_str() => {}
            Some(holder) => {
                return Err(StoreError::NotClaimHolder {
                    id: id.to_string(),
                    holder: holder.to_string(),
                })
            }
            None => {
                return Err(StoreError::NotClaimHolder {
                    id: id.to_string(),
                    holder: "nobody".to_string(),
                })
            }
        }
        issue.check_transition(IssueStatus::Open)?;
        issue.status = IssueStatus::Open;
        issue.assignee = None;
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn close_issue(&self, id: &str, summary: &str, actor: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let now = Utc::now();
        {
            let issue = tables.issue_mut(id)?;
            issue.check_transition(IssueStatus::Closed)?;
            issue.status = IssueStatus::Closed;
            issue.assignee = None;
            issue.closed_at = Some(now);
            issue.updated_at = now;
        }
        tables.comments.entry(id.to_string()).or_default().push(Comment {
            author: actor.to_string(),
            body: summary.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let issue = tables.issue_mut(id)?;
        issue.check_transition(status)?;
        issue.status = status;
        if status != IssueStatus::InProgress {
            issue.assignee = None;
        }
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn add_label(&self, id: &str, label: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let issue = tables.issue_mut(id)?;
        issue.labels.insert(label.to_string());
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn get_labels(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.issue(id)?.labels.iter().cloned().collect())
    }

    async fn add_comment(&self, id: &str, author: &str, body: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables.issue(id)?;
        tables.comments.entry(id.to_string()).or_default().push(Comment {
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_comments(&self, id: &str) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.lock();
        tables.issue(id)?;
        Ok(tables.comments.get(id).cloned().unwrap_or_default())
    }

    async fn add_dependency(&self, edge: DependencyEdge) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if edge.child == edge.parent {
            return Err(StoreError::DependencyCycle {
                child: edge.child,
                parent: edge.parent,
            });
        }
        if tables.edges.contains(&edge) {
            return Err(StoreError::DuplicateDependency {
                child: edge.child,
                parent: edge.parent,
            });
        }
        // The new edge closes a loop iff the child already sits above the
        // parent in the ancestor chain.
        if tables.ancestors(&edge.parent, &edge.edge_type).contains(&edge.child) {
            return Err(StoreError::DependencyCycle {
                child: edge.child,
                parent: edge.parent,
            });
        }
        tables.edges.push(edge);
        Ok(())
    }

    async fn get_dependencies(&self, id: &str, edge_type: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .edges
            .iter()
            .filter(|e| e.edge_type == edge_type && e.child == id)
            .map(|e| e.parent.clone())
            .collect())
    }

    async fn get_dependents(&self, id: &str, edge_type: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .edges
            .iter()
            .filter(|e| e.edge_type == edge_type && e.parent == id)
            .map(|e| e.child.clone())
            .collect())
    }

    async fn store_agent_event(&self, event: AgentEvent) -> Result<(), StoreError> {
        self.tables.lock().events.push(event);
        Ok(())
    }

    async fn get_agent_events(&self, filter: EventFilter) -> Result<Vec<AgentEvent>, StoreError> {
        let tables = self.tables.lock();
        let mut matched: Vec<AgentEvent> = tables
            .events
            .iter()
            .filter(|e| filter.issue_id.as_deref().map_or(true, |id| e.issue_id == id))
            .filter(|e| filter.event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| filter.after.map_or(true, |after| e.timestamp > after))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn delete_agent_events(&self, cleanup: EventCleanup) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let before = tables.events.len();

        if let Some(cutoff) = cleanup.older_than {
            tables.events.retain(|e| e.timestamp >= cutoff);
        }

        if let Some(cap) = cleanup.per_issue_cap {
            let mut per_issue: HashMap<String, usize> = HashMap::new();
            for event in &tables.events {
                *per_issue.entry(event.issue_id.clone()).or_default() += 1;
            }
            // Walk oldest-first, dropping until each issue fits its cap.
            let mut excess: HashMap<String, usize> = per_issue
                .into_iter()
                .filter(|(_, n)| *n > cap)
                .map(|(id, n)| (id, n - cap))
                .collect();
            tables.events.retain(|e| match excess.get_mut(&e.issue_id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    false
                }
                _ => true,
            });
        }

        if let Some(cap) = cleanup.global_cap {
            let len = tables.events.len();
            if len > cap {
                tables.events.drain(..len - cap);
            }
        }

        Ok((before - tables.events.len()) as u64)
    }

    async fn register_instance(&self, instance: ExecutorInstance) -> Result<(), StoreError> {
        self.tables.lock().instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    async fn heartbeat(&self, id: &InstanceId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let instance = tables
            .instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))?;
        instance.last_heartbeat = at;
        Ok(())
    }

    async fn mark_stopped(&self, id: &InstanceId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let instance = tables
            .instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))?;
        instance.status = InstanceStatus::Stopped;
        Ok(())
    }

    async fn list_instances(&self) -> Result<Vec<ExecutorInstance>, StoreError> {
        Ok(self.tables.lock().instances.values().cloned().collect())
    }

    async fn reap_stale_instances(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let mut reaped = 0;
        for instance in tables.instances.values_mut() {
            if instance.is_stale(cutoff) {
                instance.status = InstanceStatus::Stopped;
                reaped += 1;
            }
        }
        Ok(reaped)
    }

    async fn save_review_checkpoint(
        &self,
        checkpoint: ReviewCheckpoint,
        review_id: &str,
    ) -> Result<(), StoreError> {
        self.tables.lock().checkpoints.push((checkpoint, review_id.to_string()));
        Ok(())
    }

    async fn latest_review_checkpoint(
        &self,
    ) -> Result<Option<(ReviewCheckpoint, String)>, StoreError> {
        Ok(self.tables.lock().checkpoints.last().cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
