// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission convergence over the `discovered-from` DAG.
//!
//! A mission is the root of a discovery tree: walking `discovered-from`
//! edges child-to-parent from any member reaches it. The store rejects
//! cycles, but every walk here still carries a visited set; a corrupted
//! graph must degrade to a bounded traversal, not an infinite loop.

use drover_core::{Issue, IssueStatus};
use drover_store::{IssueStore, StoreError, DISCOVERED_FROM};
use std::collections::BTreeSet;

/// First ancestor with no `discovered-from` parent.
///
/// Idempotent: the root of a root is itself. On a cyclic graph the walk
/// stops at the first repeated node and returns the last issue seen.
pub async fn mission_root(store: &dyn IssueStore, id: &str) -> Result<Issue, StoreError> {
    let mut current = store.get_issue(id).await?;
    let mut visited = BTreeSet::from([current.id.clone()]);
    loop {
        let parents = store.get_dependencies(&current.id, DISCOVERED_FROM).await?;
        let Some(parent) = parents.first() else {
            return Ok(current);
        };
        if !visited.insert(parent.clone()) {
            return Ok(current);
        }
        current = store.get_issue(parent).await?;
    }
}

/// Transitive closure of discoveries under `root`, deduplicated, root
/// excluded.
pub async fn mission_discoveries(
    store: &dyn IssueStore,
    root: &str,
) -> Result<BTreeSet<String>, StoreError> {
    let mut discovered = BTreeSet::new();
    let mut frontier = vec![root.to_string()];
    while let Some(current) = frontier.pop() {
        for child in store.get_dependents(&current, DISCOVERED_FROM).await? {
            if child != root && discovered.insert(child.clone()) {
                frontier.push(child);
            }
        }
    }
    Ok(discovered)
}

/// A mission has converged when its discovery set is non-empty and every
/// member is closed. An empty set is not convergence; a mission that
/// produced no work has not done any.
pub async fn mission_converged(store: &dyn IssueStore, root: &str) -> Result<bool, StoreError> {
    let discoveries = mission_discoveries(store, root).await?;
    if discoveries.is_empty() {
        return Ok(false);
    }
    for id in &discoveries {
        if store.get_issue(id).await?.status != IssueStatus::Closed {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Scope-runaway check: strictly more discoveries than `threshold`.
/// Exactly at the threshold is not explosion.
pub async fn mission_exploded(
    store: &dyn IssueStore,
    root: &str,
    threshold: usize,
) -> Result<bool, StoreError> {
    Ok(mission_discoveries(store, root).await?.len() > threshold)
}

#[cfg(test)]
#[path = "missions_tests.rs"]
mod tests;
