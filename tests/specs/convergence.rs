// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission convergence specs over a store populated through the public
//! primitives (validated edges, real claim/close transitions).

use crate::prelude::*;
use drover_engine::{mission_converged, mission_discoveries, mission_exploded, mission_root};

async fn create(store: &MemoryStore, title: &str) -> String {
    store.create_issue(open_task(title)).await.unwrap().id
}

async fn link(store: &MemoryStore, child: &str, parent: &str) {
    store
        .add_dependency(DependencyEdge::discovered_from(child, parent))
        .await
        .unwrap();
}

async fn close(store: &MemoryStore, id: &str) {
    assert!(store.claim_issue(id, &InstanceId::from_string(EXECUTOR)).await.unwrap());
    store.close_issue(id, "done", EXECUTOR).await.unwrap();
}

/// mission <- bug1 <- bug1a, mission <- refactor <- {test1, test2},
/// mission <- docs.
async fn discovery_tree(store: &MemoryStore) -> (String, String, String, String) {
    let mission = store.create_issue(mission("mission")).await.unwrap().id;
    let bug1 = create(store, "bug1").await;
    let bug1a = create(store, "bug1a").await;
    let refactor = create(store, "refactor").await;
    let test1 = create(store, "test1").await;
    let test2 = create(store, "test2").await;
    let docs = create(store, "docs").await;

    link(store, &bug1, &mission).await;
    link(store, &bug1a, &bug1).await;
    link(store, &refactor, &mission).await;
    link(store, &test1, &refactor).await;
    link(store, &test2, &refactor).await;
    link(store, &docs, &mission).await;

    close(store, &bug1a).await;
    close(store, &test1).await;
    close(store, &test2).await;
    close(store, &docs).await;

    (mission, bug1, bug1a, refactor)
}

#[tokio::test]
async fn convergence_flips_when_the_last_discovery_closes() {
    let store = MemoryStore::new();
    let (mission, bug1, _, refactor) = discovery_tree(&store).await;

    // bug1 and refactor are still open.
    assert!(!mission_converged(&store, &mission).await.unwrap());

    close(&store, &bug1).await;
    assert!(!mission_converged(&store, &mission).await.unwrap());

    close(&store, &refactor).await;
    assert!(mission_converged(&store, &mission).await.unwrap());
}

#[tokio::test]
async fn root_resolves_from_any_depth() {
    let store = MemoryStore::new();
    let (mission, bug1, bug1a, _) = discovery_tree(&store).await;

    assert_eq!(mission_root(&store, &bug1a).await.unwrap().id, mission);
    assert_eq!(mission_root(&store, &bug1).await.unwrap().id, mission);
    assert_eq!(mission_root(&store, &mission).await.unwrap().id, mission);

    // Idempotence: the root of the root is the root.
    let root = mission_root(&store, &bug1a).await.unwrap();
    assert_eq!(mission_root(&store, &root.id).await.unwrap().id, root.id);
}

#[tokio::test]
async fn discovery_set_is_deduplicated_and_complete() {
    let store = MemoryStore::new();
    let (mission, ..) = discovery_tree(&store).await;
    let discoveries = mission_discoveries(&store, &mission).await.unwrap();
    assert_eq!(discoveries.len(), 6);
}

#[tokio::test]
async fn explosion_threshold_is_exclusive() {
    let store = MemoryStore::new();
    let mission_id = store.create_issue(mission("wide mission")).await.unwrap().id;

    for i in 0..20 {
        let child = create(&store, &format!("discovery {i}")).await;
        link(&store, &child, &mission_id).await;
    }
    assert!(!mission_exploded(&store, &mission_id, 20).await.unwrap());

    for i in 20..25 {
        let child = create(&store, &format!("discovery {i}")).await;
        link(&store, &child, &mission_id).await;
    }
    assert!(mission_exploded(&store, &mission_id, 20).await.unwrap());
}

#[tokio::test]
async fn empty_mission_never_converges() {
    let store = MemoryStore::new();
    let mission_id = store.create_issue(mission("fresh mission")).await.unwrap().id;
    assert!(!mission_converged(&store, &mission_id).await.unwrap());
}
