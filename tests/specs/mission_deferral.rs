// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission gate deferral specs.
//!
//! Missions (epics with subtype `mission`) never run inline gates: the
//! processor labels them for the QA worker, emits exactly one deferral
//! event, and leaves them in-progress.

use crate::prelude::*;

#[tokio::test]
async fn mission_defers_gates_and_stays_in_progress() {
    let fixture = processor(
        Some(Arc::new(FakeSupervisor::completed())),
        Some(Arc::new(FakeGateFactory::passing())),
    );
    let issue = claimed(&fixture.store, mission("stabilize the parser")).await;
    assert!(issue.is_mission());

    let outcome = fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    // gates_passed without completion is the deferral signature.
    assert!(outcome.gates_passed);
    assert!(!outcome.completed);
    assert!(!outcome.retried);
    assert!(!outcome.escalated);

    let stored = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(stored.status, IssueStatus::InProgress);
    assert!(stored.labels.contains("needs-quality-gates"));

    let deferred = events_of(&fixture.store, EventType::QualityGatesDeferred).await;
    assert_eq!(deferred.len(), 1);
    assert_eq!(
        deferred[0].data.get("reason"),
        Some(&serde_json::Value::from("delegated-to-qa-worker"))
    );
    assert_eq!(
        deferred[0].data.get("mission_id"),
        Some(&serde_json::Value::from(issue.id.clone()))
    );

    // No gate-run events of any kind.
    assert!(events_of(&fixture.store, EventType::QualityGatesStarted).await.is_empty());
    assert!(events_of(&fixture.store, EventType::QualityGatesCompleted).await.is_empty());
}

#[tokio::test]
async fn plain_epic_is_not_deferred() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::completed())), None);
    let issue = claimed(
        &fixture.store,
        NewIssue {
            title: "big refactor".to_string(),
            issue_type: IssueType::Epic,
            ..NewIssue::default()
        },
    )
    .await;

    let outcome = fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    assert!(outcome.completed);
    assert_eq!(fixture.store.get_issue(&issue.id).await.unwrap().status, IssueStatus::Closed);
    assert!(events_of(&fixture.store, EventType::QualityGatesDeferred).await.is_empty());
}

#[tokio::test]
async fn failed_mission_run_goes_through_incomplete_handling() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::completed())), None);
    let issue = claimed(&fixture.store, mission("doomed mission")).await;

    let outcome = fixture
        .processor
        .process(&issue, &agent_failure(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    // Failure wins over deferral; the mission is reopened, not labeled.
    assert!(outcome.retried);
    let stored = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(stored.status, IssueStatus::Open);
    assert!(!stored.labels.contains("needs-quality-gates"));
    assert!(events_of(&fixture.store, EventType::QualityGatesDeferred).await.is_empty());
}
