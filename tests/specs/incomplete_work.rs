// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incomplete-work retry and escalation specs.

use crate::prelude::*;
use drover_engine::SUPERVISOR_ACTOR;

#[tokio::test]
async fn first_incomplete_reopens_second_escalates() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::incomplete("tests missing"))), None);
    let issue = claimed(&fixture.store, open_task("flaky feature")).await;

    // First attempt: comment and back to open.
    let outcome = fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.retried);
    assert!(!outcome.escalated);

    let reopened = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(reopened.status, IssueStatus::Open);
    let comments = fixture.store.get_comments(&issue.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author, SUPERVISOR_ACTOR);
    assert!(comments[0].body.contains("Incomplete Work Detected (Attempt #1)"));

    // Second attempt: escalation to a human.
    assert!(fixture
        .store
        .claim_issue(&issue.id, &InstanceId::from_string(EXECUTOR))
        .await
        .unwrap());
    let issue = fixture.store.get_issue(&issue.id).await.unwrap();
    let outcome = fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    assert!(outcome.escalated);
    assert!(!outcome.retried);

    let blocked = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(blocked.status, IssueStatus::Blocked);
    assert!(blocked.labels.contains("needs-human-review"));

    let comments = fixture.store.get_comments(&issue.id).await.unwrap();
    let escalation = comments.last().unwrap();
    assert!(escalation.body.contains("Incomplete Work Escalated"));
    assert!(escalation.body.contains("attempted 2 times"));
}

#[tokio::test]
async fn incomplete_runs_skip_gates_with_reason() {
    let fixture = processor(
        Some(Arc::new(FakeSupervisor::incomplete("half done"))),
        Some(Arc::new(FakeGateFactory::passing())),
    );
    let issue = claimed(&fixture.store, open_task("half-finished")).await;

    fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    let skipped = events_of(&fixture.store, EventType::QualityGatesSkipped).await;
    assert_eq!(skipped.len(), 1);
    assert_eq!(
        skipped[0].data.get("reason"),
        Some(&serde_json::Value::from("agent execution failed"))
    );
    assert!(events_of(&fixture.store, EventType::QualityGatesStarted).await.is_empty());
}

#[tokio::test]
async fn analyzer_outage_does_not_block_a_failing_run() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::failing())), None);
    let issue = claimed(&fixture.store, open_task("unlucky")).await;

    let outcome = fixture
        .processor
        .process(&issue, &agent_failure(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    // Analysis absent, agent failed: retry comment still lands.
    assert!(outcome.retried);
    let comments = fixture.store.get_comments(&issue.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains("Attempt #1"));
}
