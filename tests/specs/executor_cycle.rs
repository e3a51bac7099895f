// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full claim-to-close cycles with a real scripted agent process.

use crate::prelude::*;
use drover_agents::AgentDialect;
use drover_core::{ExecutorConfig, SystemClock};
use drover_engine::{Executor, ExecutorDeps, HealthRegistry, TickOutcome};
use tempfile::TempDir;

fn sh_dialect() -> AgentDialect {
    AgentDialect {
        name: "sh".to_string(),
        program: "sh".to_string(),
        bypass_flag: "-c".to_string(),
        stream_json_flag: None,
        extra_args: Vec::new(),
    }
}

struct CycleFixture {
    store: MemoryStore,
    executor: Executor,
    _dir: TempDir,
}

fn executor_over(store: &MemoryStore) -> CycleFixture {
    let dir = TempDir::new().unwrap();
    let deps = ExecutorDeps {
        store: Arc::new(store.clone()),
        dialect: sh_dialect(),
        supervisor: Some(Arc::new(FakeSupervisor::completed())),
        dedup_oracle: None,
        gates: None,
        sandbox: None,
        review_oracle: None,
        health: HealthRegistry::new(),
    };
    let config = ExecutorConfig {
        working_dir: dir.path().to_path_buf(),
        agent_timeout_ms: 10_000,
        ..ExecutorConfig::default()
    };
    let executor = Executor::new(deps, config, CancellationToken::new(), SystemClock);
    CycleFixture { store: store.clone(), executor, _dir: dir }
}

#[tokio::test]
async fn claim_spawn_wait_process_close() {
    let store = MemoryStore::new();
    let fixture = executor_over(&store);
    fixture.executor.register().await.unwrap();

    let issue = store
        .create_issue(NewIssue {
            title: "scripted agent".to_string(),
            // The description is the sh script; the title renders as a
            // comment line in the prompt.
            description: "echo did the work".to_string(),
            issue_type: IssueType::Task,
            ..NewIssue::default()
        })
        .await
        .unwrap();

    let outcome = fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    let processed = match outcome {
        TickOutcome::Processed(processed) => processed,
        other => panic!("expected Processed, got {other:?}"),
    };
    assert!(processed.completed);
    fixture.executor.shutdown().await.unwrap();

    let closed = store.get_issue(&issue.id).await.unwrap();
    assert_eq!(closed.status, IssueStatus::Closed);

    // Exactly one results_processing_completed per closed issue.
    let completed = events_of(&store, EventType::ResultsProcessingCompleted).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].issue_id, issue.id);

    // No event smuggles envelope fields into its data map.
    let all = store.get_agent_events(EventFilter::default()).await.unwrap();
    assert!(all.len() >= 8);
    for event in &all {
        assert!(!event.data.contains_key("issue_id"), "{}", event.event_type);
        assert!(!event.data.contains_key("executor_id"), "{}", event.event_type);
    }

    // Every gates started has a completed or the run was skipped.
    let started = events_of(&store, EventType::QualityGatesStarted).await.len();
    let finished = events_of(&store, EventType::QualityGatesCompleted).await.len()
        + events_of(&store, EventType::QualityGatesSkipped).await.len();
    assert!(finished >= started);
}

#[tokio::test]
async fn two_executors_contend_for_one_issue() {
    let store = MemoryStore::new();
    let first = executor_over(&store);
    let second = executor_over(&store);

    store
        .create_issue(NewIssue {
            title: "contended".to_string(),
            description: "true".to_string(),
            issue_type: IssueType::Task,
            ..NewIssue::default()
        })
        .await
        .unwrap();

    // Claim with the first executor's instance out of band, then tick the
    // second: the atomic claim makes it back off.
    let claimed = store
        .claim_issue("drv-1", first.executor.instance_id())
        .await
        .unwrap();
    assert!(claimed);

    let outcome = second.executor.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Idle);
}

#[tokio::test]
async fn captured_output_lands_in_the_agent_events() {
    let store = MemoryStore::new();
    let fixture = executor_over(&store);

    store
        .create_issue(NewIssue {
            title: "noisy agent".to_string(),
            description: "echo 'Read(src/lib.rs)'; echo 'error: something broke'; true"
                .to_string(),
            issue_type: IssueType::Task,
            ..NewIssue::default()
        })
        .await
        .unwrap();

    let outcome = fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    assert!(matches!(outcome, TickOutcome::Processed(p) if p.completed));
    fixture.executor.shutdown().await.unwrap();

    let tool_events = events_of(&store, EventType::AgentToolUse).await;
    assert_eq!(tool_events.len(), 2);
    let read = tool_events
        .iter()
        .find(|e| e.data.get("tool") == Some(&serde_json::Value::from("read")))
        .unwrap();
    assert_eq!(read.data.get("file"), Some(&serde_json::Value::from("src/lib.rs")));
    assert!(read.source_line.is_some());

    let error = tool_events.iter().find(|e| e.severity == Severity::Error).unwrap();
    assert_eq!(error.data.get("kind"), Some(&serde_json::Value::from("error_output")));
}
