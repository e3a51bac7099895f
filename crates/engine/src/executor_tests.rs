// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::health::{HealthIssue, HealthSeverity};
use crate::test_support::{FakeSupervisor, StaticMonitor};
use drover_core::{IssueBuilder, IssueStatus};
use drover_store::{EventFilter, MemoryStore, NewIssue};
use tempfile::TempDir;

/// Runs the built prompt through `sh -c`; issue descriptions double as
/// the scripted agent behavior (the title renders as a `#` comment).
fn sh_dialect() -> AgentDialect {
    AgentDialect {
        name: "sh".to_string(),
        program: "sh".to_string(),
        bypass_flag: "-c".to_string(),
        stream_json_flag: None,
        extra_args: Vec::new(),
    }
}

struct Fixture {
    store: MemoryStore,
    executor: Executor,
    _dir: TempDir,
}

fn fixture(supervisor: Option<Arc<dyn Supervisor>>, health: HealthRegistry) -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let deps = ExecutorDeps {
        store: Arc::new(store.clone()),
        dialect: sh_dialect(),
        supervisor,
        dedup_oracle: None,
        gates: None,
        sandbox: None,
        review_oracle: None,
        health,
    };
    let config = ExecutorConfig {
        working_dir: dir.path().to_path_buf(),
        agent_timeout_ms: 10_000,
        ..ExecutorConfig::default()
    };
    let executor = Executor::new(deps, config, CancellationToken::new(), SystemClock);
    Fixture { store, executor, _dir: dir }
}

async fn seed_scripted_issue(store: &MemoryStore, title: &str, script: &str) -> Issue {
    store
        .create_issue(NewIssue {
            title: title.to_string(),
            description: script.to_string(),
            issue_type: drover_core::IssueType::Task,
            ..NewIssue::default()
        })
        .await
        .unwrap()
}

async fn events_of(fixture: &Fixture, event_type: EventType) -> Vec<drover_core::AgentEvent> {
    fixture
        .store
        .get_agent_events(EventFilter { event_type: Some(event_type), ..Default::default() })
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_run_closes_the_issue() {
    let fixture = fixture(Some(Arc::new(FakeSupervisor::completed())), HealthRegistry::new());
    let issue = seed_scripted_issue(&fixture.store, "echo task", "echo working; true").await;
    let token = CancellationToken::new();

    let outcome = fixture.executor.run_once(&token).await.unwrap();
    fixture.executor.writer.drain().await;

    let processed = match outcome {
        TickOutcome::Processed(processed) => processed,
        other => panic!("expected Processed, got {other:?}"),
    };
    assert!(processed.completed);

    let closed = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(closed.status, IssueStatus::Closed);
    assert!(closed.closed_at.is_some());

    // Lifecycle events for the full cycle, exactly once each.
    for event_type in [
        EventType::IssueClaimed,
        EventType::AssessmentStarted,
        EventType::AssessmentCompleted,
        EventType::AgentSpawned,
        EventType::AgentCompleted,
        EventType::ResultsProcessingStarted,
        EventType::AnalysisStarted,
        EventType::AnalysisCompleted,
        EventType::QualityGatesSkipped,
        EventType::ResultsProcessingCompleted,
    ] {
        assert_eq!(events_of(&fixture, event_type).await.len(), 1, "{event_type}");
    }
}

#[tokio::test]
async fn empty_queue_is_idle() {
    let fixture = fixture(None, HealthRegistry::new());
    let outcome = fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Idle);
}

#[tokio::test]
async fn failed_agent_reopens_the_issue() {
    let fixture = fixture(Some(Arc::new(FakeSupervisor::completed())), HealthRegistry::new());
    let issue = seed_scripted_issue(&fixture.store, "doomed task", "exit 7").await;
    let token = CancellationToken::new();

    let outcome = fixture.executor.run_once(&token).await.unwrap();
    fixture.executor.writer.drain().await;

    let processed = match outcome {
        TickOutcome::Processed(processed) => processed,
        other => panic!("expected Processed, got {other:?}"),
    };
    assert!(!processed.completed);
    assert!(processed.retried);

    let reopened = fixture.store.get_issue(&issue.id).await.unwrap();
    assert_eq!(reopened.status, IssueStatus::Open);

    let completed = events_of(&fixture, EventType::AgentCompleted).await;
    assert_eq!(completed[0].data.get("exit_code"), Some(&serde_json::Value::from(7)));
}

#[tokio::test]
async fn timeout_is_processed_as_failure() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let deps = ExecutorDeps {
        store: Arc::new(store.clone()),
        dialect: sh_dialect(),
        supervisor: None,
        dedup_oracle: None,
        gates: None,
        sandbox: None,
        review_oracle: None,
        health: HealthRegistry::new(),
    };
    let config = ExecutorConfig {
        working_dir: dir.path().to_path_buf(),
        agent_timeout_ms: 100,
        ..ExecutorConfig::default()
    };
    let executor = Executor::new(deps, config, CancellationToken::new(), SystemClock);
    let issue = seed_scripted_issue(&store, "slow task", "sleep 30").await;
    let fixture = Fixture { store, executor, _dir: dir };

    let outcome = fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    fixture.executor.writer.drain().await;

    let processed = match outcome {
        TickOutcome::Processed(processed) => processed,
        other => panic!("expected Processed, got {other:?}"),
    };
    assert!(!processed.completed);
    assert_eq!(fixture.store.get_issue(&issue.id).await.unwrap().status, IssueStatus::Open);

    let completed = events_of(&fixture, EventType::AgentCompleted).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].severity, Severity::Error);
    assert_eq!(completed[0].data.get("reason"), Some(&serde_json::Value::from("timeout")));
}

#[tokio::test]
async fn cancelled_token_aborts_the_tick() {
    let fixture = fixture(None, HealthRegistry::new());
    let token = CancellationToken::new();
    token.cancel();
    let err = fixture.executor.run_once(&token).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn health_monitors_run_after_a_close() {
    let mut health = HealthRegistry::new();
    health.register(Arc::new(StaticMonitor::finding(
        "coverage",
        "quality",
        vec![HealthIssue {
            title: "coverage dropped".to_string(),
            description: String::new(),
            severity: HealthSeverity::Medium,
        }],
    )));
    let fixture = fixture(Some(Arc::new(FakeSupervisor::completed())), health);
    seed_scripted_issue(&fixture.store, "quick task", "true").await;

    fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    fixture.executor.writer.drain().await;

    assert_eq!(events_of(&fixture, EventType::HealthCheckCompleted).await.len(), 1);
    // The monitor's finding is now an open issue awaiting the next claim.
    let next = fixture.store.next_ready_issue().await.unwrap().unwrap();
    assert_eq!(next.title, "coverage dropped");
}

#[tokio::test]
async fn health_monitors_do_not_run_after_a_failure() {
    let mut health = HealthRegistry::new();
    health.register(Arc::new(StaticMonitor::finding(
        "coverage",
        "quality",
        vec![HealthIssue {
            title: "coverage dropped".to_string(),
            description: String::new(),
            severity: HealthSeverity::Medium,
        }],
    )));
    let fixture = fixture(Some(Arc::new(FakeSupervisor::completed())), health);
    seed_scripted_issue(&fixture.store, "doomed task", "exit 1").await;

    fixture.executor.run_once(&CancellationToken::new()).await.unwrap();
    fixture.executor.writer.drain().await;

    assert!(events_of(&fixture, EventType::HealthCheckCompleted).await.is_empty());
}

#[tokio::test]
async fn maintenance_reports_to_the_system_issue() {
    let fixture = fixture(None, HealthRegistry::new());
    fixture.executor.register().await.unwrap();

    fixture.executor.maintenance(&CancellationToken::new()).await.unwrap();
    fixture.executor.writer.drain().await;

    let instance_cleanup = events_of(&fixture, EventType::InstanceCleanupCompleted).await;
    assert_eq!(instance_cleanup.len(), 1);
    assert_eq!(instance_cleanup[0].issue_id, SYSTEM_ISSUE);

    let event_cleanup = events_of(&fixture, EventType::EventCleanupCompleted).await;
    assert_eq!(event_cleanup.len(), 1);
    assert_eq!(event_cleanup[0].issue_id, SYSTEM_ISSUE);
}

#[tokio::test]
async fn register_and_shutdown_manage_the_instance_row() {
    let fixture = fixture(None, HealthRegistry::new());
    fixture.executor.register().await.unwrap();

    let instances = fixture.store.list_instances().await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].status, drover_core::InstanceStatus::Running);

    fixture.executor.shutdown().await.unwrap();
    let instances = fixture.store.list_instances().await.unwrap();
    assert_eq!(instances[0].status, drover_core::InstanceStatus::Stopped);
}

#[test]
fn prompt_includes_issue_body_and_assessment() {
    let issue = IssueBuilder::new("drv-1")
        .title("fix the parser")
        .description("the parser drops lines")
        .acceptance_criteria("no lines dropped")
        .build();
    let assessment = Assessment {
        summary: "likely an off-by-one".to_string(),
        approach: Some("add a regression test first".to_string()),
        risks: vec!["buffer cap interactions".to_string()],
    };

    let prompt = build_prompt(&issue, Some(&assessment));
    assert!(prompt.contains("# fix the parser"));
    assert!(prompt.contains("the parser drops lines"));
    assert!(prompt.contains("no lines dropped"));
    assert!(prompt.contains("off-by-one"));
    assert!(prompt.contains("regression test"));
    assert!(prompt.contains("buffer cap interactions"));

    let bare = build_prompt(&issue, None);
    assert!(!bare.contains("Assessment"));
}
