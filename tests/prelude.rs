// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

pub use drover_core::{
    AgentResult, Analysis, EventType, InstanceId, Issue, IssueStatus, IssueType, Priority,
    Severity, WatchdogConfig, WatchdogState,
};
pub use drover_engine::test_support::{FakeDedupOracle, FakeGateFactory, FakeSupervisor};
pub use drover_engine::{
    DedupGateway, EventWriter, ProcessResult, ProcessorConfig, ResultsProcessor,
};
pub use drover_store::{
    DependencyEdge, EventFilter, IssueStore, MemoryStore, NewIssue, DISCOVERED_FROM,
};
pub use std::sync::Arc;
pub use tokio_util::sync::CancellationToken;

use drover_engine::{GateRunnerFactory, Supervisor};
use parking_lot::Mutex;
use std::path::PathBuf;

pub const EXECUTOR: &str = "exc-spec";

pub fn writer(store: &MemoryStore) -> EventWriter {
    EventWriter::new(
        Arc::new(store.clone()),
        InstanceId::from_string(EXECUTOR),
        CancellationToken::new(),
    )
}

pub struct ProcessorFixture {
    pub store: MemoryStore,
    pub writer: EventWriter,
    pub watchdog: Arc<Mutex<WatchdogState>>,
    pub processor: ResultsProcessor,
}

/// Processor over a fresh in-memory store with the given collaborators.
pub fn processor(
    supervisor: Option<Arc<dyn Supervisor>>,
    gates: Option<Arc<dyn GateRunnerFactory>>,
) -> ProcessorFixture {
    let store = MemoryStore::new();
    let writer = writer(&store);
    let watchdog = Arc::new(Mutex::new(WatchdogState::new(&WatchdogConfig::default())));
    let processor = ResultsProcessor::new(
        Arc::new(store.clone()),
        writer.clone(),
        supervisor,
        gates,
        None,
        Arc::clone(&watchdog),
        ProcessorConfig { max_incomplete_retries: 1, working_dir: PathBuf::from(".") },
    );
    ProcessorFixture { store, writer, watchdog, processor }
}

/// Create an issue and move it to in-progress under the suite's executor id.
pub async fn claimed(store: &MemoryStore, new: NewIssue) -> Issue {
    let issue = store.create_issue(new).await.unwrap();
    assert!(store.claim_issue(&issue.id, &InstanceId::from_string(EXECUTOR)).await.unwrap());
    store.get_issue(&issue.id).await.unwrap()
}

pub fn open_task(title: &str) -> NewIssue {
    NewIssue {
        title: title.to_string(),
        issue_type: IssueType::Task,
        ..NewIssue::default()
    }
}

pub fn mission(title: &str) -> NewIssue {
    NewIssue {
        title: title.to_string(),
        issue_type: IssueType::Epic,
        subtype: Some("mission".to_string()),
        ..NewIssue::default()
    }
}

pub fn agent_success() -> AgentResult {
    AgentResult { success: true, exit_code: 0, duration_ms: 50, ..AgentResult::default() }
}

pub fn agent_failure() -> AgentResult {
    AgentResult { success: false, exit_code: 1, duration_ms: 50, ..AgentResult::default() }
}

pub async fn events_of(store: &MemoryStore, event_type: EventType) -> Vec<drover_core::AgentEvent> {
    store
        .get_agent_events(EventFilter { event_type: Some(event_type), ..Default::default() })
        .await
        .unwrap()
}
