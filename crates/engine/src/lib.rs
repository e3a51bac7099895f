// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-engine: the executor's decision machinery.
//!
//! The engine consumes one claimed issue at a time: it spawns an agent,
//! hands the [`drover_core::AgentResult`] to the results processor, defers
//! or runs quality gates, deduplicates and files discovered work, tracks
//! mission convergence, and runs health and code-review orchestration
//! after successful closes.

pub mod dedup;
pub mod executor;
pub mod gates;
pub mod health;
pub mod incomplete;
pub mod missions;
pub mod results;
pub mod review;
pub mod subprocess;
pub mod supervisor;
pub mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use dedup::{map_candidate, DedupCandidate, DedupDecision, DedupGateway, DedupOutcome, DedupStats};
pub use executor::{build_prompt, Executor, ExecutorDeps, TickOutcome};
pub use gates::{
    GateError, GateFailure, GateReport, GateRunner, GateRunnerFactory, ShellGateFactory,
};
pub use health::{
    run_health_checks, CheckResult, HealthIssue, HealthMonitor, HealthRegistry, HealthSeverity,
    MonitorError,
};
pub use incomplete::{handle_incomplete_work, IncompleteOutcome, SUPERVISOR_ACTOR};
pub use missions::{mission_converged, mission_discoveries, mission_exploded, mission_root};
pub use results::{ProcessResult, ProcessorConfig, ResultsProcessor};
pub use review::{DiffMetrics, ReviewDecision, ReviewSweeper};
pub use supervisor::{DedupOracle, ReviewOracle, Supervisor, SupervisorError};
pub use writer::EventWriter;

use drover_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("sandbox error: {0}")]
    Sandbox(#[from] drover_agents::SandboxError),
    #[error("executor cancelled")]
    Cancelled,
}
