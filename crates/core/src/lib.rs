// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-core: data model for the drover work executor

pub mod analysis;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod instance;
pub mod issue;
pub mod result;
pub mod watchdog;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use analysis::{Analysis, Assessment, BackoffAdvice, DiscoveredIssue};
pub use checkpoint::ReviewCheckpoint;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    CleanupConfig, ExecutorConfig, GateCommand, GateConfig, WatchdogConfig,
    DEFAULT_AGENT_TIMEOUT_MS,
};
pub use event::{AgentEvent, EventType, Severity};
pub use id::{short, EventId, InstanceId, SYSTEM_ISSUE};
pub use instance::{ExecutorInstance, InstanceStatus};
pub use issue::{
    Issue, IssueStatus, IssueType, Priority, TransitionError, LABEL_NEEDS_HUMAN_REVIEW,
    LABEL_NEEDS_QUALITY_GATES, MISSION_SUBTYPE,
};
pub use result::{AgentResult, OutputBuffer, OUTPUT_LINE_CAP, TRUNCATION_MARKER};
pub use watchdog::WatchdogState;

#[cfg(any(test, feature = "test-support"))]
pub use test_support::IssueBuilder;
