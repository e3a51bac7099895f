// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-agents: agent process lifecycle and output parsing.
//!
//! An agent is one invocation of an external coding-agent CLI against one
//! issue. This crate spawns the process, captures both output streams into
//! capped buffers, extracts structured events from the stream as it flows,
//! and reduces the run to an [`drover_core::AgentResult`].

pub mod dialect;
pub mod lifecycle;
pub mod parser;
pub mod sandbox;

pub use dialect::AgentDialect;
pub use lifecycle::{spawn, Agent, AgentSpawnConfig, SpawnError, WaitError};
pub use parser::{OutputParser, ParseContext};
pub use sandbox::{NoSandbox, SandboxError, SandboxProvider};
