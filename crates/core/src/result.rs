// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated outcome of one agent run.

use crate::event::AgentEvent;
use serde::{Deserialize, Serialize};

/// Maximum captured lines per output stream.
pub const OUTPUT_LINE_CAP: usize = 10_000;

/// Sentinel appended once when a stream exceeds [`OUTPUT_LINE_CAP`].
pub const TRUNCATION_MARKER: &str = "... [output truncated: line cap reached]";

/// Line buffer capped at [`OUTPUT_LINE_CAP`] lines.
///
/// The first line past the cap is replaced with a single truncation marker;
/// everything after that is silently dropped. Captured ordering matches
/// printed ordering (the caller holds one mutex across both streams).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputBuffer {
    lines: Vec<String>,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.truncated {
            return;
        }
        if self.lines.len() < OUTPUT_LINE_CAP {
            self.lines.push(line.into());
        } else {
            self.lines.push(TRUNCATION_MARKER.to_string());
            self.truncated = true;
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joined text, mostly for comments and analysis prompts.
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }
}

/// Everything the lifecycle manager reduces one agent run down to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stdout: OutputBuffer,
    pub stderr: OutputBuffer,
    /// Structured events parsed from stdout (JSON dialects only).
    #[serde(default)]
    pub events: Vec<AgentEvent>,
}

impl AgentResult {
    /// Synthetic failed result for runs that never produced an exit status
    /// (spawn failures, timeouts). Buffers are empty; the failure reason
    /// travels in events and comments instead.
    pub fn failed(exit_code: i32, duration_ms: u64) -> Self {
        Self { success: false, exit_code, duration_ms, ..Self::default() }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
