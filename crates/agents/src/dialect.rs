// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent CLI dialects.
//!
//! A dialect is the complete description of how to drive one coding-agent
//! CLI: the executable, the always-on permission-bypass flag the autonomous
//! executor requires, an optional JSON-streaming flag, and the prompt as
//! the sole positional argument. Everything else about the CLI is treated
//! as a black box. New agents are onboarded by constructing this shape,
//! not by adding code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDialect {
    /// Short name used in agent ids and logs.
    pub name: String,
    /// Executable looked up on PATH (or an absolute path).
    pub program: String,
    /// Passed on every invocation; autonomous operation cannot stop to
    /// answer permission prompts.
    pub bypass_flag: String,
    /// When present, stdout is a stream of JSON event objects.
    #[serde(default)]
    pub stream_json_flag: Option<String>,
    /// Extra fixed arguments inserted before the prompt.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl AgentDialect {
    pub fn claude() -> Self {
        Self {
            name: "claude".to_string(),
            program: "claude".to_string(),
            bypass_flag: "--dangerously-skip-permissions".to_string(),
            stream_json_flag: Some("--stream-json".to_string()),
            extra_args: Vec::new(),
        }
    }

    pub fn amp() -> Self {
        Self {
            name: "amp".to_string(),
            program: "amp".to_string(),
            bypass_flag: "--dangerously-allow-all".to_string(),
            stream_json_flag: None,
            extra_args: Vec::new(),
        }
    }

    pub fn streams_json(&self) -> bool {
        self.stream_json_flag.is_some()
    }

    /// Full argument vector for one invocation. The prompt is always the
    /// final positional argument.
    pub fn command_line(&self, prompt: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(3 + self.extra_args.len());
        args.push(self.bypass_flag.clone());
        if let Some(flag) = &self.stream_json_flag {
            args.push(flag.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(prompt.to_string());
        args
    }
}

#[cfg(test)]
#[path = "dialect_tests.rs"]
mod tests;
