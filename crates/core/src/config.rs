// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor configuration.
//!
//! Everything is serde-deserializable so embedders can load a TOML file,
//! and every field has a default carrying the documented behavior, so an
//! empty config is a working config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default agent run deadline: 30 minutes.
pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Directory agents execute in when no sandbox provider is configured.
    pub working_dir: PathBuf,
    pub agent_timeout_ms: u64,
    /// Incomplete-work attempts beyond this count escalate to a human.
    pub max_incomplete_retries: u32,
    /// Upper bound on candidates per deduplication oracle call.
    pub dedup_batch_size: usize,
    /// A mission with strictly more discoveries than this has exploded.
    pub explosion_threshold: usize,
    /// Heartbeats older than this mark an instance stale.
    pub instance_stale_after_ms: u64,
    pub watchdog: WatchdogConfig,
    pub gates: GateConfig,
    pub cleanup: CleanupConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            agent_timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            max_incomplete_retries: 1,
            dedup_batch_size: 50,
            explosion_threshold: 20,
            instance_stale_after_ms: 10 * 60 * 1000,
            watchdog: WatchdogConfig::default(),
            gates: GateConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    pub base_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval_ms: 30_000,
            max_interval_ms: 10 * 60 * 1000,
        }
    }
}

/// One named quality gate; pass is exit code 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCommand {
    pub name: String,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    pub gates: Vec<GateCommand>,
    /// Per-gate deadline.
    pub gate_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gates: Vec::new(),
            gate_timeout_ms: 10 * 60 * 1000,
        }
    }
}

/// Retention policy for stored agent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub event_max_age_ms: u64,
    pub events_per_issue_cap: usize,
    pub events_global_cap: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            event_max_age_ms: 7 * 24 * 60 * 60 * 1000,
            events_per_issue_cap: 1_000,
            events_global_cap: 50_000,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
