// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quality gates.
//!
//! A gate is an external check (build, test, lint) with binary pass/fail
//! per gate; the runner reports which gates ran and which failed. The
//! bundled [`ShellGateFactory`] runs configured shell commands in the
//! agent's working directory, and considers itself applicable only in
//! version-controlled directories.

use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use drover_core::{short, GateCommand, GateConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate runner construction failed: {0}")]
    Construction(String),
    #[error("gate {name} failed to execute: {source}")]
    Execution {
        name: String,
        source: std::io::Error,
    },
    #[error("gates cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    pub all_passed: bool,
    pub gates_run: Vec<String>,
    pub failures: Vec<GateFailure>,
}

#[async_trait]
pub trait GateRunner: Send + Sync + std::fmt::Debug {
    async fn run(&self, token: &CancellationToken) -> Result<GateReport, GateError>;
}

/// Builds a runner for a specific working directory. Construction may
/// fail (missing tools, bad directory); the processor converts that into
/// a failed `quality_gates_completed` rather than a crash.
pub trait GateRunnerFactory: Send + Sync {
    /// Whether gates apply to this working directory at all. Not
    /// applicable means skipped, not failed.
    fn applicable(&self, working_dir: &Path) -> bool;

    fn build(&self, working_dir: &Path) -> Result<Box<dyn GateRunner>, GateError>;
}

/// Factory for [`ShellGateRunner`]s driven by [`GateConfig`].
pub struct ShellGateFactory {
    config: GateConfig,
}

impl ShellGateFactory {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }
}

impl GateRunnerFactory for ShellGateFactory {
    fn applicable(&self, working_dir: &Path) -> bool {
        self.config.enabled
            && !self.config.gates.is_empty()
            && working_dir.join(".git").exists()
    }

    fn build(&self, working_dir: &Path) -> Result<Box<dyn GateRunner>, GateError> {
        if !working_dir.is_dir() {
            return Err(GateError::Construction(format!(
                "working directory missing: {}",
                working_dir.display()
            )));
        }
        Ok(Box::new(ShellGateRunner {
            gates: self.config.gates.clone(),
            working_dir: working_dir.to_path_buf(),
            timeout: Duration::from_millis(self.config.gate_timeout_ms),
        }))
    }
}

/// Runs each configured gate sequentially under a per-gate deadline.
#[derive(Debug)]
pub struct ShellGateRunner {
    gates: Vec<GateCommand>,
    working_dir: PathBuf,
    timeout: Duration,
}

#[async_trait]
impl GateRunner for ShellGateRunner {
    async fn run(&self, token: &CancellationToken) -> Result<GateReport, GateError> {
        let mut report = GateReport { all_passed: true, ..GateReport::default() };
        for gate in &self.gates {
            if token.is_cancelled() {
                return Err(GateError::Cancelled);
            }

            let wrapped = format!("set -euo pipefail\n{}", gate.command);
            let mut cmd = Command::new("bash");
            cmd.arg("-c").arg(&wrapped).current_dir(&self.working_dir);
            let output = run_with_timeout(cmd, self.timeout, &gate.name)
                .await
                .map_err(|source| GateError::Execution { name: gate.name.clone(), source })?;

            report.gates_run.push(gate.name.clone());
            if output.status.success() {
                tracing::info!(gate = %gate.name, "quality gate passed");
            } else {
                report.all_passed = false;
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(
                    gate = %gate.name,
                    exit_code = output.status.code().unwrap_or(-1),
                    "quality gate failed"
                );
                report.failures.push(GateFailure {
                    name: gate.name.clone(),
                    detail: short(stderr.trim(), 500).to_string(),
                });
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "gates_tests.rs"]
mod tests;
