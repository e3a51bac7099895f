// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem isolation contract.
//!
//! The executor asks a provider for a working directory before spawning an
//! agent and hands it back afterwards. Providers may clone repos, mount
//! overlays, or do nothing at all; [`NoSandbox`] is the do-nothing
//! implementation that runs every agent in one configured directory.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Working directory for the given issue's agent.
    async fn acquire(&self, issue_id: &str) -> Result<PathBuf, SandboxError>;

    /// Return the directory after the run. Idempotent.
    async fn release(&self, issue_id: &str) -> Result<(), SandboxError>;
}

/// Passthrough provider: every agent runs in the same directory.
pub struct NoSandbox {
    root: PathBuf,
}

impl NoSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SandboxProvider for NoSandbox {
    async fn acquire(&self, _issue_id: &str) -> Result<PathBuf, SandboxError> {
        if !self.root.is_dir() {
            return Err(SandboxError::Unavailable(format!(
                "working directory missing: {}",
                self.root.display()
            )));
        }
        Ok(self.root.clone())
    }

    async fn release(&self, _issue_id: &str) -> Result<(), SandboxError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
