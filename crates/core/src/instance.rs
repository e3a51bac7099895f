// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor instance identity.
//!
//! Each running executor process registers one instance row and maintains a
//! heartbeat on it. A cleanup task reaps rows whose heartbeat went stale so
//! operators can tell live fleet members from crashed ones.

use crate::id::InstanceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorInstance {
    pub id: InstanceId,
    pub hostname: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub status: InstanceStatus,
}

impl ExecutorInstance {
    /// Describe the current process as a fresh running instance.
    pub fn local(now: DateTime<Utc>) -> Self {
        Self {
            id: InstanceId::new(),
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            started_at: now,
            last_heartbeat: now,
            status: InstanceStatus::Running,
        }
    }

    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == InstanceStatus::Running && self.last_heartbeat < cutoff
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
