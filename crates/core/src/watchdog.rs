// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog backoff state.
//!
//! The watchdog widens the supervisory check interval when interventions
//! pile up or the AI recommends slowing down, and snaps back to the base
//! interval on real progress. Three independent signals mutate the state:
//! `record_progress`, `record_intervention`, and `apply_ai_backoff`; the
//! executor loop composes them.
//!
//! Invariants: `current_interval_ms >= base_interval_ms`, and
//! `in_backoff` implies `current_interval_ms > base_interval_ms`.

use crate::config::WatchdogConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogState {
    pub enabled: bool,
    pub base_interval_ms: u64,
    pub max_interval_ms: u64,
    current_interval_ms: u64,
    consecutive_interventions: u32,
    in_backoff: bool,
}

impl WatchdogState {
    pub fn new(config: &WatchdogConfig) -> Self {
        Self {
            enabled: config.enabled,
            base_interval_ms: config.base_interval_ms,
            max_interval_ms: config.max_interval_ms.max(config.base_interval_ms),
            current_interval_ms: config.base_interval_ms,
            consecutive_interventions: 0,
            in_backoff: false,
        }
    }

    pub fn current_interval_ms(&self) -> u64 {
        self.current_interval_ms
    }

    pub fn consecutive_interventions(&self) -> u32 {
        self.consecutive_interventions
    }

    pub fn is_in_backoff(&self) -> bool {
        self.in_backoff
    }

    /// An issue was just closed: reset to the base interval and clear the
    /// intervention streak. Failure paths must never call this.
    pub fn record_progress(&mut self) {
        self.current_interval_ms = self.base_interval_ms;
        self.consecutive_interventions = 0;
        self.in_backoff = false;
    }

    /// A supervisory intervention happened. Each one doubles the current
    /// interval up to the configured maximum.
    pub fn record_intervention(&mut self) {
        if !self.enabled {
            return;
        }
        self.consecutive_interventions = self.consecutive_interventions.saturating_add(1);
        self.current_interval_ms =
            self.current_interval_ms.saturating_mul(2).min(self.max_interval_ms);
        self.in_backoff = self.current_interval_ms > self.base_interval_ms;
    }

    /// The AI recommended a specific check interval. Clamped into
    /// `[base, max]`; does not touch the intervention streak.
    pub fn apply_ai_backoff(&mut self, interval_ms: u64) {
        if !self.enabled {
            return;
        }
        self.current_interval_ms = interval_ms.clamp(self.base_interval_ms, self.max_interval_ms);
        self.in_backoff = self.current_interval_ms > self.base_interval_ms;
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
