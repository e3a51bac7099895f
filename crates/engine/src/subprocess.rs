// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess helpers for gate and git commands.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a command to completion with a deadline. The child is killed when
/// the deadline fires or the future is dropped.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> std::io::Result<Output> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("{label} timed out after {}ms", timeout.as_millis()),
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
