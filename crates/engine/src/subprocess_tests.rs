// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn completes_within_deadline() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo hi");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
}

#[tokio::test]
async fn deadline_kills_the_child() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("sleep 30");
    let started = std::time::Instant::now();
    let err = run_with_timeout(cmd, Duration::from_millis(100), "sleeper").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
}
