// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent process lifecycle: spawn, capture, wait, kill.
//!
//! One agent run moves through `unstarted -> running -> {completed, failed,
//! killed}`. The terminal state is observable through the returned
//! [`AgentResult`] (`success`/`exit_code`) or the [`WaitError`] variant for
//! killed runs. Two reader tasks capture stdout and stderr; a single mutex
//! guards both buffers, the parser, and the collected events, so captured
//! ordering always matches printed ordering.

use crate::dialect::AgentDialect;
use crate::parser::{OutputParser, ParseContext};
use drover_core::{AgentEvent, AgentResult, InstanceId, OutputBuffer, DEFAULT_AGENT_TIMEOUT_MS};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("context cancelled before spawn")]
    Cancelled,
    #[error("agent working directory missing: {0}")]
    WorkingDirMissing(PathBuf),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("agent process has no {0} pipe")]
    StreamUnavailable(&'static str),
}

/// Terminal errors from [`Agent::wait`]. `Timeout` and `Cancelled` both
/// kill the child; callers distinguish them to pick retry semantics.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("agent timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("agent cancelled by caller")]
    Cancelled,
    #[error("wait failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct AgentSpawnConfig {
    pub dialect: AgentDialect,
    pub working_dir: PathBuf,
    pub issue_id: String,
    pub executor_id: InstanceId,
    pub timeout_ms: u64,
    pub env: HashMap<String, String>,
}

impl AgentSpawnConfig {
    pub fn new(
        dialect: AgentDialect,
        working_dir: impl Into<PathBuf>,
        issue_id: impl Into<String>,
        executor_id: InstanceId,
    ) -> Self {
        Self {
            dialect,
            working_dir: working_dir.into(),
            issue_id: issue_id.into(),
            executor_id,
            timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            env: HashMap::new(),
        }
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Stable agent id: `{dialect}-{issue}`.
    pub fn agent_id(&self) -> String {
        format!("{}-{}", self.dialect.name, self.issue_id)
    }
}

#[derive(Debug)]
struct CaptureState {
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    events: Vec<AgentEvent>,
    parser: OutputParser,
}

/// Handle to a running agent process. The handle exclusively owns the
/// child and its pipes; dropping it kills the process.
#[derive(Debug)]
pub struct Agent {
    agent_id: String,
    child: Child,
    state: Arc<Mutex<CaptureState>>,
    readers: Vec<JoinHandle<()>>,
    started: Instant,
    timeout_ms: u64,
}

/// Start an agent process for one issue.
///
/// Parsed events are pushed onto `event_tx` as they stream, in addition to
/// landing in the final result. A cancelled token is rejected before any
/// process is created.
pub async fn spawn(
    config: AgentSpawnConfig,
    prompt: &str,
    token: &CancellationToken,
    event_tx: Option<mpsc::Sender<AgentEvent>>,
) -> Result<Agent, SpawnError> {
    if token.is_cancelled() {
        return Err(SpawnError::Cancelled);
    }
    if !config.working_dir.is_dir() {
        return Err(SpawnError::WorkingDirMissing(config.working_dir.clone()));
    }

    let agent_id = config.agent_id();
    let start = Instant::now();

    let mut cmd = Command::new(&config.dialect.program);
    cmd.args(config.dialect.command_line(prompt))
        .current_dir(&config.working_dir)
        .envs(&config.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| SpawnError::Spawn {
        program: config.dialect.program.clone(),
        source,
    })?;

    let stdout = child.stdout.take().ok_or(SpawnError::StreamUnavailable("stdout"))?;
    let stderr = child.stderr.take().ok_or(SpawnError::StreamUnavailable("stderr"))?;

    let parser = OutputParser::new(
        ParseContext {
            issue_id: config.issue_id.clone(),
            executor_id: config.executor_id.clone(),
            agent_id: agent_id.clone(),
        },
        config.dialect.streams_json(),
    );
    let state = Arc::new(Mutex::new(CaptureState {
        stdout: OutputBuffer::new(),
        stderr: OutputBuffer::new(),
        events: Vec::new(),
        parser,
    }));

    let readers = vec![
        tokio::spawn(read_stdout(stdout, Arc::clone(&state), event_tx)),
        tokio::spawn(read_stderr(stderr, Arc::clone(&state))),
    ];

    tracing::info!(
        agent_id = %agent_id,
        program = %config.dialect.program,
        workspace = %config.working_dir.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "agent spawned"
    );

    Ok(Agent {
        agent_id,
        child,
        state,
        readers,
        started: Instant::now(),
        timeout_ms: config.timeout_ms,
    })
}

async fn read_stdout(
    stdout: impl AsyncRead + Unpin,
    state: Arc<Mutex<CaptureState>>,
    event_tx: Option<mpsc::Sender<AgentEvent>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                // Buffer append and parse happen under one lock so the
                // captured order is the printed order.
                let parsed = {
                    let mut state = state.lock();
                    state.stdout.push(line.as_str());
                    let events = state.parser.parse_line(&line);
                    state.events.extend(events.iter().cloned());
                    events
                };
                if let Some(tx) = &event_tx {
                    for event in parsed {
                        if tx.send(event).await.is_err() {
                            tracing::debug!("event channel closed, dropping parsed events");
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "stdout capture ended");
                break;
            }
        }
    }
}

async fn read_stderr(stderr: impl AsyncRead + Unpin, state: Arc<Mutex<CaptureState>>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => state.lock().stderr.push(line),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "stderr capture ended");
                break;
            }
        }
    }
}

impl Agent {
    pub fn id(&self) -> &str {
        &self.agent_id
    }

    /// Block until process exit, timeout, or caller cancellation.
    ///
    /// On timeout or cancellation the child is killed and the partial
    /// result discarded; the two cases return distinguishable errors.
    pub async fn wait(mut self, token: &CancellationToken) -> Result<AgentResult, WaitError> {
        if token.is_cancelled() {
            self.kill().await;
            return Err(WaitError::Cancelled);
        }

        enum Outcome {
            Exited(std::process::ExitStatus),
            WaitFailed(std::io::Error),
            Cancelled,
            TimedOut,
        }

        let timeout_ms = self.timeout_ms;
        let outcome = tokio::select! {
            status = self.child.wait() => match status {
                Ok(status) => Outcome::Exited(status),
                Err(err) => Outcome::WaitFailed(err),
            },
            _ = token.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => Outcome::TimedOut,
        };

        let status = match outcome {
            Outcome::Exited(status) => status,
            Outcome::WaitFailed(err) => return Err(WaitError::Io(err)),
            Outcome::Cancelled => {
                self.kill().await;
                return Err(WaitError::Cancelled);
            }
            Outcome::TimedOut => {
                self.kill().await;
                return Err(WaitError::Timeout { timeout_ms });
            }
        };

        // Drain both readers so the buffers hold everything printed before
        // exit, then reduce.
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }

        let duration_ms = self.started.elapsed().as_millis() as u64;
        let mut state = self.state.lock();
        let result = AgentResult {
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
            duration_ms,
            stdout: std::mem::take(&mut state.stdout),
            stderr: std::mem::take(&mut state.stderr),
            events: std::mem::take(&mut state.events),
        };
        drop(state);

        tracing::info!(
            agent_id = %self.agent_id,
            success = result.success,
            exit_code = result.exit_code,
            duration_ms,
            stdout_lines = result.stdout.len(),
            "agent completed"
        );
        Ok(result)
    }

    /// Force-terminate the process and stop both readers.
    pub async fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            tracing::debug!(agent_id = %self.agent_id, error = %err, "kill signal failed");
        }
        let _ = self.child.wait().await;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        tracing::info!(agent_id = %self.agent_id, "agent killed");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
