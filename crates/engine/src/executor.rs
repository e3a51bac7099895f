// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor loop.
//!
//! One instance runs one issue at a time: claim, assess, spawn, wait,
//! process, close or release. Fleet parallelism comes from running more
//! instances, each claiming through the store's atomic claim; there is no
//! cross-instance locking anywhere in the executor.

use crate::gates::GateRunnerFactory;
use crate::health::{run_health_checks, HealthRegistry};
use crate::results::{ProcessResult, ProcessorConfig, ResultsProcessor};
use crate::review::ReviewSweeper;
use crate::supervisor::{DedupOracle, ReviewOracle, Supervisor};
use crate::writer::EventWriter;
use crate::{dedup::DedupGateway, EngineError};
use drover_agents::{AgentDialect, AgentSpawnConfig, NoSandbox, SandboxProvider, WaitError};
use drover_core::{
    AgentResult, Assessment, Clock, EventType, ExecutorConfig, ExecutorInstance, InstanceId,
    Issue, Severity, SystemClock, WatchdogState, SYSTEM_ISSUE,
};
use drover_store::{EventCleanup, IssueStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What one `run_once` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No open issue was ready.
    Idle,
    /// Another instance won the claim.
    Contended,
    /// Setup failed before the agent ran; the issue went back to open.
    Released,
    /// An agent ran and the processor decided the terminal action.
    Processed(ProcessResult),
}

/// External collaborators wired into one executor.
pub struct ExecutorDeps {
    pub store: Arc<dyn IssueStore>,
    pub dialect: AgentDialect,
    pub supervisor: Option<Arc<dyn Supervisor>>,
    pub dedup_oracle: Option<Arc<dyn DedupOracle>>,
    pub gates: Option<Arc<dyn GateRunnerFactory>>,
    pub sandbox: Option<Arc<dyn SandboxProvider>>,
    pub review_oracle: Option<Arc<dyn ReviewOracle>>,
    pub health: HealthRegistry,
}

pub struct Executor<C: Clock = SystemClock> {
    store: Arc<dyn IssueStore>,
    writer: EventWriter,
    processor: ResultsProcessor,
    supervisor: Option<Arc<dyn Supervisor>>,
    sandbox: Arc<dyn SandboxProvider>,
    health: HealthRegistry,
    review: Option<ReviewSweeper>,
    watchdog: Arc<Mutex<WatchdogState>>,
    dialect: AgentDialect,
    config: ExecutorConfig,
    instance: ExecutorInstance,
    clock: C,
}

impl<C: Clock> Executor<C> {
    pub fn new(deps: ExecutorDeps, config: ExecutorConfig, token: CancellationToken, clock: C) -> Self {
        let instance = ExecutorInstance::local(clock.now_utc());
        let writer = EventWriter::new(Arc::clone(&deps.store), instance.id.clone(), token);
        let watchdog = Arc::new(Mutex::new(WatchdogState::new(&config.watchdog)));
        let dedup = deps.dedup_oracle.map(|oracle| {
            DedupGateway::new(oracle, writer.clone(), config.dedup_batch_size)
        });
        let processor = ResultsProcessor::new(
            Arc::clone(&deps.store),
            writer.clone(),
            deps.supervisor.clone(),
            deps.gates,
            dedup,
            Arc::clone(&watchdog),
            ProcessorConfig {
                max_incomplete_retries: config.max_incomplete_retries,
                working_dir: config.working_dir.clone(),
            },
        );
        let review = deps.review_oracle.map(|oracle| {
            ReviewSweeper::new(
                config.working_dir.clone(),
                oracle,
                Arc::clone(&deps.store),
                writer.clone(),
            )
        });
        let sandbox = deps
            .sandbox
            .unwrap_or_else(|| Arc::new(NoSandbox::new(config.working_dir.clone())));

        Self {
            store: deps.store,
            writer,
            processor,
            supervisor: deps.supervisor,
            sandbox,
            health: deps.health,
            review,
            watchdog,
            dialect: deps.dialect,
            config,
            instance,
            clock,
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance.id
    }

    pub fn watchdog(&self) -> Arc<Mutex<WatchdogState>> {
        Arc::clone(&self.watchdog)
    }

    /// How long to pause between idle ticks; widens under backoff.
    pub fn pause_hint(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.watchdog.lock().current_interval_ms())
    }

    /// Register this instance with the store. Call once before ticking.
    pub async fn register(&self) -> Result<(), EngineError> {
        self.store.register_instance(self.instance.clone()).await?;
        tracing::info!(
            instance = %self.instance.id,
            hostname = %self.instance.hostname,
            pid = self.instance.pid,
            "executor instance registered"
        );
        Ok(())
    }

    /// Flush pending events and mark the instance stopped.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.writer.drain().await;
        self.store.mark_stopped(&self.instance.id).await?;
        tracing::info!(instance = %self.instance.id, "executor instance stopped");
        Ok(())
    }

    /// One full claim-to-terminal-action cycle.
    pub async fn run_once(&self, token: &CancellationToken) -> Result<TickOutcome, EngineError> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let Some(candidate) = self.store.next_ready_issue().await? else {
            return Ok(TickOutcome::Idle);
        };
        if !self.store.claim_issue(&candidate.id, &self.instance.id).await? {
            return Ok(TickOutcome::Contended);
        }
        let issue = self.store.get_issue(&candidate.id).await?;
        self.writer.emit(
            self.writer
                .event(EventType::IssueClaimed, &issue.id, format!("claimed: {}", issue.title))
                .with_field("priority", issue.priority.to_string())
                .with_field("issue_type", issue.issue_type.to_string()),
        );

        let assessment = self.assess(&issue).await;

        let working_dir = match self.sandbox.acquire(&issue.id).await {
            Ok(dir) => dir,
            Err(err) => {
                return self.release(&issue, &format!("sandbox acquisition failed: {err}")).await;
            }
        };

        let prompt = build_prompt(&issue, assessment.as_ref());
        let spawn_config = AgentSpawnConfig::new(
            self.dialect.clone(),
            &working_dir,
            &issue.id,
            self.instance.id.clone(),
        )
        .timeout_ms(self.config.agent_timeout_ms);
        let agent_id = spawn_config.agent_id();
        let event_tx = self.writer.channel(64);

        let agent = match drover_agents::spawn(spawn_config, &prompt, token, Some(event_tx)).await
        {
            Ok(agent) => agent,
            Err(err) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AgentSpawned, &issue.id, "agent spawn failed")
                        .with_severity(Severity::Error)
                        .with_agent(agent_id)
                        .with_field("error", err.to_string()),
                );
                self.release_sandbox(&issue.id).await;
                return self.release(&issue, &format!("agent spawn failed: {err}")).await;
            }
        };
        self.writer.emit(
            self.writer
                .event(EventType::AgentSpawned, &issue.id, "agent spawned")
                .with_agent(agent.id())
                .with_field("program", self.dialect.program.clone())
                .with_field("timeout_ms", self.config.agent_timeout_ms),
        );

        let result = match agent.wait(token).await {
            Ok(result) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AgentCompleted, &issue.id, "agent completed")
                        .with_agent(&agent_id)
                        .with_field("success", result.success)
                        .with_field("exit_code", result.exit_code)
                        .with_field("duration_ms", result.duration_ms)
                        .with_field("stdout_lines", result.stdout.len())
                        .with_field("events", result.events.len()),
                );
                result
            }
            Err(WaitError::Cancelled) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AgentCompleted, &issue.id, "agent cancelled")
                        .with_severity(Severity::Error)
                        .with_agent(&agent_id)
                        .with_field("reason", "cancelled"),
                );
                self.release_sandbox(&issue.id).await;
                let _ = self.release(&issue, "agent run cancelled").await;
                return Err(EngineError::Cancelled);
            }
            Err(WaitError::Timeout { timeout_ms }) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AgentCompleted, &issue.id, "agent timed out")
                        .with_severity(Severity::Error)
                        .with_agent(&agent_id)
                        .with_field("reason", "timeout")
                        .with_field("timeout_ms", timeout_ms),
                );
                AgentResult::failed(-1, timeout_ms)
            }
            Err(WaitError::Io(err)) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AgentCompleted, &issue.id, "agent wait failed")
                        .with_severity(Severity::Error)
                        .with_agent(&agent_id)
                        .with_field("error", err.to_string()),
                );
                AgentResult::failed(-1, 0)
            }
        };

        let mut processed = self.processor.process(&issue, &result, token).await?;
        self.release_sandbox(&issue.id).await;

        if processed.completed {
            run_health_checks(&self.health, self.store.as_ref(), &self.writer, token).await;
            if let Some(sweeper) = &self.review {
                match sweeper.sweep(token).await {
                    Ok(scheduled) => processed.review_scheduled = scheduled,
                    Err(err) => tracing::warn!(error = %err, "review sweep failed"),
                }
            }
        } else if let Some(supervisor) = &self.supervisor {
            // Non-completed run: let the AI widen the supervisory interval.
            match supervisor.recommend_backoff(&issue, &result).await {
                Ok(Some(advice)) if advice.should_back_off => {
                    self.watchdog.lock().apply_ai_backoff(advice.interval_ms);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "backoff recommendation failed"),
            }
        }

        self.heartbeat().await;
        Ok(TickOutcome::Processed(processed))
    }

    /// Per-tick maintenance: reap stale instances, apply event retention,
    /// refresh the heartbeat. Summary events go to the `SYSTEM` issue.
    pub async fn maintenance(&self, token: &CancellationToken) -> Result<(), EngineError> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let now = self.clock.now_utc();

        let cutoff = now - chrono::Duration::milliseconds(self.config.instance_stale_after_ms as i64);
        match self.store.reap_stale_instances(cutoff).await {
            Ok(reaped) => {
                if reaped > 0 {
                    tracing::info!(reaped, "reaped stale executor instances");
                }
                self.writer.emit(
                    self.writer
                        .event(
                            EventType::InstanceCleanupCompleted,
                            SYSTEM_ISSUE,
                            format!("instance cleanup: {reaped} reaped"),
                        )
                        .with_field("reaped", reaped),
                );
            }
            Err(err) => tracing::warn!(error = %err, "instance cleanup failed"),
        }

        let cleanup = EventCleanup {
            older_than: Some(
                now - chrono::Duration::milliseconds(self.config.cleanup.event_max_age_ms as i64),
            ),
            per_issue_cap: Some(self.config.cleanup.events_per_issue_cap),
            global_cap: Some(self.config.cleanup.events_global_cap),
        };
        match self.store.delete_agent_events(cleanup).await {
            Ok(deleted) => {
                self.writer.emit(
                    self.writer
                        .event(
                            EventType::EventCleanupCompleted,
                            SYSTEM_ISSUE,
                            format!("event cleanup: {deleted} deleted"),
                        )
                        .with_field("deleted", deleted),
                );
            }
            Err(err) => tracing::warn!(error = %err, "event cleanup failed"),
        }

        self.heartbeat().await;
        Ok(())
    }

    /// Claim-to-shutdown loop: tick until the token cancels, pausing by
    /// the watchdog interval when idle.
    pub async fn run(&self, token: &CancellationToken) -> Result<(), EngineError> {
        self.register().await?;
        loop {
            if token.is_cancelled() {
                break;
            }
            match self.run_once(token).await {
                Ok(TickOutcome::Processed(_)) => continue,
                Ok(_) => {
                    if let Err(EngineError::Cancelled) = self.maintenance(token).await {
                        break;
                    }
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(self.pause_hint()) => {}
                    }
                }
                Err(EngineError::Cancelled) => break,
                Err(err) => {
                    tracing::error!(error = %err, "executor tick failed");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(self.pause_hint()) => {}
                    }
                }
            }
        }
        self.shutdown().await
    }

    async fn assess(&self, issue: &Issue) -> Option<Assessment> {
        let supervisor = self.supervisor.as_ref()?;
        self.writer.emit(self.writer.event(
            EventType::AssessmentStarted,
            &issue.id,
            "assessing issue",
        ));
        match supervisor.assess_issue(issue).await {
            Ok(assessment) => {
                self.writer.emit(
                    self.writer
                        .event(EventType::AssessmentCompleted, &issue.id, "assessment completed")
                        .with_field("summary", drover_core::short(&assessment.summary, 200)),
                );
                Some(assessment)
            }
            Err(err) => {
                tracing::warn!(issue = %issue.id, error = %err, "assessment failed");
                self.writer.emit(
                    self.writer
                        .event(EventType::AssessmentCompleted, &issue.id, "assessment failed")
                        .with_severity(Severity::Warning)
                        .with_field("error", err.to_string()),
                );
                None
            }
        }
    }

    /// Setup failed before an agent exited cleanly: log first, then put
    /// the issue back to open so another claim cycle can pick it up.
    async fn release(&self, issue: &Issue, reason: &str) -> Result<TickOutcome, EngineError> {
        tracing::error!(issue = %issue.id, reason, "releasing issue back to open");
        self.store.release_issue(&issue.id, &self.instance.id).await?;
        Ok(TickOutcome::Released)
    }

    async fn release_sandbox(&self, issue_id: &str) {
        if let Err(err) = self.sandbox.release(issue_id).await {
            tracing::warn!(issue = %issue_id, error = %err, "sandbox release failed");
        }
    }

    async fn heartbeat(&self) {
        if let Err(err) = self.store.heartbeat(&self.instance.id, self.clock.now_utc()).await {
            tracing::warn!(instance = %self.instance.id, error = %err, "heartbeat failed");
        }
    }
}

/// Prompt handed to the agent: the issue body plus whatever the
/// assessment adds.
pub fn build_prompt(issue: &Issue, assessment: Option<&Assessment>) -> String {
    let mut prompt = format!("# {}\n\n{}\n", issue.title, issue.description);
    if !issue.acceptance_criteria.is_empty() {
        prompt.push_str(&format!("\n## Acceptance criteria\n\n{}\n", issue.acceptance_criteria));
    }
    if let Some(assessment) = assessment {
        if !assessment.summary.is_empty() {
            prompt.push_str(&format!("\n## Assessment\n\n{}\n", assessment.summary));
        }
        if let Some(approach) = &assessment.approach {
            prompt.push_str(&format!("\n## Suggested approach\n\n{approach}\n"));
        }
        if !assessment.risks.is_empty() {
            prompt.push_str("\n## Risks\n\n");
            for risk in &assessment.risks {
                prompt.push_str(&format!("- {risk}\n"));
            }
        }
    }
    prompt
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
