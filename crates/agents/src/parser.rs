// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured-event extraction from agent output.
//!
//! Agents emit a mix of JSON event objects and free prose, sometimes on
//! alternating lines. The parser tries the JSON schema first (when the
//! dialect streams JSON), then falls back to regex rules for plain text.
//! The only state is a monotonic line counter carried onto every event for
//! provenance.

use drover_core::{short, AgentEvent, EventType, InstanceId, Severity};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Envelope context stamped onto every parsed event.
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub issue_id: String,
    pub executor_id: InstanceId,
    pub agent_id: String,
}

/// One line of the agent's JSON stream dialect. Unknown fields are
/// ignored; all known fields are optional because agents omit freely.
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    subtype: Option<String>,
    content: Option<String>,
    tool: Option<String>,
    file: Option<String>,
    command: Option<String>,
    pattern: Option<String>,
    session_id: Option<String>,
}

struct PlainRules {
    tool_call: Regex,
    file_read: Regex,
    file_write: Regex,
    shell: Regex,
    search: Regex,
    error: Regex,
}

fn rx(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns below are literals; failing to compile is a programming error.
        Err(_) => unreachable!("invalid built-in pattern"),
    }
}

fn plain_rules() -> &'static PlainRules {
    static RULES: OnceLock<PlainRules> = OnceLock::new();
    RULES.get_or_init(|| PlainRules {
        tool_call: rx(r"^(?:⏺\s*)?(Read|Edit|Write|Bash|Glob|Grep|Task)\(([^)]*)\)"),
        file_read: rx(r"(?i)^reading\s+(?:file\s+)?(\S+)"),
        file_write: rx(r"(?i)^(?:writing|wrote|editing|edited)\s+(\S+)"),
        shell: rx(r"(?i)^(?:\$|running:?)\s+(.+)$"),
        search: rx(r"(?i)^searching\s+(?:for\s+)?(.+)$"),
        error: rx(r"(?i)^(?:error|fatal|panic(?:ked)?)\b"),
    })
}

#[derive(Debug)]
pub struct OutputParser {
    ctx: ParseContext,
    line_no: u64,
    json_enabled: bool,
    debug: bool,
}

impl OutputParser {
    pub fn new(ctx: ParseContext, json_enabled: bool) -> Self {
        let debug = std::env::var("VC_DEBUG_EVENTS").map(|v| !v.is_empty()).unwrap_or(false);
        Self { ctx, line_no: 0, json_enabled, debug }
    }

    /// Lines consumed so far.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Classify one stdout line. Returns zero or one events; the Vec shape
    /// leaves room for dialects whose single line fans out.
    pub fn parse_line(&mut self, line: &str) -> Vec<AgentEvent> {
        self.line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        if self.json_enabled && trimmed.starts_with('{') {
            match serde_json::from_str::<StreamLine>(trimmed) {
                Ok(stream) => return self.from_stream_line(stream),
                Err(err) => {
                    if self.debug {
                        eprintln!(
                            "vc-debug: line {}: not a stream event ({}), trying plain rules",
                            self.line_no, err
                        );
                    }
                    // Mixed text/JSON output is tolerated; fall through.
                }
            }
        }

        self.from_plain_line(trimmed)
    }

    fn event(&self, message: &str) -> AgentEvent {
        AgentEvent::new(
            EventType::AgentToolUse,
            self.ctx.issue_id.clone(),
            self.ctx.executor_id.clone(),
            short(message, 200),
        )
        .with_agent(self.ctx.agent_id.clone())
        .with_source_line(self.line_no)
    }

    fn from_stream_line(&self, stream: StreamLine) -> Vec<AgentEvent> {
        // Only tool_use carries observable work; system/result lines are
        // informational chatter.
        if stream.kind.as_deref() != Some("tool_use") {
            if self.debug {
                eprintln!(
                    "vc-debug: line {}: discarding {} event",
                    self.line_no,
                    stream.kind.as_deref().unwrap_or("untyped")
                );
            }
            return Vec::new();
        }

        let tool = stream.tool.unwrap_or_else(|| "unknown".to_string());
        let mut event = self
            .event(&format!("agent tool use: {tool}"))
            .with_field("tool", tool.as_str());
        if let Some(subtype) = stream.subtype {
            event = event.with_field("subtype", subtype);
        }
        if let Some(file) = stream.file {
            event = event.with_field("file", file);
        }
        if let Some(command) = stream.command {
            event = event.with_field("command", command);
        }
        if let Some(pattern) = stream.pattern {
            event = event.with_field("pattern", pattern);
        }
        if let Some(session_id) = stream.session_id {
            event = event.with_field("session_id", session_id);
        }
        if let Some(content) = stream.content {
            event = event.with_field("content", short(&content, 500).to_string());
        }
        vec![event]
    }

    fn from_plain_line(&self, line: &str) -> Vec<AgentEvent> {
        let rules = plain_rules();

        if let Some(caps) = rules.tool_call.captures(line) {
            let tool = caps[1].to_ascii_lowercase();
            let argument = caps[2].trim().to_string();
            let mut event = self.event(line).with_field("tool", tool.as_str());
            if !argument.is_empty() {
                event = match tool.as_str() {
                    "bash" => event.with_field("command", argument),
                    "glob" | "grep" => event.with_field("pattern", argument),
                    _ => event.with_field("file", argument),
                };
            }
            return vec![event];
        }

        if let Some(caps) = rules.file_read.captures(line) {
            return vec![self
                .event(line)
                .with_field("tool", "read")
                .with_field("file", caps[1].to_string())];
        }

        if let Some(caps) = rules.file_write.captures(line) {
            return vec![self
                .event(line)
                .with_field("tool", "write")
                .with_field("file", caps[1].to_string())];
        }

        if let Some(caps) = rules.shell.captures(line) {
            return vec![self
                .event(line)
                .with_field("tool", "bash")
                .with_field("command", caps[1].trim().to_string())];
        }

        if let Some(caps) = rules.search.captures(line) {
            return vec![self
                .event(line)
                .with_field("tool", "grep")
                .with_field("pattern", caps[1].trim().to_string())];
        }

        if rules.error.is_match(line) {
            return vec![self
                .event(line)
                .with_severity(Severity::Error)
                .with_field("kind", "error_output")];
        }

        Vec::new()
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
