//! Per-run accounting: node visits, model calls and one event per dispatch.
//!
//! The orchestrator owns the report for the duration of a run and hands it
//! back in [`crate::orchestrator::RunOutput`]. Nothing here is shared across
//! runs.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentNode;

/// Maximum characters kept in argument and result previews.
pub const PREVIEW_LEN: usize = 200;

/// Outcome of a tool dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Error,
}

/// A recorded dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEvent {
    pub agent: AgentNode,
    pub tool: String,
    pub args_preview: String,
    pub result_preview: String,
    pub duration_ms: u64,
    pub outcome: ToolOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Node names in visit order.
    pub visits: Vec<AgentNode>,
    pub model_calls: usize,
    pub tool_events: Vec<ToolEvent>,
    pub wall_time_ms: u64,
    #[serde(skip)]
    started_at: Option<Instant>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            visits: Vec::new(),
            model_calls: 0,
            tool_events: Vec::new(),
            wall_time_ms: 0,
            started_at: Some(Instant::now()),
        }
    }

    pub fn record_visit(&mut self, node: AgentNode) {
        self.visits.push(node);
    }

    pub fn record_model_call(&mut self) {
        self.model_calls += 1;
    }

    pub fn record_tool(&mut self, event: ToolEvent) {
        self.tool_events.push(event);
    }

    /// Stamp the wall time. Called once when the run ends.
    pub fn finish(&mut self) {
        if let Some(started) = self.started_at {
            self.wall_time_ms = started.elapsed().as_millis() as u64;
        }
    }

    pub fn total_tool_calls(&self) -> usize {
        self.tool_events.len()
    }

    pub fn failed_tool_calls(&self) -> usize {
        self.tool_events
            .iter()
            .filter(|e| e.outcome == ToolOutcome::Error)
            .count()
    }

    /// Tool names dispatched on behalf of `agent`, in order.
    pub fn tools_used_by(&self, agent: AgentNode) -> Vec<&str> {
        self.tool_events
            .iter()
            .filter(|e| e.agent == agent)
            .map(|e| e.tool.as_str())
            .collect()
    }
}

/// Cut `s` to at most `max_chars` characters, marking the cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}
