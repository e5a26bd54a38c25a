//! Routing state machine: explicit states, legal transition guards and the
//! transition cap.
//!
//! The orchestrator calls `advance()` after every node visit. Each call
//! validates the edge against the routing graph, records it, and forces the
//! machine into `Done` once the configured cap is reached so a run that keeps
//! bouncing between Supervisor and workers always terminates.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::agents::AgentNode;

/// Cursor of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Supervisor,
    Retriever,
    Executor,
    /// Terminal.
    Done,
}

impl RouteState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// The agent visited in this state, `None` for `Done`.
    pub fn node(self) -> Option<AgentNode> {
        match self {
            Self::Supervisor => Some(AgentNode::Supervisor),
            Self::Retriever => Some(AgentNode::Retriever),
            Self::Executor => Some(AgentNode::Executor),
            Self::Done => None,
        }
    }
}

impl From<AgentNode> for RouteState {
    fn from(node: AgentNode) -> Self {
        match node {
            AgentNode::Supervisor => Self::Supervisor,
            AgentNode::Retriever => Self::Retriever,
            AgentNode::Executor => Self::Executor,
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supervisor => write!(f, "Supervisor"),
            Self::Retriever => write!(f, "Retriever"),
            Self::Executor => write!(f, "Executor"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Legal edges of the routing graph:
/// ```text
/// Supervisor → Retriever | Executor | Done
/// Retriever  → Supervisor | Done
/// Executor   → Supervisor | Done
/// ```
/// Workers never talk to each other. `→ Done` from a worker only happens when
/// the cap forces termination.
fn is_legal_transition(from: RouteState, to: RouteState) -> bool {
    use RouteState::*;

    if to == Done && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Supervisor, Retriever) | (Supervisor, Executor) | (Retriever, Supervisor) | (Executor, Supervisor)
    )
}

/// A single recorded transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RouteState,
    pub to: RouteState,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set when the cap, not the graph, decided this edge.
    #[serde(default)]
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: RouteState,
    pub to: RouteState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal route transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Routing state machine for one run.
///
/// Invariant: `transitions().len() <= max_transitions`, the forced `→ Done`
/// included.
pub struct RoutingMachine {
    current: RouteState,
    max_transitions: usize,
    exhausted: bool,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl RoutingMachine {
    /// A machine starting at `Supervisor`. Caps below 2 are raised to 2 so
    /// at least one delegation and the final `→ Done` fit.
    pub fn new(max_transitions: usize) -> Self {
        Self {
            current: RouteState::Supervisor,
            max_transitions: max_transitions.max(2),
            exhausted: false,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> RouteState {
        self.current
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Whether the cap forced termination.
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn max_transitions(&self) -> usize {
        self.max_transitions
    }

    /// Move to `to`, or to `Done` when taking the edge would leave no room
    /// for the terminating transition.
    ///
    /// Returns the state actually entered.
    pub fn advance(
        &mut self,
        to: RouteState,
        reason: Option<&str>,
    ) -> Result<RouteState, IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        if to != RouteState::Done && self.transitions.len() + 1 >= self.max_transitions {
            tracing::warn!(
                from = %self.current,
                wanted = %to,
                cap = self.max_transitions,
                "Transition cap reached, forcing Done"
            );
            self.exhausted = true;
            self.record(RouteState::Done, Some("transition cap reached"), true);
            return Ok(RouteState::Done);
        }

        self.record(to, reason, false);
        Ok(to)
    }

    /// Terminate from any non-terminal state.
    pub fn finish(&mut self, reason: &str) -> Result<RouteState, IllegalTransition> {
        self.advance(RouteState::Done, Some(reason))
    }

    fn record(&mut self, to: RouteState, reason: Option<&str>, forced: bool) {
        tracing::debug!(
            from = %self.current,
            to = %to,
            n = self.transitions.len() + 1,
            forced,
            "Route transition"
        );
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
            forced,
        });
        self.current = to;
    }

    /// One-line history, e.g. `Supervisor → Retriever → Supervisor → Done (3 transitions)`.
    pub fn summary(&self) -> String {
        let mut path = vec![RouteState::Supervisor.to_string()];
        path.extend(self.transitions.iter().map(|t| t.to.to_string()));
        format!(
            "{} ({} transitions{})",
            path.join(" → "),
            self.transitions.len(),
            if self.exhausted { ", cap reached" } else { "" }
        )
    }
}
