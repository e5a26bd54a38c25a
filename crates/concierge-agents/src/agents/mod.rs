//! Agent nodes of the supervisor/worker graph.
//!
//! Three nodes share one transcript:
//!
//! - **Supervisor**: pure coordinator. No domain tools, only the two
//!   delegation handoffs.
//! - **Retriever**: read-only tools (search, inbox, calendar listing) plus
//!   `report_back`.
//! - **Executor**: side-effecting tools (send mail, create/delete events) plus
//!   `report_back`.
//!
//! The concrete tool sets live in [`crate::tools::bundles`]; this module only
//! describes who may hand off to whom.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::handoff::HandoffKind;

/// One node of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentNode {
    Supervisor,
    Retriever,
    Executor,
}

impl AgentNode {
    pub const ALL: [AgentNode; 3] = [Self::Supervisor, Self::Retriever, Self::Executor];

    /// Agent name used to label transcript messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::Retriever => "retriever",
            Self::Executor => "executor",
        }
    }

    /// Workers are the nodes that own domain tools.
    pub fn is_worker(self) -> bool {
        !matches!(self, Self::Supervisor)
    }

    /// Handoff kind this node is allowed to emit.
    pub fn handoff_kind(self) -> HandoffKind {
        if self.is_worker() {
            HandoffKind::Report
        } else {
            HandoffKind::Delegate
        }
    }

    /// Nodes this node may transfer control to.
    pub fn handoff_targets(self) -> &'static [AgentNode] {
        match self {
            Self::Supervisor => &[Self::Retriever, Self::Executor],
            Self::Retriever | Self::Executor => &[Self::Supervisor],
        }
    }
}

impl fmt::Display for AgentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_delegates_to_both_workers() {
        let targets = AgentNode::Supervisor.handoff_targets();
        assert!(targets.contains(&AgentNode::Retriever));
        assert!(targets.contains(&AgentNode::Executor));
        assert_eq!(AgentNode::Supervisor.handoff_kind(), HandoffKind::Delegate);
    }

    #[test]
    fn test_workers_only_report_to_supervisor() {
        for worker in [AgentNode::Retriever, AgentNode::Executor] {
            assert!(worker.is_worker());
            assert_eq!(worker.handoff_targets(), &[AgentNode::Supervisor]);
            assert_eq!(worker.handoff_kind(), HandoffKind::Report);
        }
    }

    #[test]
    fn test_serde_uses_agent_names() {
        let json = serde_json::to_string(&AgentNode::Retriever).unwrap();
        assert_eq!(json, "\"retriever\"");
        assert_eq!(AgentNode::Executor.to_string(), "executor");
    }
}
