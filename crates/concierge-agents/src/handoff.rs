//! Handoff protocol: delegation (Supervisor → worker) and report-back
//! (worker → Supervisor).
//!
//! Handoffs are offered to the model as ordinary tool definitions so it can
//! emit them with the same structured-call mechanism it uses for domain tools.
//! The state machine intercepts them before dispatch; they never reach a tool
//! provider.

use rig::completion::ToolDefinition;
use serde::{Deserialize, Serialize};

use crate::agents::AgentNode;
use crate::transcript::ToolCall;

pub const DELEGATE_TO_RETRIEVER: &str = "delegate_to_retriever";
pub const DELEGATE_TO_EXECUTOR: &str = "delegate_to_executor";
pub const REPORT_BACK: &str = "report_back";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffKind {
    Delegate,
    Report,
}

/// The only channel through which control moves between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffCommand {
    pub kind: HandoffKind,
    pub target: AgentNode,
    pub note: String,
}

impl HandoffCommand {
    pub fn delegate(target: AgentNode, note: impl Into<String>) -> Self {
        Self {
            kind: HandoffKind::Delegate,
            target,
            note: note.into(),
        }
    }

    pub fn report(note: impl Into<String>) -> Self {
        Self {
            kind: HandoffKind::Report,
            target: AgentNode::Supervisor,
            note: note.into(),
        }
    }

    /// Interpret a tool call as a handoff emitted by `from`.
    ///
    /// Returns `None` when the call is not a handoff this node may use; a
    /// supervisor calling `report_back` is treated as an unknown tool.
    pub fn from_tool_call(from: AgentNode, call: &ToolCall) -> Option<Self> {
        let note = call
            .args
            .get("note")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let command = match call.name.as_str() {
            DELEGATE_TO_RETRIEVER => Self::delegate(AgentNode::Retriever, note),
            DELEGATE_TO_EXECUTOR => Self::delegate(AgentNode::Executor, note),
            REPORT_BACK => Self::report(note),
            _ => return None,
        };
        (command.kind == from.handoff_kind() && from.handoff_targets().contains(&command.target))
            .then_some(command)
    }
}

/// Whether `name` is reserved for a handoff operation.
pub fn is_handoff_tool(name: &str) -> bool {
    matches!(name, DELEGATE_TO_RETRIEVER | DELEGATE_TO_EXECUTOR | REPORT_BACK)
}

fn note_parameters(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "note": {
                "type": "string",
                "description": description
            }
        },
        "required": ["note"]
    })
}

/// Handoff operations offered to `node`.
pub fn definitions_for(node: AgentNode) -> Vec<ToolDefinition> {
    match node {
        AgentNode::Supervisor => vec![
            ToolDefinition {
                name: DELEGATE_TO_RETRIEVER.into(),
                description: "Hand the task to the retriever, which can search the web, \
                              read the user's inbox and list calendar events. Use for \
                              information requests and as the first phase of compound requests."
                    .into(),
                parameters: note_parameters(
                    "What the retriever should find out, with all known details.",
                ),
            },
            ToolDefinition {
                name: DELEGATE_TO_EXECUTOR.into(),
                description: "Hand the task to the executor, which can send email and \
                              create or delete calendar events. Only delegate once every \
                              required detail is known."
                    .into(),
                parameters: note_parameters(
                    "The action to perform. Paste any retriever findings verbatim.",
                ),
            },
        ],
        AgentNode::Retriever | AgentNode::Executor => vec![ToolDefinition {
            name: REPORT_BACK.into(),
            description: "Return control to the supervisor. Use when the request needs a \
                          capability you do not have or is missing required details. \
                          Never guess missing details."
                .into(),
            parameters: note_parameters("What you found or what is missing, and why."),
        }],
    }
}
