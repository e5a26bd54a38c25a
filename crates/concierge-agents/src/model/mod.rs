//! The generative text model as seen by the orchestrator.
//!
//! A node visit renders one [`ModelRequest`] and receives one [`ModelReply`]:
//! free text, structured tool calls, or both. Handoffs arrive as tool calls
//! too; the orchestrator tells them apart.

pub mod rig_adapter;
pub mod scripted;

use async_trait::async_trait;
use rig::completion::ToolDefinition;
use serde_json::Value;

use crate::agents::AgentNode;
use crate::errors::ModelError;
use crate::handoff::{DELEGATE_TO_EXECUTOR, DELEGATE_TO_RETRIEVER, REPORT_BACK};
use crate::transcript::{ToolCall, Transcript};

pub use rig_adapter::RigModel;
pub use scripted::{RecordedRequest, ScriptedModel};

/// Everything a node's reasoning step may look at.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub node: AgentNode,
    pub instructions: &'a str,
    pub transcript: &'a Transcript,
    /// Delegation note that started this visit, if any.
    pub note: Option<&'a str>,
    pub tools: &'a [ToolDefinition],
}

impl ModelRequest<'_> {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

fn call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A single tool call with a fresh id.
    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self::default().and_call(name, args)
    }

    /// Delegation to a worker. The Supervisor is never a delegation target.
    pub fn delegate(target: AgentNode, note: impl Into<String>) -> Self {
        let name = match target {
            AgentNode::Retriever => DELEGATE_TO_RETRIEVER,
            AgentNode::Executor => DELEGATE_TO_EXECUTOR,
            AgentNode::Supervisor => unreachable!("the supervisor cannot be delegated to"),
        };
        Self::tool_call(name, serde_json::json!({ "note": note.into() }))
    }

    pub fn report(note: impl Into<String>) -> Self {
        Self::tool_call(REPORT_BACK, serde_json::json!({ "note": note.into() }))
    }

    /// Attach narration to a reply.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn and_call(mut self, name: impl Into<String>, args: Value) -> Self {
        self.tool_calls.push(ToolCall::new(call_id(), name, args));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
            && self
                .text
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
    }
}

/// A generative text model bound to the orchestrator's request shape.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delegate_reply_carries_note() {
        let reply = ModelReply::delegate(AgentNode::Executor, "email bob");
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, DELEGATE_TO_EXECUTOR);
        assert_eq!(reply.tool_calls[0].args["note"], "email bob");
        assert!(reply.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    #[should_panic(expected = "cannot be delegated to")]
    fn test_delegate_to_supervisor_panics() {
        let _ = ModelReply::delegate(AgentNode::Supervisor, "loop");
    }

    #[test]
    fn test_chained_calls_get_distinct_ids() {
        let reply = ModelReply::tool_call("web_search", json!({ "query": "a" }))
            .and_call("web_search", json!({ "query": "b" }));
        assert_ne!(reply.tool_calls[0].id, reply.tool_calls[1].id);
    }

    #[test]
    fn test_emptiness() {
        assert!(ModelReply::default().is_empty());
        assert!(ModelReply::text("  ").is_empty());
        assert!(!ModelReply::text("hi").is_empty());
        assert!(!ModelReply::report("stuck").is_empty());
    }
}
