//! The transcript: the ordered, append-only message log threaded through a run.
//!
//! A run owns its transcript exclusively. The caller may hand back a prior
//! transcript to continue a conversation; it is re-validated on entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agents::AgentNode;
use crate::errors::TranscriptError;
use crate::handoff::HandoffCommand;

/// A structured tool invocation requested by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Wire-level argument map; opaque to the state machine.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Build a call from any JSON value; non-object values become an empty map.
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent: AgentNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffCommand>,
    /// Recorded by the orchestrator for every message it appends: `true`
    /// when the message accompanied a handoff. `None` on messages that came
    /// from elsewhere, such as imported history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_narration: Option<bool>,
}

impl AgentMessage {
    /// Non-empty text with no tool calls attached.
    pub fn plain_text(&self) -> Option<&str> {
        if !self.tool_calls.is_empty() {
            return None;
        }
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Outcome of one dispatched tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool: String,
    /// `{"result": ...}` on success, `{"error": "..."}` on failure.
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ToolResult {
    pub fn success(call: &ToolCall, result: Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool: call.name.clone(),
            payload: serde_json::json!({ "result": result }),
            warnings: Vec::new(),
        }
    }

    pub fn error(call: &ToolCall, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool: call.name.clone(),
            payload: serde_json::json!({ "error": message.into() }),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User(UserMessage),
    Agent(AgentMessage),
    ToolResult(ToolResult),
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(UserMessage { text: text.into() })
    }

    /// A plain-text agent message with no tool calls or handoff.
    pub fn agent_text(agent: AgentNode, text: impl Into<String>) -> Self {
        Self::Agent(AgentMessage {
            agent,
            text: Some(text.into()),
            tool_calls: Vec::new(),
            handoff: None,
            delegation_narration: None,
        })
    }

    pub fn as_agent(&self) -> Option<&AgentMessage> {
        match self {
            Self::Agent(m) => Some(m),
            _ => None,
        }
    }
}

/// Ordered message log. Appends are validated; nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a transcript from stored messages, checking the interleaving.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, TranscriptError> {
        let mut transcript = Self::new();
        for message in messages {
            transcript.push(message)?;
        }
        Ok(transcript)
    }

    pub fn push(&mut self, message: Message) -> Result<(), TranscriptError> {
        match &message {
            Message::User(_) => {}
            _ if self.messages.is_empty() => return Err(TranscriptError::MustStartWithUser),
            Message::ToolResult(result) => {
                if self.find_call(&result.tool_call_id).is_none() {
                    return Err(TranscriptError::OrphanToolResult(
                        result.tool_call_id.clone(),
                    ));
                }
            }
            Message::Agent(_) => {}
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// The agent and call that produced tool call `id`, if any.
    pub fn find_call(&self, id: &str) -> Option<(AgentNode, &ToolCall)> {
        self.messages.iter().rev().find_map(|m| {
            let agent = m.as_agent()?;
            agent
                .tool_calls
                .iter()
                .find(|c| c.id == id)
                .map(|c| (agent.agent, c))
        })
    }

    /// All tool calls issued by `agent`, in order.
    pub fn tool_calls_by(&self, agent: AgentNode) -> impl Iterator<Item = &ToolCall> {
        self.messages
            .iter()
            .filter_map(Message::as_agent)
            .filter(move |m| m.agent == agent)
            .flat_map(|m| m.tool_calls.iter())
    }

    /// Handoffs in transcript order.
    pub fn handoffs(&self) -> impl Iterator<Item = (AgentNode, &HandoffCommand)> {
        self.messages
            .iter()
            .filter_map(Message::as_agent)
            .filter_map(|m| m.handoff.as_ref().map(|h| (m.agent, h)))
    }
}

impl TryFrom<Vec<Message>> for Transcript {
    type Error = TranscriptError;

    fn try_from(messages: Vec<Message>) -> Result<Self, Self::Error> {
        Self::from_messages(messages)
    }
}

impl From<Transcript> for Vec<Message> {
    fn from(transcript: Transcript) -> Self {
        transcript.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent_with_call(agent: AgentNode, id: &str) -> Message {
        Message::Agent(AgentMessage {
            agent,
            text: None,
            tool_calls: vec![ToolCall::new(id, "web_search", json!({"query": "tacos"}))],
            handoff: None,
            delegation_narration: None,
        })
    }

    #[test]
    fn test_must_start_with_user() {
        let mut t = Transcript::new();
        let err = t
            .push(Message::agent_text(AgentNode::Supervisor, "hi"))
            .unwrap_err();
        assert_eq!(err, TranscriptError::MustStartWithUser);
        assert!(t.is_empty());
    }

    #[test]
    fn test_tool_result_needs_prior_call() {
        let mut t = Transcript::new();
        t.push(Message::user("find tacos")).unwrap();
        let call = ToolCall::new("c-1", "web_search", json!({}));
        let err = t
            .push(Message::ToolResult(ToolResult::success(&call, json!([]))))
            .unwrap_err();
        assert_eq!(err, TranscriptError::OrphanToolResult("c-1".into()));

        t.push(agent_with_call(AgentNode::Retriever, "c-1")).unwrap();
        t.push(Message::ToolResult(ToolResult::success(&call, json!([]))))
            .unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.find_call("c-1").unwrap().0, AgentNode::Retriever);
    }

    #[test]
    fn test_from_messages_revalidates() {
        let call = ToolCall::new("x", "send_email", json!({}));
        let bad = vec![
            Message::user("hi"),
            Message::ToolResult(ToolResult::error(&call, "boom")),
        ];
        assert!(Transcript::from_messages(bad).is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_roles() {
        let mut t = Transcript::new();
        t.push(Message::user("hello")).unwrap();
        t.push(agent_with_call(AgentNode::Retriever, "c-9")).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[1]["role"], "agent");
        assert_eq!(json[1]["agent"], "retriever");

        let restored: Transcript = serde_json::from_value(json).unwrap();
        assert_eq!(restored, t);
    }

    #[test]
    fn test_deserialize_rejects_broken_interleaving() {
        let json = json!([{ "role": "agent", "agent": "supervisor", "text": "hi" }]);
        assert!(serde_json::from_value::<Transcript>(json).is_err());
    }

    #[test]
    fn test_plain_text_ignores_tool_call_messages() {
        let msg = agent_with_call(AgentNode::Retriever, "c");
        assert!(msg.as_agent().unwrap().plain_text().is_none());

        let blank = Message::agent_text(AgentNode::Executor, "   ");
        assert!(blank.as_agent().unwrap().plain_text().is_none());
    }

    #[test]
    fn test_tool_result_error_accessors() {
        let call = ToolCall::new("c", "send_email", json!({}));
        let result = ToolResult::error(&call, "tool not available");
        assert!(result.is_error());
        assert_eq!(result.error_message(), Some("tool not available"));
        assert!(!ToolResult::success(&call, json!("ok")).is_error());
    }
}
