//! Adapter from any rig `CompletionModel` to [`LanguageModel`].
//!
//! The transcript is rendered from the visiting node's point of view: its own
//! messages become assistant turns, everything else (the user, other agents,
//! tool results) becomes labelled user turns. Tool calls are requested with
//! the node's bounded tool list and returned unexecuted; the orchestrator
//! dispatches them.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};
use tracing::debug;

use super::{LanguageModel, ModelReply, ModelRequest};
use crate::agents::AgentNode;
use crate::errors::ModelError;
use crate::transcript::{self, ToolCall};

pub struct RigModel<M: CompletionModel> {
    model: M,
    temperature: Option<f64>,
    timeout: Duration,
}

impl<M: CompletionModel> RigModel<M> {
    pub fn new(model: M, timeout: Duration) -> Self {
        Self {
            model,
            temperature: None,
            timeout,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

fn render_agent(viewer: AgentNode, msg: &transcript::AgentMessage) -> Message {
    let mut text = msg.text.clone().unwrap_or_default();
    for call in &msg.tool_calls {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!(
            "(called {} with {})",
            call.name,
            serde_json::Value::Object(call.args.clone())
        ));
    }
    if let Some(handoff) = &msg.handoff {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("(handed off to {}: {})", handoff.target, handoff.note));
    }
    if msg.agent == viewer {
        Message::assistant(text)
    } else {
        Message::user(format!("[{}] {}", msg.agent, text))
    }
}

/// Render the transcript as rig messages for `viewer`.
pub fn render_history(viewer: AgentNode, transcript: &transcript::Transcript) -> Vec<Message> {
    transcript
        .messages()
        .iter()
        .map(|m| match m {
            transcript::Message::User(u) => Message::user(u.text.clone()),
            transcript::Message::Agent(a) => render_agent(viewer, a),
            transcript::Message::ToolResult(r) => {
                Message::user(format!("[tool result: {}] {}", r.tool, r.payload))
            }
        })
        .collect()
}

/// Fold assistant content into a reply. An empty choice stays an empty
/// reply; the orchestrator reads it as "nothing to add".
fn collect_reply<'a>(contents: impl IntoIterator<Item = &'a AssistantContent>) -> ModelReply {
    let mut reply = ModelReply::default();
    let mut texts = Vec::new();
    for content in contents {
        match content {
            AssistantContent::Text(t) => texts.push(t.text.clone()),
            AssistantContent::ToolCall(call) => reply.tool_calls.push(ToolCall::new(
                call.id.clone(),
                call.function.name.clone(),
                call.function.arguments.clone(),
            )),
            _ => {}
        }
    }
    if !texts.is_empty() {
        reply.text = Some(texts.join("\n"));
    }
    reply
}

#[async_trait]
impl<M> LanguageModel for RigModel<M>
where
    M: CompletionModel + Send + Sync,
{
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
        let mut history = render_history(request.node, request.transcript);
        let prompt = match request.note {
            Some(note) => Message::user(format!("[supervisor → {}] {note}", request.node)),
            None => history
                .pop()
                .ok_or_else(|| ModelError::InvalidResponse("empty transcript".into()))?,
        };

        let mut builder = self
            .model
            .completion_request(prompt)
            .preamble(request.instructions.to_string())
            .messages(history)
            .tools(request.tools.to_vec());
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| ModelError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let reply = collect_reply(response.choice.iter());

        debug!(
            agent = %request.node,
            tool_calls = reply.tool_calls.len(),
            has_text = reply.text.is_some(),
            "Model replied"
        );

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{AgentMessage, Message as TMessage, ToolResult, Transcript};
    use serde_json::json;

    #[test]
    fn test_history_is_rendered_from_viewer_side() {
        let call = ToolCall::new("c1", "web_search", json!({ "query": "tacos" }));
        let transcript = Transcript::from_messages(vec![
            TMessage::user("find tacos"),
            TMessage::Agent(AgentMessage {
                agent: AgentNode::Retriever,
                text: None,
                tool_calls: vec![call.clone()],
                handoff: None,
                delegation_narration: None,
            }),
            TMessage::ToolResult(ToolResult::success(&call, json!(["Taqueria Uno"]))),
        ])
        .unwrap();

        let as_retriever = render_history(AgentNode::Retriever, &transcript);
        assert_eq!(as_retriever.len(), 3);
        assert!(matches!(as_retriever[1], Message::Assistant { .. }));

        let as_supervisor = render_history(AgentNode::Supervisor, &transcript);
        assert!(matches!(as_supervisor[1], Message::User { .. }));
    }

    #[test]
    fn test_empty_choice_is_an_empty_reply() {
        let none: [AssistantContent; 0] = [];
        let reply = collect_reply(none.iter());
        assert!(reply.is_empty());
        assert_eq!(reply, ModelReply::default());
    }

    #[test]
    fn test_text_parts_are_joined() {
        let parts = [AssistantContent::text("Sent."), AssistantContent::text("Anything else?")];
        let reply = collect_reply(parts.iter());
        assert_eq!(reply.text.as_deref(), Some("Sent.\nAnything else?"));
        assert!(reply.tool_calls.is_empty());
    }
}
