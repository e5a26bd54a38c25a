//! Deterministic in-process model.
//!
//! Replies come from per-node queues; once a queue runs dry the node's
//! repeating reply (if any) is used, otherwise the call fails with
//! `ScriptExhausted`. Every request is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{LanguageModel, ModelReply, ModelRequest};
use crate::agents::AgentNode;
use crate::errors::ModelError;

/// One scripted step.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(ModelReply),
    /// Fail with a transport error carrying this message.
    Fail(String),
}

/// What the model was asked, captured per call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub node: AgentNode,
    pub tools: Vec<String>,
    pub note: Option<String>,
    pub transcript_len: usize,
}

#[derive(Default)]
pub struct ScriptedModel {
    queues: Mutex<HashMap<AgentNode, VecDeque<ScriptStep>>>,
    repeating: HashMap<AgentNode, ModelReply>,
    latency: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, node: AgentNode, reply: ModelReply) -> Self {
        self.step(node, ScriptStep::Reply(reply))
    }

    pub fn replies(mut self, node: AgentNode, replies: impl IntoIterator<Item = ModelReply>) -> Self {
        for reply in replies {
            self = self.reply(node, reply);
        }
        self
    }

    pub fn fail(self, node: AgentNode, message: impl Into<String>) -> Self {
        self.step(node, ScriptStep::Fail(message.into()))
    }

    /// Answer with `reply` whenever `node`'s queue is empty.
    pub fn repeat(mut self, node: AgentNode, reply: ModelReply) -> Self {
        self.repeating.insert(node, reply);
        self
    }

    /// Sleep before every reply, to exercise cancellation and timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn step(self, node: AgentNode, step: ScriptStep) -> Self {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(node)
            .or_default()
            .push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Nodes in the order they called the model.
    pub fn call_order(&self) -> Vec<AgentNode> {
        self.requests().into_iter().map(|r| r.node).collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                node: request.node,
                tools: request.tool_names(),
                note: request.note.map(String::from),
                transcript_len: request.transcript.len(),
            });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&request.node)
            .and_then(VecDeque::pop_front);

        match next {
            Some(ScriptStep::Reply(reply)) => Ok(reply),
            Some(ScriptStep::Fail(message)) => Err(ModelError::Transport(message)),
            None => self
                .repeating
                .get(&request.node)
                .cloned()
                .map(regenerate_ids)
                .ok_or(ModelError::ScriptExhausted(request.node)),
        }
    }
}

/// Repeated replies must not reuse tool-call ids.
fn regenerate_ids(mut reply: ModelReply) -> ModelReply {
    for call in &mut reply.tool_calls {
        call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Message, Transcript};

    fn transcript() -> Transcript {
        Transcript::from_messages(vec![Message::user("hi")]).unwrap()
    }

    fn request<'a>(node: AgentNode, t: &'a Transcript) -> ModelRequest<'a> {
        ModelRequest {
            node,
            instructions: "",
            transcript: t,
            note: Some("go"),
            tools: &[],
        }
    }

    #[tokio::test]
    async fn test_queues_are_per_node() {
        let model = ScriptedModel::new()
            .reply(AgentNode::Supervisor, ModelReply::text("sup"))
            .reply(AgentNode::Retriever, ModelReply::text("ret"));
        let t = transcript();

        let r = model.complete(request(AgentNode::Retriever, &t)).await.unwrap();
        assert_eq!(r.text.as_deref(), Some("ret"));
        let s = model.complete(request(AgentNode::Supervisor, &t)).await.unwrap();
        assert_eq!(s.text.as_deref(), Some("sup"));

        assert_eq!(model.call_order(), vec![AgentNode::Retriever, AgentNode::Supervisor]);
        assert_eq!(model.requests()[0].note.as_deref(), Some("go"));
    }

    #[tokio::test]
    async fn test_exhaustion_and_repeat() {
        let model = ScriptedModel::new().repeat(AgentNode::Executor, ModelReply::report("again"));
        let t = transcript();

        let a = model.complete(request(AgentNode::Executor, &t)).await.unwrap();
        let b = model.complete(request(AgentNode::Executor, &t)).await.unwrap();
        assert_ne!(a.tool_calls[0].id, b.tool_calls[0].id);

        let err = model
            .complete(request(AgentNode::Retriever, &t))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::ScriptExhausted(AgentNode::Retriever)));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::new().fail(AgentNode::Supervisor, "connection refused");
        let t = transcript();
        let err = model
            .complete(request(AgentNode::Supervisor, &t))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
