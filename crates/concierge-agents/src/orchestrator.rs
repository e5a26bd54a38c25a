//! Orchestration run: Supervisor ↔ worker routing over one shared transcript.
//!
//! A run appends the user message, starts at the Supervisor and visits nodes
//! until the routing machine reaches `Done`. Each visit loops the node's
//! model (at most `max_node_steps` calls) dispatching any domain tool calls
//! between steps. A visit ends when the model:
//!
//! - answers in plain text,
//! - emits a handoff (`delegate_to_*` or `report_back`), or
//! - runs out of steps.
//!
//! Workers always return to the Supervisor. The Supervisor either delegates
//! or, with no handoff, ends the run. The final answer is picked from this
//! turn's messages by the [`Synthesizer`].

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::agents::AgentNode;
use crate::config::OrchestratorConfig;
use crate::context::RunContext;
use crate::dispatch::Dispatcher;
use crate::errors::RunError;
use crate::handoff::HandoffCommand;
use crate::model::{LanguageModel, ModelRequest};
use crate::prompts;
use crate::report::RunReport;
use crate::state_machine::{RouteState, RoutingMachine, TransitionRecord};
use crate::synthesizer::{Synthesizer, DEFAULT_MIN_WORKER_CHARS};
use crate::tools::{ApprovalGate, ProviderSet, ToolRegistry};
use crate::transcript::{AgentMessage, Message, ToolCall, Transcript};

pub const DEFAULT_MAX_TRANSITIONS: usize = 25;
pub const DEFAULT_MAX_NODE_STEPS: usize = 10;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub answer: String,
    /// Prior conversation plus this turn. Hand it back on the next turn.
    pub transcript: Transcript,
    pub transitions: Vec<TransitionRecord>,
    /// The transition cap ended the run.
    pub exhausted: bool,
    pub report: RunReport,
}

/// How a node visit ended.
#[derive(Debug)]
struct VisitOutcome {
    handoff: Option<HandoffCommand>,
    out_of_steps: bool,
}

/// A reply's tool calls split into the honoured handoff and domain calls.
struct SplitCalls {
    handoff: Option<HandoffCommand>,
    domain: Vec<ToolCall>,
}

fn split_calls(node: AgentNode, calls: Vec<ToolCall>) -> SplitCalls {
    let mut handoff = None;
    let mut domain = Vec::new();
    for call in calls {
        match HandoffCommand::from_tool_call(node, &call) {
            Some(command) if handoff.is_none() => handoff = Some(command),
            Some(extra) => warn!(
                agent = %node,
                target = %extra.target,
                "Dropping additional handoff in the same reply"
            ),
            None => domain.push(call),
        }
    }
    SplitCalls { handoff, domain }
}

/// Await `fut` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, RunError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RunError::Cancelled),
        out = fut => Ok(out),
    }
}

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    dispatcher: Dispatcher,
    max_transitions: usize,
    max_node_steps: usize,
    synthesizer: Synthesizer,
    today: Option<NaiveDate>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, dispatcher: Dispatcher) -> Self {
        Self {
            model,
            dispatcher,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            max_node_steps: DEFAULT_MAX_NODE_STEPS,
            synthesizer: Synthesizer::new(DEFAULT_MIN_WORKER_CHARS),
            today: None,
        }
    }

    /// Standard tool table over `providers`, with limits, zone, timeout and
    /// permissions taken from `config`.
    pub fn from_config(
        model: Arc<dyn LanguageModel>,
        providers: &ProviderSet,
        config: &OrchestratorConfig,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let registry = ToolRegistry::standard(providers)
            .map_err(|e| RunError::Configuration(e.to_string()))?;
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            config.default_zone()?,
            config.tool_timeout(),
        )
        .with_policy(config.policy());
        Ok(Self::new(model, dispatcher)
            .with_max_transitions(config.max_transitions)
            .with_max_node_steps(config.max_node_steps)
            .with_min_worker_chars(config.min_worker_answer_chars))
    }

    pub fn with_max_transitions(mut self, max: usize) -> Self {
        self.max_transitions = max;
        self
    }

    pub fn with_max_node_steps(mut self, max: usize) -> Self {
        self.max_node_steps = max.max(1);
        self
    }

    pub fn with_min_worker_chars(mut self, min: usize) -> Self {
        self.synthesizer = Synthesizer::new(min);
        self
    }

    /// Pin the date stamped into node instructions. Defaults to the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.dispatcher = self.dispatcher.with_approval_gate(gate);
        self
    }

    /// Run one turn and return only the answer.
    pub async fn run_once(
        &self,
        user_text: &str,
        prior: Transcript,
        ctx: &RunContext,
    ) -> Result<String, RunError> {
        Ok(self.run_turn(user_text, prior, ctx).await?.answer)
    }

    pub async fn run_turn(
        &self,
        user_text: &str,
        prior: Transcript,
        ctx: &RunContext,
    ) -> Result<RunOutput, RunError> {
        self.run_turn_cancellable(user_text, prior, ctx, &CancellationToken::new())
            .await
    }

    /// Run one turn, aborting at the next model or tool call once `cancel`
    /// fires. A cancelled run returns [`RunError::Cancelled`] and its partial
    /// transcript is dropped.
    pub async fn run_turn_cancellable(
        &self,
        user_text: &str,
        prior: Transcript,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        let span = info_span!(
            "run",
            run_id = %ctx.run_id,
            caller = ctx.caller_identity.as_deref().unwrap_or("anonymous"),
        );
        self.drive(user_text, prior, ctx, cancel)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        user_text: &str,
        prior: Transcript,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, RunError> {
        let mut transcript = prior;
        let turn_start = transcript.len();
        transcript.push(Message::user(user_text))?;

        let mut machine = RoutingMachine::new(self.max_transitions);
        let mut report = RunReport::new(ctx.run_id);
        let mut pending_note: Option<String> = None;

        info!(
            prior_messages = turn_start,
            max_transitions = machine.max_transitions(),
            "Run started"
        );

        while let Some(node) = machine.current().node() {
            let note = pending_note.take();
            let outcome = self
                .visit(node, note.as_deref(), &mut transcript, &mut report, ctx, cancel)
                .await?;

            let (next, reason) = match (node, outcome.handoff) {
                (AgentNode::Supervisor, Some(handoff)) => {
                    let target = RouteState::from(handoff.target);
                    pending_note = Some(handoff.note);
                    (target, "delegated")
                }
                (AgentNode::Supervisor, None) if outcome.out_of_steps => {
                    (RouteState::Done, "supervisor step budget exhausted")
                }
                (AgentNode::Supervisor, None) => (RouteState::Done, "supervisor answered"),
                (_, Some(_)) => (RouteState::Supervisor, "reported back"),
                (_, None) if outcome.out_of_steps => {
                    (RouteState::Supervisor, "worker step budget exhausted")
                }
                (_, None) => (RouteState::Supervisor, "worker finished"),
            };
            machine.advance(next, Some(reason))?;
        }

        report.finish();
        let answer = self
            .synthesizer
            .select_since(&transcript, turn_start)
            .to_string();

        info!(
            route = %machine.summary(),
            model_calls = report.model_calls,
            tool_calls = report.total_tool_calls(),
            failed_tool_calls = report.failed_tool_calls(),
            wall_time_ms = report.wall_time_ms,
            exhausted = machine.exhausted(),
            "Run complete"
        );

        Ok(RunOutput {
            answer,
            transcript,
            transitions: machine.transitions().to_vec(),
            exhausted: machine.exhausted(),
            report,
        })
    }

    /// One visit to `node`: model steps and tool dispatch until the node
    /// answers, hands off, or runs out of steps.
    async fn visit(
        &self,
        node: AgentNode,
        note: Option<&str>,
        transcript: &mut Transcript,
        report: &mut RunReport,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<VisitOutcome, RunError> {
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let instructions = prompts::instructions_for(node, today);
        let tools = self.dispatcher.registry().definitions_for(node).await;

        report.record_visit(node);
        info!(agent = %node, delegated = note.is_some(), "Visiting node");

        for step in 0..self.max_node_steps {
            let request = ModelRequest {
                node,
                instructions: &instructions,
                transcript: &*transcript,
                note: if step == 0 { note } else { None },
                tools: &tools,
            };
            let reply = cancellable(cancel, self.model.complete(request))
                .await?
                .map_err(|source| {
                    error!(agent = %node, step, error = %source, "Model call failed");
                    RunError::Model { node, source }
                })?;
            report.record_model_call();

            let SplitCalls { handoff, domain } = split_calls(node, reply.tool_calls);
            let text = reply.text.filter(|t| !t.trim().is_empty());
            if text.is_none() && domain.is_empty() && handoff.is_none() {
                info!(agent = %node, step, "Nothing to add, ending visit");
                return Ok(VisitOutcome {
                    handoff: None,
                    out_of_steps: false,
                });
            }

            transcript.push(Message::Agent(AgentMessage {
                agent: node,
                text,
                tool_calls: domain.clone(),
                handoff: handoff.clone(),
                delegation_narration: Some(handoff.is_some()),
            }))?;

            for call in &domain {
                let dispatched = cancellable(cancel, self.dispatcher.dispatch(node, call, ctx)).await?;
                report.record_tool(dispatched.event);
                transcript.push(Message::ToolResult(dispatched.result))?;
            }

            if let Some(handoff) = handoff {
                info!(
                    agent = %node,
                    target = %handoff.target,
                    kind = ?handoff.kind,
                    "Handoff"
                );
                return Ok(VisitOutcome {
                    handoff: Some(handoff),
                    out_of_steps: false,
                });
            }
            if domain.is_empty() {
                return Ok(VisitOutcome {
                    handoff: None,
                    out_of_steps: false,
                });
            }
        }

        warn!(
            agent = %node,
            max_node_steps = self.max_node_steps,
            "Step budget exhausted, ending visit"
        );
        Ok(VisitOutcome {
            handoff: None,
            out_of_steps: true,
        })
    }
}
