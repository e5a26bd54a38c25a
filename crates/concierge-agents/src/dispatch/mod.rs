//! Tool dispatch layer.
//!
//! `dispatch` never fails outward. Unknown tools, policy refusals, argument
//! errors, provider failures and timeouts all come back as a [`ToolResult`]
//! whose payload carries an `error` field, so the calling agent can observe
//! the failure and react to it.
//!
//! Per call the layer performs, in order:
//! 1. resolution against the invoking node's tool set,
//! 2. argument normalization ([`normalize`]),
//! 3. the permission check (and approval, when required),
//! 4. exactly one handler invocation under the tool timeout.

pub mod normalize;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use serde_json::Value;
use tracing::{info, warn};

use crate::agents::AgentNode;
use crate::context::RunContext;
use crate::report::{truncate, ToolEvent, ToolOutcome, PREVIEW_LEN};
use crate::tools::permissions::{
    ApprovalGate, ApprovalRequest, AutoApprove, ToolPermission, ToolPolicy,
};
use crate::tools::registry::ToolRegistry;
use crate::transcript::{ToolCall, ToolResult};

pub const TOOL_NOT_AVAILABLE: &str = "tool not available";
pub const TOOL_BLOCKED: &str = "tool blocked by policy";
pub const APPROVAL_DENIED: &str = "approval denied";

/// A finished dispatch: the transcript entry plus its accounting record.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub result: ToolResult,
    pub event: ToolEvent,
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
    gate: Arc<dyn ApprovalGate>,
    default_zone: Tz,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, default_zone: Tz, timeout: Duration) -> Self {
        Self {
            registry,
            policy: ToolPolicy::default(),
            gate: Arc::new(AutoApprove),
            default_zone,
            timeout,
        }
    }

    pub fn with_policy(mut self, policy: ToolPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `call` on behalf of `node`.
    pub async fn dispatch(
        &self,
        node: AgentNode,
        call: &ToolCall,
        ctx: &RunContext,
    ) -> Dispatched {
        let started = Instant::now();
        let args_preview = truncate(&Value::Object(call.args.clone()).to_string(), PREVIEW_LEN);

        let result = self.execute(node, call, ctx).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let outcome = if result.is_error() {
            ToolOutcome::Error
        } else {
            ToolOutcome::Success
        };
        info!(
            agent = %node,
            tool = %call.name,
            duration_ms,
            outcome = ?outcome,
            "Tool call completed"
        );

        let event = ToolEvent {
            agent: node,
            tool: call.name.clone(),
            args_preview,
            result_preview: truncate(&result.payload.to_string(), PREVIEW_LEN),
            duration_ms,
            outcome,
        };
        Dispatched { result, event }
    }

    async fn execute(&self, node: AgentNode, call: &ToolCall, ctx: &RunContext) -> ToolResult {
        let Some(tool) = self.registry.resolve(node, &call.name) else {
            warn!(agent = %node, tool = %call.name, "Tool not available to this agent");
            return ToolResult::error(call, TOOL_NOT_AVAILABLE);
        };

        let normalized = normalize::normalize(
            &tool.spec,
            call.args.clone(),
            ctx.caller_identity.as_deref(),
            self.default_zone,
        );

        match self.policy.permission_for(&call.name) {
            ToolPermission::AlwaysAllow => {}
            ToolPermission::Blocked => {
                warn!(agent = %node, tool = %call.name, "Tool blocked by policy");
                return ToolResult::error(call, TOOL_BLOCKED).with_warnings(normalized.warnings);
            }
            ToolPermission::RequireApproval => {
                let request = ApprovalRequest::new(&call.name, &normalized.args);
                if !self.gate.approve(&request).await {
                    warn!(agent = %node, tool = %call.name, "Tool call not approved");
                    return ToolResult::error(call, APPROVAL_DENIED)
                        .with_warnings(normalized.warnings);
                }
            }
        }

        let raw_args = Value::Object(normalized.args).to_string();
        let outcome = tokio::time::timeout(self.timeout, tool.handler.call(raw_args)).await;

        let result = match outcome {
            Err(_) => {
                warn!(
                    agent = %node,
                    tool = %call.name,
                    timeout_secs = self.timeout.as_secs(),
                    "Tool call timed out"
                );
                ToolResult::error(
                    call,
                    format!("tool timed out after {}s", self.timeout.as_secs()),
                )
            }
            Ok(Err(err)) => ToolResult::error(call, describe_tool_error(err)),
            Ok(Ok(output)) => {
                let value = serde_json::from_str(&output).unwrap_or(Value::String(output));
                ToolResult::success(call, value)
            }
        };
        result.with_warnings(normalized.warnings)
    }
}

fn describe_tool_error(err: rig::tool::ToolError) -> String {
    match err {
        rig::tool::ToolError::ToolCallError(inner) => inner.to_string(),
        rig::tool::ToolError::JsonError(e) => format!("invalid arguments: {e}"),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}
