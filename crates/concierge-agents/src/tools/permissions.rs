//! Tool permission policy and the approval seam.
//!
//! Every dispatch consults [`ToolPolicy`] before touching a provider.
//! `require_approval` tools go through an injected [`ApprovalGate`]; the
//! default gate approves everything and leaves an audit line in the log.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPermission {
    AlwaysAllow,
    RequireApproval,
    Blocked,
}

/// Name → permission table. Tools missing from the table require approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolPolicy {
    permissions: HashMap<String, ToolPermission>,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        let permissions = [
            ("web_search", ToolPermission::AlwaysAllow),
            ("read_emails", ToolPermission::AlwaysAllow),
            ("list_events", ToolPermission::AlwaysAllow),
            ("send_email", ToolPermission::RequireApproval),
            ("create_event", ToolPermission::RequireApproval),
            ("delete_event", ToolPermission::RequireApproval),
        ]
        .into_iter()
        .map(|(name, p)| (name.to_string(), p))
        .collect();
        Self { permissions }
    }
}

impl ToolPolicy {
    pub fn permission_for(&self, tool: &str) -> ToolPermission {
        self.permissions
            .get(tool)
            .copied()
            .unwrap_or(ToolPermission::RequireApproval)
    }

    /// Layer `overrides` on top of this policy.
    pub fn merged(mut self, overrides: &HashMap<String, ToolPermission>) -> Self {
        for (name, permission) in overrides {
            self.permissions.insert(name.clone(), *permission);
        }
        self
    }

    pub fn set(&mut self, tool: impl Into<String>, permission: ToolPermission) {
        self.permissions.insert(tool.into(), permission);
    }
}

/// What an approver gets to see before a side effect happens.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub tool: String,
    pub args: Map<String, Value>,
    pub summary: String,
}

impl ApprovalRequest {
    pub fn new(tool: &str, args: &Map<String, Value>) -> Self {
        Self {
            tool: tool.to_string(),
            args: args.clone(),
            summary: summarize(tool, args),
        }
    }
}

fn field(args: &Map<String, Value>, key: &str) -> String {
    match args.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Human-readable description of a pending side effect.
fn summarize(tool: &str, args: &Map<String, Value>) -> String {
    match tool {
        "send_email" => format!(
            "Request to send email:\nTo: {}\nSubject: {}\nCC: {}",
            field(args, "to"),
            field(args, "subject"),
            field(args, "cc"),
        ),
        "create_event" => format!(
            "Request to create event:\nSummary: {}\nStart: {}\nEnd: {}",
            field(args, "summary"),
            field(args, "start"),
            field(args, "end"),
        ),
        "delete_event" => format!(
            "Request to delete event with ID: {}",
            field(args, "eventId")
        ),
        _ => format!(
            "Request to use {tool} with arguments: {}",
            Value::Object(args.clone())
        ),
    }
}

/// Decides whether a `require_approval` tool call may proceed.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn approve(&self, request: &ApprovalRequest) -> bool;
}

/// Approves every request. Used when no interactive approver is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn approve(&self, request: &ApprovalRequest) -> bool {
        info!(tool = %request.tool, summary = %request.summary, "Auto-approving tool call");
        true
    }
}
