//! External tool providers (search, mail, calendar).
//!
//! Providers are addressed by the rig tools in this module tree; the
//! orchestrator never talks to them directly. The production transport is a
//! JSON-RPC 2.0 `tools/call` endpoint per service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{ProviderError, ToolError};

/// A remote capability that executes named operations.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Invoke provider operation `name` with a JSON argument object.
    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ProviderError>;
}

/// Provider speaking the JSON-RPC 2.0 `tools/call` envelope over HTTP.
pub struct JsonRpcToolProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcToolProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build tool provider HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn envelope(&self, name: &str, args: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "id": format!("tool_call-{id}"),
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": args,
            }
        })
    }
}

#[async_trait]
impl ToolProvider for JsonRpcToolProvider {
    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ProviderError> {
        let body = self.envelope(name, args);
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!("HTTP {status}: {text}")));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        debug!(endpoint = %self.endpoint, tool = name, "JSON-RPC reply received");
        parse_rpc_reply(reply)
    }
}

/// Unwrap a JSON-RPC reply into the tool's payload.
///
/// Successful replies carry MCP-style content blocks; the first block's text
/// is decoded as JSON when possible and returned as a string otherwise.
pub fn parse_rpc_reply(reply: Value) -> Result<Value, ProviderError> {
    if let Some(error) = reply.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error")
            .to_string();
        if message.to_lowercase().contains("not authenticated") {
            return Err(ProviderError::AuthenticationRequired(message));
        }
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32603);
        return Err(ProviderError::Rejected { code, message });
    }

    let result = reply
        .get("result")
        .ok_or_else(|| ProviderError::Malformed("reply has neither result nor error".into()))?;

    let first_text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str);

    Ok(match first_text {
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        None => result.clone(),
    })
}

/// The three provider families a deployment wires up. Any may be absent; the
/// tools that need a missing provider fail with `NotConfigured`.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub search: Option<Arc<dyn ToolProvider>>,
    pub mail: Option<Arc<dyn ToolProvider>>,
    pub calendar: Option<Arc<dyn ToolProvider>>,
}

impl ProviderSet {
    /// Route every family to the same provider. Handy for tests and for
    /// gateways that multiplex all services behind one endpoint.
    pub fn uniform(provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            search: Some(provider.clone()),
            mail: Some(provider.clone()),
            calendar: Some(provider),
        }
    }
}

/// Shared lookup used by the tool handlers.
pub(crate) fn require(
    provider: &Option<Arc<dyn ToolProvider>>,
    family: &str,
) -> Result<Arc<dyn ToolProvider>, ProviderError> {
    provider
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured(family.to_string()))
}

/// Acting account for identity-scoped handlers.
pub(crate) fn require_user(user_id: Option<String>) -> Result<String, ToolError> {
    user_id.ok_or_else(|| ToolError::InvalidArguments("missing field `user_id`".into()))
}
