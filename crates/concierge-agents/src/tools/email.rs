//! Mail tools: inbox reading (Retriever) and sending (Executor).
//!
//! Both act on behalf of `user_id`. The dispatch layer injects it from the
//! run's caller identity when the model leaves it out, so the schemas list it
//! as optional even though the handlers require it.

use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use super::providers::{require, require_user, ToolProvider};
use crate::errors::ToolError;

const GET_MESSAGES: &str = "get_gmail_messages";
const SEND_MESSAGE: &str = "send_gmail_message";

#[derive(Debug, Deserialize)]
pub struct ReadEmailsArgs {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

pub struct ReadEmailsTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl ReadEmailsTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

impl Tool for ReadEmailsTool {
    const NAME: &'static str = "read_emails";
    type Error = ToolError;
    type Args = ReadEmailsArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Read messages from the user's inbox. Supports mail search syntax \
                          such as `from:alice is:unread`."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Account owner. Filled in automatically when omitted."
                    },
                    "query": {
                        "type": "string",
                        "description": "Search query (empty for the latest messages)"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of messages (default 10)"
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let user_id = require_user(args.user_id)?;
        let provider = require(&self.provider, "mail")?;
        let payload = json!({
            "user_id": user_id,
            "query": args.query.unwrap_or_default(),
            "max_results": args.max_results.unwrap_or(10),
        });
        Ok(provider.invoke(GET_MESSAGES, payload).await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct SendEmailArgs {
    #[serde(default)]
    pub user_id: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub cc: Option<String>,
}

pub struct SendEmailTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl SendEmailTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

fn looks_like_address(addr: &str) -> bool {
    addr.split(',').map(str::trim).all(|a| match a.split_once('@') {
        Some((user, host)) => !user.is_empty() && host.contains('.'),
        None => false,
    })
}

impl Tool for SendEmailTool {
    const NAME: &'static str = "send_email";
    type Error = ToolError;
    type Args = SendEmailArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Send an email from the user's account. All of `to`, `subject` \
                          and `body` must be known; report back instead of guessing."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Account owner. Filled in automatically when omitted."
                    },
                    "to": {
                        "type": "string",
                        "description": "Recipient address(es), comma separated"
                    },
                    "subject": { "type": "string" },
                    "body": { "type": "string", "description": "Plain-text body" },
                    "cc": {
                        "type": "string",
                        "description": "Optional CC address(es), comma separated"
                    }
                },
                "required": ["to", "subject", "body"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if !looks_like_address(&args.to) {
            return Err(ToolError::InvalidArguments(format!(
                "`{}` is not a valid recipient address",
                args.to
            )));
        }
        if let Some(cc) = args.cc.as_deref().filter(|c| !c.trim().is_empty()) {
            if !looks_like_address(cc) {
                return Err(ToolError::InvalidArguments(format!(
                    "`{cc}` is not a valid CC address"
                )));
            }
        }

        let user_id = require_user(args.user_id)?;
        let provider = require(&self.provider, "mail")?;
        let mut payload = json!({
            "user_id": user_id,
            "to": args.to,
            "subject": args.subject,
            "body": args.body,
        });
        if let Some(cc) = args.cc.filter(|c| !c.trim().is_empty()) {
            payload["cc"] = Value::String(cc);
        }
        Ok(provider.invoke(SEND_MESSAGE, payload).await?)
    }
}
