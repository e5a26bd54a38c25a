//! Web search tool (Retriever).

use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use super::providers::{require, ToolProvider};
use crate::errors::ToolError;

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// Search the web for current information.
pub struct WebSearchTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl WebSearchTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";
    type Error = ToolError;
    type Args = WebSearchArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Search the web for current information about places, events, \
                          businesses or general knowledge. Returns a list of results with \
                          titles, URLs and snippets."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results (default 5)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let query = args.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".into()));
        }
        let provider = require(&self.provider, "search")?;
        let payload = json!({
            "query": query,
            "max_results": args.max_results.unwrap_or(5),
        });
        Ok(provider.invoke(Self::NAME, payload).await?)
    }
}
