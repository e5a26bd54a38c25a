//! Calendar tools: listing (Retriever), creating and deleting events
//! (Executor).
//!
//! `create_event` start/end values reach the handler already normalized by
//! the dispatch layer: bare local timestamps carry the event's zone offset.

use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use super::providers::{require, require_user, ToolProvider};
use crate::errors::ToolError;

const PRIMARY: &str = "primary";

fn default_calendar() -> String {
    PRIMARY.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsArgs {
    #[serde(rename = "user_id")]
    pub user_id: Option<String>,
    #[serde(default = "default_calendar")]
    pub calendar_id: String,
    #[serde(default)]
    pub time_min: Option<String>,
    #[serde(default)]
    pub time_max: Option<String>,
}

pub struct ListEventsTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl ListEventsTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

impl Tool for ListEventsTool {
    const NAME: &'static str = "list_events";
    type Error = ToolError;
    type Args = ListEventsArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "List events on the user's calendar within an optional time window."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Account owner. Filled in automatically when omitted."
                    },
                    "calendarId": {
                        "type": "string",
                        "description": "Calendar to read (default \"primary\")"
                    },
                    "timeMin": {
                        "type": "string",
                        "description": "ISO datetime, start of interval"
                    },
                    "timeMax": {
                        "type": "string",
                        "description": "ISO datetime, end of interval"
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let user_id = require_user(args.user_id)?;
        let provider = require(&self.provider, "calendar")?;
        let payload = json!({
            "user_id": user_id,
            "calendar_id": args.calendar_id,
            "time_min": args.time_min,
            "time_max": args.time_max,
        });
        Ok(provider.invoke(Self::NAME, payload).await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventArgs {
    #[serde(rename = "user_id")]
    pub user_id: Option<String>,
    pub summary: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

pub struct CreateEventTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl CreateEventTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

impl Tool for CreateEventTool {
    const NAME: &'static str = "create_event";
    type Error = ToolError;
    type Args = CreateEventArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Create an event on the user's primary calendar.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Account owner. Filled in automatically when omitted."
                    },
                    "summary": { "type": "string", "description": "Event title" },
                    "start": {
                        "type": "string",
                        "description": "ISO datetime, e.g. 2024-08-15T10:00:00 or 2024-08-15T10:00:00-07:00"
                    },
                    "end": {
                        "type": "string",
                        "description": "ISO datetime, e.g. 2024-08-15T11:00:00 or 2024-08-15T11:00:00-07:00"
                    },
                    "timeZone": {
                        "type": "string",
                        "description": "IANA time zone used for times without an offset, e.g. America/Los_Angeles"
                    },
                    "description": { "type": "string" },
                    "location": { "type": "string" },
                    "attendees": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Attendee email addresses"
                    }
                },
                "required": ["summary", "start", "end"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let user_id = require_user(args.user_id)?;
        if args.summary.trim().is_empty() {
            return Err(ToolError::InvalidArguments("summary must not be empty".into()));
        }
        let provider = require(&self.provider, "calendar")?;
        let payload = json!({
            "user_id": user_id,
            "summary": args.summary,
            "start_time": args.start,
            "end_time": args.end,
            "time_zone": args.time_zone,
            "calendar_id": PRIMARY,
            "description": args.description,
            "location": args.location,
            "attendees": args.attendees,
        });
        Ok(provider.invoke(Self::NAME, payload).await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventArgs {
    #[serde(rename = "user_id")]
    pub user_id: Option<String>,
    pub event_id: String,
    #[serde(default = "default_calendar")]
    pub calendar_id: String,
}

pub struct DeleteEventTool {
    provider: Option<Arc<dyn ToolProvider>>,
}

impl DeleteEventTool {
    pub fn new(provider: Option<Arc<dyn ToolProvider>>) -> Self {
        Self { provider }
    }
}

impl Tool for DeleteEventTool {
    const NAME: &'static str = "delete_event";
    type Error = ToolError;
    type Args = DeleteEventArgs;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Delete an event from the user's calendar. Requires the event id \
                          (find it with the retriever's list_events first)."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Account owner. Filled in automatically when omitted."
                    },
                    "eventId": { "type": "string" },
                    "calendarId": {
                        "type": "string",
                        "description": "Calendar holding the event (default \"primary\")"
                    }
                },
                "required": ["eventId"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let user_id = require_user(args.user_id)?;
        let provider = require(&self.provider, "calendar")?;
        let payload = json!({
            "user_id": user_id,
            "event_id": args.event_id,
            "calendar_id": args.calendar_id,
        });
        Ok(provider.invoke(Self::NAME, payload).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_event_args_use_wire_names() {
        let args: CreateEventArgs = serde_json::from_value(json!({
            "user_id": "u-1",
            "summary": "Lunch",
            "start": "2024-08-15T12:00:00-04:00",
            "end": "2024-08-15T13:00:00-04:00",
            "timeZone": "America/New_York",
            "attendees": ["bob@example.com"]
        }))
        .unwrap();
        assert_eq!(args.time_zone.as_deref(), Some("America/New_York"));
        assert_eq!(args.attendees, vec!["bob@example.com"]);
    }

    #[test]
    fn test_delete_defaults_to_primary_calendar() {
        let args: DeleteEventArgs =
            serde_json::from_value(json!({ "user_id": "u", "eventId": "ev-9" })).unwrap();
        assert_eq!(args.calendar_id, "primary");
    }

    #[tokio::test]
    async fn test_missing_identity_is_invalid_arguments() {
        let tool = ListEventsTool::new(None);
        let err = tool
            .call(ListEventsArgs {
                user_id: None,
                calendar_id: default_calendar(),
                time_min: None,
                time_max: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }
}
