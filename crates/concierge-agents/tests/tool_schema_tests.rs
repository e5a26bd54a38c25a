//! Tool payload schema compatibility tests.
//!
//! The definitions below are what the model sees; the argument structs are
//! what its calls must deserialize into. A renamed field or a dropped
//! `required` entry breaks tool calls silently, so both sides are pinned here.

use rig::tool::Tool;

use concierge_agents::handoff::{self, DELEGATE_TO_EXECUTOR, DELEGATE_TO_RETRIEVER, REPORT_BACK};
use concierge_agents::tools::calendar::{
    CreateEventArgs, CreateEventTool, DeleteEventArgs, DeleteEventTool, ListEventsArgs,
    ListEventsTool,
};
use concierge_agents::tools::email::{ReadEmailsArgs, ReadEmailsTool, SendEmailArgs, SendEmailTool};
use concierge_agents::tools::search::{WebSearchArgs, WebSearchTool};
use concierge_agents::AgentNode;

// ---------------------------------------------------------------------------
// Schema structure validation
// ---------------------------------------------------------------------------

async fn assert_tool_schema<T: Tool>(tool: &T, expected_name: &str, expected_required: &[&str]) {
    let def = tool.definition(String::new()).await;
    assert_eq!(def.name, expected_name);
    assert!(
        !def.description.is_empty(),
        "Tool {expected_name} must have a description"
    );

    let params = &def.parameters;
    assert_eq!(
        params["type"], "object",
        "Tool {expected_name} parameters must be type 'object'"
    );
    let props = params["properties"]
        .as_object()
        .unwrap_or_else(|| panic!("Tool {expected_name} must have 'properties'"));
    for (name, prop) in props {
        assert!(
            prop.get("type").is_some(),
            "Tool {expected_name} parameter '{name}' missing 'type'"
        );
    }

    let required: Vec<&str> = params
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(required, expected_required, "required set of {expected_name}");
    for name in &required {
        assert!(
            props.contains_key(*name),
            "Tool {expected_name} requires undeclared parameter '{name}'"
        );
    }
}

#[tokio::test]
async fn test_web_search_schema() {
    assert_tool_schema(&WebSearchTool::new(None), "web_search", &["query"]).await;
}

#[tokio::test]
async fn test_read_emails_schema() {
    assert_tool_schema(&ReadEmailsTool::new(None), "read_emails", &[]).await;
}

#[tokio::test]
async fn test_list_events_schema() {
    assert_tool_schema(&ListEventsTool::new(None), "list_events", &[]).await;
}

#[tokio::test]
async fn test_send_email_schema() {
    assert_tool_schema(
        &SendEmailTool::new(None),
        "send_email",
        &["to", "subject", "body"],
    )
    .await;
}

#[tokio::test]
async fn test_create_event_schema() {
    assert_tool_schema(
        &CreateEventTool::new(None),
        "create_event",
        &["summary", "start", "end"],
    )
    .await;
}

#[tokio::test]
async fn test_delete_event_schema() {
    assert_tool_schema(&DeleteEventTool::new(None), "delete_event", &["eventId"]).await;
}

#[tokio::test]
async fn test_identity_is_never_required_from_the_model() {
    let defs = [
        ReadEmailsTool::new(None).definition(String::new()).await,
        ListEventsTool::new(None).definition(String::new()).await,
        SendEmailTool::new(None).definition(String::new()).await,
        CreateEventTool::new(None).definition(String::new()).await,
        DeleteEventTool::new(None).definition(String::new()).await,
    ];
    for def in defs {
        let required = def.parameters["required"].as_array().cloned().unwrap_or_default();
        assert!(
            !required.iter().any(|v| v == "user_id"),
            "{} must leave user_id to the dispatch layer",
            def.name
        );
        assert!(def.parameters["properties"].get("user_id").is_some());
    }
}

#[test]
fn test_handoff_definitions_per_node() {
    let names = |node| -> Vec<String> {
        handoff::definitions_for(node)
            .into_iter()
            .map(|d| d.name)
            .collect()
    };
    assert_eq!(
        names(AgentNode::Supervisor),
        vec![DELEGATE_TO_RETRIEVER, DELEGATE_TO_EXECUTOR]
    );
    assert_eq!(names(AgentNode::Retriever), vec![REPORT_BACK]);
    assert_eq!(names(AgentNode::Executor), vec![REPORT_BACK]);

    for def in handoff::definitions_for(AgentNode::Supervisor) {
        assert_eq!(def.parameters["required"][0], "note");
    }
}

// ---------------------------------------------------------------------------
// Argument deserialization compatibility tests
// ---------------------------------------------------------------------------

#[test]
fn test_web_search_args_compat() {
    let args: WebSearchArgs =
        serde_json::from_str(r#"{"query": "best tacos downtown", "max_results": 3}"#).unwrap();
    assert_eq!(args.query, "best tacos downtown");
    assert_eq!(args.max_results, Some(3));
}

#[test]
fn test_read_emails_args_compat() {
    let args: ReadEmailsArgs =
        serde_json::from_str(r#"{"user_id": "alice", "query": "from:bob is:unread"}"#).unwrap();
    assert_eq!(args.user_id.as_deref(), Some("alice"));
    assert_eq!(args.query.as_deref(), Some("from:bob is:unread"));
    assert_eq!(args.max_results, None);
}

#[test]
fn test_list_events_args_compat() {
    let args: ListEventsArgs = serde_json::from_str(
        r#"{"user_id": "alice", "timeMin": "2024-08-15T00:00:00Z", "timeMax": "2024-08-16T00:00:00Z"}"#,
    )
    .unwrap();
    assert_eq!(args.user_id.as_deref(), Some("alice"));
    assert_eq!(args.calendar_id, "primary");
    assert_eq!(args.time_min.as_deref(), Some("2024-08-15T00:00:00Z"));
}

#[test]
fn test_send_email_args_compat() {
    let args: SendEmailArgs = serde_json::from_str(
        r#"{"user_id": "alice", "to": "bob@example.com", "subject": "Tacos", "body": "Noon?"}"#,
    )
    .unwrap();
    assert_eq!(args.to, "bob@example.com");
    assert_eq!(args.cc, None);
}

#[test]
fn test_create_event_args_compat() {
    let args: CreateEventArgs = serde_json::from_str(
        r#"{
            "user_id": "alice",
            "summary": "Taco lunch",
            "start": "2024-08-15T12:00:00",
            "end": "2024-08-15T13:00:00",
            "timeZone": "America/Chicago",
            "attendees": ["bob@example.com"]
        }"#,
    )
    .unwrap();
    assert_eq!(args.time_zone.as_deref(), Some("America/Chicago"));
    assert_eq!(args.attendees, vec!["bob@example.com"]);
    assert_eq!(args.location, None);
}

#[test]
fn test_delete_event_args_compat() {
    let args: DeleteEventArgs =
        serde_json::from_str(r#"{"user_id": "alice", "eventId": "ev-42"}"#).unwrap();
    assert_eq!(args.event_id, "ev-42");
    assert_eq!(args.calendar_id, "primary");
}
