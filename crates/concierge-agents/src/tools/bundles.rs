//! Tool bundle constructors for role-based agent wiring.
//!
//! Each worker gets a fixed, disjoint bundle. The bundles carry the
//! registration metadata alongside the handler so the registry can be built
//! without repeating per-tool facts.
//!
//! # Roles
//!
//! - **Retriever**: web_search, read_emails, list_events
//! - **Executor**: send_email, create_event, delete_event

use rig::tool::{Tool, ToolDyn};

use super::calendar::{CreateEventTool, DeleteEventTool, ListEventsTool};
use super::email::{ReadEmailsTool, SendEmailTool};
use super::providers::ProviderSet;
use super::registry::ToolSpec;
use super::search::WebSearchTool;
use crate::agents::AgentNode;

/// Parameter carrying the caller identity for account-scoped tools.
pub const IDENTITY_PARAM: &str = "user_id";

pub type Bundle = Vec<(ToolSpec, Box<dyn ToolDyn>)>;

fn entry(spec: ToolSpec, tool: impl ToolDyn + 'static) -> (ToolSpec, Box<dyn ToolDyn>) {
    let handler: Box<dyn ToolDyn> = Box::new(tool);
    (spec, handler)
}

/// Read-only tools.
pub fn retriever_tools(providers: &ProviderSet) -> Bundle {
    let owner = AgentNode::Retriever;
    vec![
        entry(
            ToolSpec::new(WebSearchTool::NAME, owner),
            WebSearchTool::new(providers.search.clone()),
        ),
        entry(
            ToolSpec::new(ReadEmailsTool::NAME, owner).with_identity(IDENTITY_PARAM),
            ReadEmailsTool::new(providers.mail.clone()),
        ),
        entry(
            ToolSpec::new(ListEventsTool::NAME, owner).with_identity(IDENTITY_PARAM),
            ListEventsTool::new(providers.calendar.clone()),
        ),
    ]
}

/// Side-effecting tools.
pub fn executor_tools(providers: &ProviderSet) -> Bundle {
    let owner = AgentNode::Executor;
    vec![
        entry(
            ToolSpec::new(SendEmailTool::NAME, owner).with_identity(IDENTITY_PARAM),
            SendEmailTool::new(providers.mail.clone()),
        ),
        entry(
            ToolSpec::new(CreateEventTool::NAME, owner)
                .with_identity(IDENTITY_PARAM)
                .calendar_event(),
            CreateEventTool::new(providers.calendar.clone()),
        ),
        entry(
            ToolSpec::new(DeleteEventTool::NAME, owner).with_identity(IDENTITY_PARAM),
            DeleteEventTool::new(providers.calendar.clone()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ArgShape;

    #[test]
    fn test_bundle_metadata_matches_handlers() {
        let providers = ProviderSet::default();
        for (spec, handler) in retriever_tools(&providers)
            .into_iter()
            .chain(executor_tools(&providers))
        {
            assert_eq!(spec.name, handler.name());
        }
    }

    #[test]
    fn test_only_create_event_is_calendar_shaped() {
        let providers = ProviderSet::default();
        let shaped: Vec<String> = executor_tools(&providers)
            .into_iter()
            .chain(retriever_tools(&providers))
            .filter(|(spec, _)| spec.shape == ArgShape::CalendarEvent)
            .map(|(spec, _)| spec.name)
            .collect();
        assert_eq!(shaped, vec!["create_event"]);
    }

    #[test]
    fn test_web_search_needs_no_identity() {
        let bundle = retriever_tools(&ProviderSet::default());
        assert_eq!(bundle[0].0.identity_param, None);
        assert!(bundle[1..]
            .iter()
            .all(|(spec, _)| spec.identity_param == Some(IDENTITY_PARAM)));
    }
}
