//! Static tool registration table.
//!
//! Built once at startup: tool name → {owning agent, identity parameter,
//! argument shape, handler}. Resolution is always scoped to the invoking
//! node, which is what keeps the Retriever and Executor capability sets
//! disjoint at runtime.

use rig::completion::ToolDefinition;
use rig::tool::ToolDyn;

use super::bundles;
use super::providers::ProviderSet;
use crate::agents::AgentNode;
use crate::errors::RegistryError;
use crate::handoff;

/// Argument family a tool belongs to; selects the normalization rules the
/// dispatch layer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    Plain,
    /// `start`/`end` timestamps plus an optional `timeZone`.
    CalendarEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub owner: AgentNode,
    /// Argument that names the account the tool acts on, if any.
    pub identity_param: Option<&'static str>,
    pub shape: ArgShape,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, owner: AgentNode) -> Self {
        Self {
            name: name.into(),
            owner,
            identity_param: None,
            shape: ArgShape::Plain,
        }
    }

    pub fn with_identity(mut self, param: &'static str) -> Self {
        self.identity_param = Some(param);
        self
    }

    pub fn calendar_event(mut self) -> Self {
        self.shape = ArgShape::CalendarEvent;
        self
    }
}

pub struct RegisteredTool {
    pub spec: ToolSpec,
    pub handler: Box<dyn ToolDyn>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six built-in tools wired to `providers`.
    pub fn standard(providers: &ProviderSet) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (spec, handler) in bundles::retriever_tools(providers)
            .into_iter()
            .chain(bundles::executor_tools(providers))
        {
            registry.register(spec, handler)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Box<dyn ToolDyn>,
    ) -> Result<(), RegistryError> {
        if handoff::is_handoff_tool(&spec.name) {
            return Err(RegistryError::ReservedName(spec.name));
        }
        if !spec.owner.is_worker() {
            return Err(RegistryError::SupervisorTool(spec.name));
        }
        if self.lookup(&spec.name).is_some() {
            return Err(RegistryError::Duplicate(spec.name));
        }
        self.tools.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Any registered tool by name, regardless of owner.
    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.spec.name == name)
    }

    /// The tool `name` as reachable from `node`.
    pub fn resolve(&self, node: AgentNode, name: &str) -> Option<&RegisteredTool> {
        self.lookup(name).filter(|t| t.spec.owner == node)
    }

    pub fn names_for(&self, node: AgentNode) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| t.spec.owner == node)
            .map(|t| t.spec.name.as_str())
            .collect()
    }

    /// Everything offered to `node`'s model: its domain tools followed by
    /// its handoff operations.
    pub async fn definitions_for(&self, node: AgentNode) -> Vec<ToolDefinition> {
        let mut definitions = Vec::new();
        for tool in self.tools.iter().filter(|t| t.spec.owner == node) {
            definitions.push(tool.handler.definition(String::new()).await);
        }
        definitions.extend(handoff::definitions_for(node));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
