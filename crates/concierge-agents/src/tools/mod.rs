//! Domain tools for the worker agents.
//!
//! Each tool implements `rig::tool::Tool` and forwards to a [`ToolProvider`]
//! family. The static [`ToolRegistry`] records which worker owns which tool;
//! the dispatch layer resolves calls through it.

pub mod bundles;
pub mod calendar;
pub mod email;
pub mod permissions;
pub mod providers;
pub mod registry;
pub mod search;

pub use permissions::{ApprovalGate, ApprovalRequest, AutoApprove, ToolPermission, ToolPolicy};
pub use providers::{JsonRpcToolProvider, ProviderSet, ToolProvider};
pub use registry::{ArgShape, RegisteredTool, ToolRegistry, ToolSpec};
