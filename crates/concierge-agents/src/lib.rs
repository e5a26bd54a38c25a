//! Supervisor/worker orchestration engine for a conversational productivity
//! assistant.
//!
//! One user turn is one run: the [`Orchestrator`] routes control between a
//! Supervisor and two bounded workers (Retriever, Executor) over a shared
//! [`Transcript`], dispatches their tool calls through the
//! [`dispatch::Dispatcher`], and picks the final answer with the
//! [`synthesizer`].

pub mod agents;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod handoff;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod state_machine;
pub mod synthesizer;
pub mod tools;
pub mod transcript;

pub use agents::AgentNode;
pub use config::OrchestratorConfig;
pub use context::RunContext;
pub use errors::RunError;
pub use orchestrator::{Orchestrator, RunOutput};
pub use transcript::{Message, Transcript};
