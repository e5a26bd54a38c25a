//! Error taxonomy for the orchestration core.
//!
//! Only [`RunError`] ever leaves a run. Everything that happens inside a tool
//! call is folded into an in-band tool result by the dispatch layer, so the
//! types below that describe tool failures (`ProviderError`, `ToolError`) are
//! observed by agents as `{"error": "..."}` payloads rather than propagated.
//!
//! | Error            | Raised by               | Escapes `run_once`? |
//! |------------------|-------------------------|---------------------|
//! | `ModelError`     | generative model        | yes, as `RunError::Model` |
//! | `ProviderError`  | tool providers          | no                  |
//! | `ToolError`      | rig tool handlers       | no                  |
//! | `TranscriptError`| transcript invariants   | yes, as `RunError::Transcript` |
//! | `RegistryError`  | tool registration       | construction time only |

use thiserror::Error;

use crate::agents::AgentNode;
use crate::state_machine::IllegalTransition;

/// Failure of the generative text model at a node's reasoning step.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network / backend failure reaching the model.
    #[error("model transport failure: {0}")]
    Transport(String),

    /// The model call exceeded its deadline.
    #[error("model call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The backend answered with something that is neither text nor tool calls.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    /// A scripted model ran out of replies for a node.
    #[error("no scripted reply left for {0}")]
    ScriptExhausted(AgentNode),
}

impl ModelError {
    /// Transport failures and timeouts are worth retrying; malformed output is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// Failure reported by an external tool provider (search, mail, calendar).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider understood the call and refused it (JSON-RPC error object).
    #[error("provider rejected call (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The caller has not linked the account this tool acts on.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("no provider configured for `{0}`")]
    NotConfigured(String),
}

/// Errors returned by individual tool handlers.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Violation of the transcript interleaving invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("transcript must start with a user message")]
    MustStartWithUser,

    #[error("tool result `{0}` does not answer any earlier tool call")]
    OrphanToolResult(String),
}

/// Problems building the static tool table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool `{0}` is registered twice")]
    Duplicate(String),

    #[error("tool `{0}` cannot be owned by the supervisor")]
    SupervisorTool(String),

    #[error("tool name `{0}` collides with a handoff operation")]
    ReservedName(String),
}

/// Run-level failure: the only way `run_once` fails outward.
///
/// Routing exhaustion and synthesis failure are absent; both
/// produce a (degraded) answer string instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model could not be reached (or answered garbage) at a node's own step.
    #[error("{node} reasoning step failed: {source}")]
    Model {
        node: AgentNode,
        #[source]
        source: ModelError,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("transcript invariant violated: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The orchestrator asked the routing machine for an edge it does not have.
    #[error(transparent)]
    Routing(#[from] IllegalTransition),
}

impl RunError {
    /// Whether the caller may retry the whole turn.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Model { source, .. } => source.is_transient(),
            Self::Cancelled
            | Self::Transcript(_)
            | Self::Configuration(_)
            | Self::Routing(_) => false,
        }
    }
}
