//! Per-run metadata.

use uuid::Uuid;

/// Created at run start and read-only afterwards. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// The authenticated user tools act on behalf of. Opaque to the core.
    pub caller_identity: Option<String>,
    pub run_id: Uuid,
}

impl RunContext {
    pub fn new(caller_identity: Option<String>) -> Self {
        Self {
            caller_identity,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn for_caller(identity: impl Into<String>) -> Self {
        Self::new(Some(identity.into()))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
