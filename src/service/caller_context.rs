//! Caller context structure for retrieval requests

use serde::{Deserialize, Serialize};

/// Who is asking for an artefact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CallerContext {
    /// Verified caller id; `None` for anonymous access
    pub caller_id: Option<String>,
    /// Admin callers see artefacts outside their display window
    pub is_admin: bool,
}

impl CallerContext {
    /// Create an anonymous caller that may only see public artefacts
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a caller with a verified id
    pub fn verified(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: Some(caller_id.into()),
            is_admin: false,
        }
    }

    /// Mark this caller as admin
    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Name used in logs
    pub fn log_name(&self) -> &str {
        self.caller_id.as_deref().unwrap_or("anonymous")
    }
}
