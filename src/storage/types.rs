use crate::session::ChatSession;

/// Everything read back from a history backend at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedHistory {
    /// Stored sessions, in display order
    pub sessions: Vec<ChatSession>,
    /// Stored active session id, not yet validated against `sessions`
    pub active_id: Option<String>,
}
