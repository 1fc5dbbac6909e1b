//! Immutable session state and its transitions
//!
//! Every transition borrows the current state and returns a new one, so the
//! store can hand out snapshots without copying on read.

use super::types::{derive_title, ChatSession, Message, Role};
use crate::error::{ParleyError, Result};
use crate::reconciler::{should_suppress, FragmentOutcome};

/// All chat sessions plus the active selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Sessions, most recently created first
    pub sessions: Vec<ChatSession>,
    /// Id of the active session; always references an entry of `sessions`
    pub active_id: Option<String>,
}

impl SessionState {
    /// Builds a state from loaded data, dropping a dangling active id
    pub fn from_parts(sessions: Vec<ChatSession>, active_id: Option<String>) -> Self {
        let active_id = active_id.filter(|id| sessions.iter().any(|s| &s.id == id));
        Self {
            sessions,
            active_id,
        }
    }

    /// Looks up a session by exact id
    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&ChatSession> {
        self.active_id.as_deref().and_then(|id| self.session(id))
    }

    /// Resolves a full id or a unique id prefix to a session id
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` when nothing matches and `AmbiguousSession`
    /// when the prefix matches more than one session.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String> {
        if let Some(session) = self.session(id_or_prefix) {
            return Ok(session.id.clone());
        }

        let needle = id_or_prefix.to_uppercase();
        let mut matches = self
            .sessions
            .iter()
            .filter(|s| !needle.is_empty() && s.id.starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(session), None) => Ok(session.id.clone()),
            (Some(_), Some(_)) => Err(ParleyError::AmbiguousSession(id_or_prefix.to_string()).into()),
            _ => Err(ParleyError::SessionNotFound(id_or_prefix.to_string()).into()),
        }
    }

    /// Inserts a session at the front and makes it active
    pub fn with_new_session(&self, session: ChatSession) -> Self {
        let mut next = self.clone();
        next.active_id = Some(session.id.clone());
        next.sessions.insert(0, session);
        next
    }

    /// Makes an existing session active
    pub fn with_active(&self, id: &str) -> Result<Self> {
        if self.session(id).is_none() {
            return Err(ParleyError::SessionNotFound(id.to_string()).into());
        }
        let mut next = self.clone();
        next.active_id = Some(id.to_string());
        Ok(next)
    }

    /// Removes a session; returns `None` when the id is unknown
    ///
    /// Deleting the active session activates the first remaining one.
    pub fn without_session(&self, id: &str) -> Option<Self> {
        self.session(id)?;
        let mut next = self.clone();
        next.sessions.retain(|s| s.id != id);
        if next.active_id.as_deref() == Some(id) {
            next.active_id = next.sessions.first().map(|s| s.id.clone());
        }
        Some(next)
    }

    /// Empties the messages of one session, keeping the session itself
    pub fn with_cleared_messages(&self, id: &str) -> Option<Self> {
        let mut next = self.clone();
        let session = next.sessions.iter_mut().find(|s| s.id == id)?;
        session.messages.clear();
        Some(next)
    }

    /// Appends a user message; blank text or an unknown session yields `None`
    ///
    /// The first message of a session also sets its title.
    pub fn with_user_message(
        &self,
        session_id: &str,
        message: Message,
        title_max_chars: usize,
    ) -> Option<Self> {
        if message.role != Role::User || message.content.trim().is_empty() {
            return None;
        }
        let mut next = self.clone();
        let session = next.sessions.iter_mut().find(|s| s.id == session_id)?;
        if session.messages.is_empty() {
            session.title = derive_title(&message.content, title_max_chars);
        }
        session.messages.push(message);
        Some(next)
    }

    /// Appends any message to a session without touching its title
    pub fn with_message(&self, session_id: &str, message: Message) -> Option<Self> {
        let mut next = self.clone();
        let session = next.sessions.iter_mut().find(|s| s.id == session_id)?;
        session.messages.push(message);
        Some(next)
    }

    /// Decides what folding `fragment` into a message would do
    pub fn classify_fragment(
        &self,
        session_id: &str,
        message_id: &str,
        fragment: &str,
    ) -> FragmentOutcome {
        if fragment.is_empty() {
            return FragmentOutcome::Empty;
        }
        match self.session(session_id).and_then(|s| s.message(message_id)) {
            None => FragmentOutcome::MissingTarget,
            Some(message) if should_suppress(&message.content, fragment) => {
                FragmentOutcome::Suppressed
            }
            Some(_) => FragmentOutcome::Appended,
        }
    }

    /// Grows the content of one message in place
    pub fn with_appended_content(
        &self,
        session_id: &str,
        message_id: &str,
        fragment: &str,
    ) -> Option<Self> {
        let mut next = self.clone();
        let message = next
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)?
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)?;
        message.content.push_str(fragment);
        Some(next)
    }
}
