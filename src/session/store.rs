//! Session store
//!
//! Owns the current [`SessionState`] snapshot and a history backend. Every
//! mutation swaps in a new snapshot and writes the full collection back to
//! storage. Storage failures are logged and never surface to the caller.

use super::state::SessionState;
use super::types::{ChatSession, Message, DEFAULT_TITLE, TITLE_MAX_CHARS};
use crate::error::Result;
use crate::reconciler::FragmentOutcome;
use crate::storage::HistoryBackend;
use std::sync::Arc;

/// Persisted, ordered collection of chat sessions
pub struct SessionStore {
    state: Arc<SessionState>,
    backend: Box<dyn HistoryBackend>,
    title_max_chars: usize,
}

impl SessionStore {
    /// Opens the store, loading whatever the backend holds
    ///
    /// Unreadable history starts the store empty.
    pub fn open(backend: Box<dyn HistoryBackend>) -> Self {
        let state = match backend.load() {
            Ok(history) => SessionState::from_parts(history.sessions, history.active_id),
            Err(e) => {
                tracing::warn!("Failed to load chat history, starting empty: {:#}", e);
                SessionState::default()
            }
        };

        tracing::debug!(
            sessions = state.sessions.len(),
            active = ?state.active_id,
            "Opened session store"
        );

        Self {
            state: Arc::new(state),
            backend,
            title_max_chars: TITLE_MAX_CHARS,
        }
    }

    /// Overrides the title length used for new titles
    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.title_max_chars = max_chars;
        self
    }

    /// Current immutable state
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Id of the active session
    pub fn active_id(&self) -> Option<String> {
        self.state.active_id.clone()
    }

    /// Resolves a full id or unique prefix
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String> {
        self.state.resolve_id(id_or_prefix)
    }

    /// Creates an empty session at the front and activates it
    pub fn create_session(&mut self) -> String {
        self.insert_session(ChatSession::new(DEFAULT_TITLE))
    }

    /// Creates a session titled after `text` and activates it
    pub fn create_session_titled(&mut self, text: &str) -> String {
        self.insert_session(ChatSession::new(super::types::derive_title(
            text,
            self.title_max_chars,
        )))
    }

    fn insert_session(&mut self, session: ChatSession) -> String {
        let id = session.id.clone();
        tracing::info!(session_id = %id, "Created chat session");
        let next = self.state.with_new_session(session);
        self.commit(next);
        id
    }

    /// Makes an existing session active
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for unknown ids; state is left unchanged.
    pub fn select_session(&mut self, id: &str) -> Result<()> {
        let next = self.state.with_active(id)?;
        self.commit(next);
        Ok(())
    }

    /// Appends a user message, returning its id
    ///
    /// Blank text is ignored and yields `None`, as does an unknown session.
    pub fn append_user_message(&mut self, session_id: &str, text: &str) -> Option<String> {
        let message = Message::user(text);
        let id = message.id.clone();
        let next = self
            .state
            .with_user_message(session_id, message, self.title_max_chars)?;
        self.commit(next);
        Some(id)
    }

    /// Deletes a session; unknown ids are a no-op
    pub fn delete_session(&mut self, id: &str) {
        if let Some(next) = self.state.without_session(id) {
            tracing::info!(session_id = %id, "Deleted chat session");
            self.commit(next);
        }
    }

    /// Removes all messages from a session
    pub fn clear_messages(&mut self, id: &str) {
        if let Some(next) = self.state.with_cleared_messages(id) {
            tracing::info!(session_id = %id, "Cleared chat session");
            self.commit(next);
        }
    }

    /// Appends an empty assistant message that will receive streamed text
    pub fn begin_assistant_message(&mut self, session_id: &str) -> Option<String> {
        self.push_message(session_id, Message::assistant(""))
    }

    /// Appends a complete assistant message
    pub fn push_assistant_message(&mut self, session_id: &str, text: &str) -> Option<String> {
        self.push_message(session_id, Message::assistant(text))
    }

    fn push_message(&mut self, session_id: &str, message: Message) -> Option<String> {
        let id = message.id.clone();
        let next = self.state.with_message(session_id, message)?;
        self.commit(next);
        Some(id)
    }

    /// Folds one streamed fragment into a message
    pub fn append_fragment(
        &mut self,
        session_id: &str,
        message_id: &str,
        fragment: &str,
    ) -> FragmentOutcome {
        let outcome = self
            .state
            .classify_fragment(session_id, message_id, fragment);
        if outcome == FragmentOutcome::Appended {
            if let Some(next) = self
                .state
                .with_appended_content(session_id, message_id, fragment)
            {
                self.commit_buffered(next);
            }
        }
        outcome
    }

    /// Forces buffered history writes to durable storage
    pub fn flush(&self) {
        if let Err(e) = self.backend.flush() {
            tracing::warn!("Failed to flush chat history: {:#}", e);
        }
    }

    fn commit(&mut self, next: SessionState) {
        self.commit_buffered(next);
        self.flush();
    }

    /// Saves without forcing a flush; used for per-fragment updates
    fn commit_buffered(&mut self, next: SessionState) {
        self.state = Arc::new(next);
        if let Err(e) = self
            .backend
            .save(&self.state.sessions, self.state.active_id.as_deref())
        {
            tracing::warn!("Failed to persist chat history: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryHistory, PersistedHistory};

    fn new_store() -> (SessionStore, MemoryHistory) {
        let backend = MemoryHistory::new();
        let store = SessionStore::open(Box::new(backend.clone()));
        (store, backend)
    }

    #[test]
    fn test_create_session_persists() {
        let (mut store, backend) = new_store();
        let id = store.create_session();
        let saved = backend.load().unwrap();
        assert_eq!(saved.sessions.len(), 1);
        assert_eq!(saved.active_id.as_deref(), Some(id.as_str()));
        assert_eq!(saved.sessions[0].title, DEFAULT_TITLE);
    }

    #[test]
    fn test_create_then_delete_keeps_active_valid() {
        let (mut store, _backend) = new_store();
        let first = store.create_session();
        let second = store.create_session();
        store.delete_session(&second);
        assert_eq!(store.active_id().as_deref(), Some(first.as_str()));

        store.delete_session(&first);
        assert!(store.active_id().is_none());
        assert!(store.snapshot().sessions.is_empty());
    }

    #[test]
    fn test_delete_unknown_session_is_noop() {
        let (mut store, _backend) = new_store();
        let id = store.create_session();
        store.delete_session("missing");
        assert_eq!(store.snapshot().sessions.len(), 1);
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn test_append_user_message_titles_session_once() {
        let (mut store, _backend) = new_store();
        let id = store.create_session();
        assert!(store.append_user_message(&id, "Hi").is_some());
        assert!(store.append_user_message(&id, "Another question").is_some());
        let snapshot = store.snapshot();
        let session = snapshot.session(&id).unwrap();
        assert_eq!(session.title, "Hi");
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_append_blank_message_is_ignored() {
        let (mut store, backend) = new_store();
        let id = store.create_session();
        let saves_before = backend.save_count();
        assert!(store.append_user_message(&id, "  ").is_none());
        assert_eq!(backend.save_count(), saves_before);
        assert!(store.snapshot().session(&id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_title_max_chars_override() {
        let backend = MemoryHistory::new();
        let mut store = SessionStore::open(Box::new(backend)).with_title_max_chars(5);
        let id = store.create_session_titled("abcdefgh");
        assert_eq!(store.snapshot().session(&id).unwrap().title, "abcde");
    }

    #[test]
    fn test_select_unknown_session_errors() {
        let (mut store, _backend) = new_store();
        let id = store.create_session();
        assert!(store.select_session("missing").is_err());
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn test_select_session_switches_active() {
        let (mut store, backend) = new_store();
        let first = store.create_session();
        let _second = store.create_session();
        store.select_session(&first).unwrap();
        assert_eq!(store.active_id(), Some(first.clone()));
        assert_eq!(backend.load().unwrap().active_id, Some(first));
    }

    #[test]
    fn test_open_restores_saved_state() {
        let backend = MemoryHistory::new();
        let session = ChatSession::new("restored");
        let id = session.id.clone();
        backend.save(&[session], Some(&id)).unwrap();

        let store = SessionStore::open(Box::new(backend));
        assert_eq!(store.active_id(), Some(id));
        assert_eq!(store.snapshot().sessions[0].title, "restored");
    }

    #[test]
    fn test_open_with_failing_backend_starts_empty() {
        struct Broken;
        impl HistoryBackend for Broken {
            fn load(&self) -> Result<PersistedHistory> {
                Err(crate::error::ParleyError::Storage("corrupt".into()).into())
            }
            fn save(&self, _: &[ChatSession], _: Option<&str>) -> Result<()> {
                Err(crate::error::ParleyError::Storage("read-only".into()).into())
            }
        }

        let mut store = SessionStore::open(Box::new(Broken));
        assert!(store.snapshot().sessions.is_empty());
        // Save failures are swallowed
        let id = store.create_session();
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn test_fragment_persisted_after_append() {
        let (mut store, backend) = new_store();
        let sid = store.create_session();
        let mid = store.begin_assistant_message(&sid).unwrap();
        assert_eq!(store.append_fragment(&sid, &mid, "Hel"), FragmentOutcome::Appended);
        let saved = backend.load().unwrap();
        assert_eq!(saved.sessions[0].messages[0].content, "Hel");
    }

    #[test]
    fn test_fragments_are_saved_without_flushing() {
        let (mut store, backend) = new_store();
        let sid = store.create_session();
        let mid = store.begin_assistant_message(&sid).unwrap();
        let flushes = backend.flush_count();
        let saves = backend.save_count();

        store.append_fragment(&sid, &mid, "Hel");
        store.append_fragment(&sid, &mid, "lo!");
        assert_eq!(backend.save_count(), saves + 2);
        assert_eq!(backend.flush_count(), flushes);

        store.flush();
        assert_eq!(backend.flush_count(), flushes + 1);
    }

    #[test]
    fn test_session_changes_are_flushed() {
        let (mut store, backend) = new_store();
        let id = store.create_session();
        assert_eq!(backend.flush_count(), 1);
        store.clear_messages(&id);
        store.delete_session(&id);
        assert_eq!(backend.flush_count(), 3);
    }
}
