//! Chat controller
//!
//! Ties the session store to a completion client: appends the user message,
//! issues the request with the session history, creates the assistant
//! placeholder, and folds the streamed reply into it. A failed request adds
//! a fixed fallback reply instead; nothing is retried.

use crate::client::{build_request_messages, CompletionClient};
use crate::config::Config;
use crate::reconciler::{FragmentOutcome, Reconciler, StreamSummary};
use crate::session::{Message, SessionStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a call to [`ChatController::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, nothing happened
    Ignored,
    /// A reply is still streaming; the input was not sent
    Busy,
    /// The reply streamed to completion
    Completed {
        /// Session that received the exchange
        session_id: String,
        /// Assistant message holding the reply
        message_id: String,
        /// Fragment counters
        summary: StreamSummary,
    },
    /// The request or stream failed and the fallback reply was added
    Failed {
        /// Session that received the exchange
        session_id: String,
        /// Id of the fallback message
        message_id: Option<String>,
        /// Rendered error
        error: String,
    },
}

/// Hooks for rendering progress while a reply streams in
///
/// All methods default to doing nothing.
pub trait ChatObserver {
    /// Loading state changed
    fn on_loading(&mut self, _loading: bool) {}

    /// The assistant placeholder was created
    fn on_placeholder(&mut self, _session_id: &str, _message_id: &str) {}

    /// A fragment was processed
    fn on_fragment(&mut self, _fragment: &str, _outcome: FragmentOutcome) {}

    /// The fallback reply was appended
    fn on_failure(&mut self, _fallback: &str) {}
}

/// Observer that ignores every event
impl ChatObserver for () {}

/// Drives one conversation turn at a time against a completion client
pub struct ChatController {
    store: SessionStore,
    client: Box<dyn CompletionClient>,
    model: String,
    system_prompt: String,
    fallback_message: String,
    loading: Arc<AtomicBool>,
}

/// Marks the controller as loading until dropped
///
/// Dropping a pending `send` future drops the guard too, so the flag can
/// never stay set.
struct LoadingGuard(Arc<AtomicBool>);

impl LoadingGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatController {
    /// Creates a controller using the model, prompt and fallback from `config`
    pub fn new(store: SessionStore, client: Box<dyn CompletionClient>, config: &Config) -> Self {
        Self {
            store,
            client,
            model: config.api.model.clone(),
            system_prompt: config.chat.system_prompt.clone(),
            fallback_message: config.chat.fallback_message.clone(),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a reply is currently streaming
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Read access to the session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Write access to the session store for session management commands
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Sends `text` to the active session and streams the reply
    ///
    /// Without an active session a new one is created, titled after `text`.
    pub async fn send(&mut self, text: &str, observer: &mut dyn ChatObserver) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        if self.is_loading() {
            tracing::debug!("Ignoring send while a reply is streaming");
            return SendOutcome::Busy;
        }

        let session_id = match self.store.active_id() {
            Some(id) => id,
            None => self.store.create_session_titled(text),
        };

        if self.store.append_user_message(&session_id, text).is_none() {
            return SendOutcome::Ignored;
        }

        let guard = LoadingGuard::engage(&self.loading);
        observer.on_loading(true);
        let outcome = self.complete(&session_id, observer).await;
        drop(guard);
        observer.on_loading(false);
        outcome
    }

    async fn complete(&mut self, session_id: &str, observer: &mut dyn ChatObserver) -> SendOutcome {
        let snapshot = self.store.snapshot();
        let messages = match snapshot.session(session_id) {
            Some(session) => build_request_messages(&self.system_prompt, session),
            None => return self.fail(session_id, "session disappeared".to_string(), observer),
        };

        let stream = match self.client.stream_chat(&self.model, &messages).await {
            Ok(stream) => stream,
            Err(e) => return self.fail(session_id, format!("{:#}", e), observer),
        };

        let message_id = match self.store.begin_assistant_message(session_id) {
            Some(id) => id,
            None => return self.fail(session_id, "session disappeared".to_string(), observer),
        };
        observer.on_placeholder(session_id, &message_id);

        let result = Reconciler::new(session_id, &message_id)
            .run(&mut self.store, stream, |fragment, outcome| {
                observer.on_fragment(fragment, outcome)
            })
            .await;

        match result {
            Ok(summary) => SendOutcome::Completed {
                session_id: session_id.to_string(),
                message_id,
                summary,
            },
            Err(e) => self.fail(session_id, format!("{:#}", e), observer),
        }
    }

    fn fail(
        &mut self,
        session_id: &str,
        error: String,
        observer: &mut dyn ChatObserver,
    ) -> SendOutcome {
        tracing::error!(session_id, "Completion failed: {}", error);
        let message_id = self
            .store
            .push_assistant_message(session_id, &self.fallback_message);
        observer.on_failure(&self.fallback_message);
        SendOutcome::Failed {
            session_id: session_id.to_string(),
            message_id,
            error,
        }
    }

    /// Last message of the active session, if any
    pub fn last_message(&self) -> Option<Message> {
        self.store
            .snapshot()
            .active()
            .and_then(|s| s.messages.last().cloned())
    }
}
