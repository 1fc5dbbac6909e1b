//! Completion client abstraction
//!
//! A completion client turns a model id and an ordered message history into
//! a stream of text fragments. [`OpenAiClient`] talks to any
//! OpenAI-compatible `/chat/completions` endpoint.

use crate::error::Result;
use crate::session::{ChatSession, Role};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub mod openai;

pub use openai::{parse_sse_stream, OpenAiClient};

/// Stream of text fragments, terminated by end-of-stream or an error item
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One `{role, content}` pair sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a message pair
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Builds the request history for a session
///
/// The system prompt comes first, followed by every stored message in order.
///
/// # Examples
///
/// ```
/// use parley::client::build_request_messages;
/// use parley::session::{ChatSession, Message, Role};
///
/// let mut session = ChatSession::new("Hi");
/// session.messages.push(Message::user("Hi"));
/// let messages = build_request_messages("Be brief.", &session);
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// ```
pub fn build_request_messages(system_prompt: &str, session: &ChatSession) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage::new(Role::System, system_prompt))
        .chain(
            session
                .messages
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        )
        .collect()
}

/// Client for a streaming chat-completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issues a streaming completion request
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the endpoint
    /// answers with a non-success status. Failures after the stream has
    /// started are delivered as error items on the stream.
    async fn stream_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<FragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;

    #[test]
    fn test_request_messages_keep_history_order() {
        let mut session = ChatSession::new("t");
        session.messages.push(Message::user("one"));
        session.messages.push(Message::assistant("two"));
        session.messages.push(Message::user("three"));

        let messages = build_request_messages("sys", &session);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "one", "two", "three"]);
        assert_eq!(messages[2].role, Role::Assistant);
    }

    #[test]
    fn test_chat_message_wire_format() {
        let json = serde_json::to_value(ChatMessage::new(Role::User, "hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
