//! Parley - streaming chat client library
//!
//! This library provides the core functionality for Parley, a terminal chat
//! client for OpenAI-compatible completion endpoints. It keeps an ordered,
//! persisted collection of chat sessions and folds streamed replies into
//! them as fragments arrive.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Sessions, messages, and the immutable session state
//! - `storage`: History backends (sled on disk, in-memory)
//! - `client`: Completion client abstraction and the SSE streaming client
//! - `reconciler`: Folds streamed fragments into the assistant message
//! - `controller`: Runs one conversation turn against a client
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use parley::{ChatController, Config, SessionStore};
//! use parley::client::OpenAiClient;
//! use parley::storage::MemoryHistory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = SessionStore::open(Box::new(MemoryHistory::new()));
//!     let client = OpenAiClient::new(&config.api)?;
//!     let mut chat = ChatController::new(store, Box::new(client), &config);
//!     chat.send("Hi", &mut ()).await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use controller::{ChatController, ChatObserver, SendOutcome};
pub use error::{ParleyError, Result};
pub use session::{ChatSession, Message, Role, SessionState, SessionStore};

#[cfg(test)]
pub mod test_utils;
