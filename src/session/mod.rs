//! Chat sessions: data model, immutable state, and the persisting store

pub mod state;
pub mod store;
pub mod types;

pub use state::SessionState;
pub use store::SessionStore;
pub use types::{derive_title, new_id, ChatSession, Message, Role, DEFAULT_TITLE, TITLE_MAX_CHARS};
