//! Session and message persistence
//!
//! SQLite-backed storage with versioned migrations. The session store is
//! the only stateful piece of the core; everything else is constructed
//! per call or stateless.

pub mod database;
pub mod messages;
pub mod sessions;

pub use database::Database;
pub use messages::{ChatMessage, MessageRole, MessageStore};
pub use sessions::{ChatSession, SessionError, SessionStore};
