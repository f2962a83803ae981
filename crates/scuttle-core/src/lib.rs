//! Scuttle Core - classification-and-agent core for ticket support
//!
//! This crate turns free-text customer messages into routed, auditable
//! actions:
//! - Classification pipeline with a model-backed strategy, bounded
//!   retry/backoff, and a deterministic keyword fallback
//! - Conversational agent that reads pending tickets, performs
//!   ticket mutations, and streams incremental progress
//! - SQLite-backed session and message storage

pub mod agent;
pub mod classify;
pub mod constants;
pub mod error;
pub mod storage;
pub mod tickets;

// Re-exports for convenience
pub use agent::{AgentEvent, AgentOrchestrator, HandleRequest};
pub use classify::{
    Category, ClassificationResult, Classifier, ClassifyError, KeywordFallbackClassifier,
    ModelClassifier, ModelClassifierConfig, RetryConfig, RetryingClassifier, Source, Team,
};
pub use error::AgentError;
pub use storage::{ChatMessage, ChatSession, Database, MessageRole, SessionStore};
pub use tickets::{MemoryTicketStore, Ticket, TicketStatus, TicketStore};
