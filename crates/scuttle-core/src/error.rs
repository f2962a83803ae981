//! Orchestrator-facing error types

use thiserror::Error;

use crate::tickets::StoreError;

/// Errors that terminate a single agent invocation.
///
/// Classification failures never appear here: they are absorbed inside the
/// retry layer and surface as a fallback result instead. Everything below
/// ends the invocation's stream with a single `error` event.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Session not found (or owned by another user)
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Ticket not found
    #[error("ticket #{0} not found")]
    TicketNotFound(i64),

    /// Action precondition violated
    #[error("{0}")]
    InvalidTransition(String),

    /// External store is down; fatal for this invocation only
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Anything else that should not have happened
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AgentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AgentError::TicketNotFound(id),
            StoreError::Unavailable(msg) => AgentError::StoreUnavailable(msg),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Internal(err.to_string())
    }
}
