//! Ticket store seam
//!
//! The core reads and writes a handful of ticket fields through the
//! `TicketStore` trait; persistence itself belongs to an external
//! collaborator. `MemoryTicketStore` backs tests and the CLI demo.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryTicketStore;

use crate::classify::{Category, Team};

/// Ticket lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Only settled tickets can be reopened
    pub fn is_reopenable(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ticket fields the core touches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub category: Category,
    pub assigned_team: Team,
    pub status: TicketStatus,
    /// Classifier confidence recorded at creation
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    /// Expected resolution time, recomputed when the category changes
    pub expected_resolution: DateTime<Utc>,
}

/// Fields for inserting a fresh ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: String,
    pub message: String,
    pub category: Category,
    pub assigned_team: Team,
    pub confidence: f32,
    pub expected_resolution: DateTime<Utc>,
}

/// Partial update applied atomically by the store
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub category: Option<Category>,
    pub assigned_team: Option<Team>,
    pub status: Option<TicketStatus>,
    pub expected_resolution: Option<DateTime<Utc>>,
}

/// Ticket store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticket #{0} not found")]
    NotFound(i64),

    /// The store itself is down. Escalated, not retried by this core.
    #[error("ticket store unavailable: {0}")]
    Unavailable(String),
}

/// Interface consumed from the external ticket store.
///
/// Implementations must apply each call atomically: the caller either
/// observes the post-state or an error with nothing changed.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create(&self, new: NewTicket) -> Result<Ticket, StoreError>;

    async fn get(&self, id: i64) -> Result<Ticket, StoreError>;

    async fn update(&self, id: i64, patch: TicketPatch) -> Result<Ticket, StoreError>;

    /// Pending tickets for a user, most recent first
    async fn list_pending(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError>;
}
