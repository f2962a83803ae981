//! In-memory ticket store
//!
//! Backs tests and the CLI demo. A single lock serializes mutations, so
//! per-ticket updates are atomic by construction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{NewTicket, StoreError, Ticket, TicketPatch, TicketStatus, TicketStore};

#[derive(Default)]
pub struct MemoryTicketStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tickets: BTreeMap<i64, Ticket>,
    next_id: i64,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ticket in a given state. Test/demo helper.
    pub fn seed(&self, new: NewTicket, status: TicketStatus) -> Ticket {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let ticket = Ticket {
            id: inner.next_id,
            user_id: new.user_id,
            message: new.message,
            category: new.category,
            assigned_team: new.assigned_team,
            status,
            confidence: new.confidence,
            created_at: Utc::now(),
            expected_resolution: new.expected_resolution,
        };
        inner.tickets.insert(ticket.id, ticket.clone());
        ticket
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn create(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        Ok(self.seed(new, TicketStatus::Pending))
    }

    async fn get(&self, id: i64) -> Result<Ticket, StoreError> {
        self.inner
            .lock()
            .tickets
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, patch: TicketPatch) -> Result<Ticket, StoreError> {
        let mut inner = self.inner.lock();
        let ticket = inner.tickets.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(category) = patch.category {
            ticket.category = category;
        }
        if let Some(team) = patch.assigned_team {
            ticket.assigned_team = team;
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(eta) = patch.expected_resolution {
            ticket.expected_resolution = eta;
        }

        Ok(ticket.clone())
    }

    async fn list_pending(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.lock();
        let mut pending: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.user_id == user_id && t.status == TicketStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(pending)
    }
}
