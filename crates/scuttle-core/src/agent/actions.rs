//! Ticket-mutating actions
//!
//! Each action is a short state machine over `Ticket.status`, applied
//! all-or-nothing against the ticket store: the caller either receives
//! the post-state or an error with nothing changed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::classify::{route, Category, RetryingClassifier, Source, Team};
use crate::tickets::{NewTicket, StoreError, Ticket, TicketPatch, TicketStatus, TicketStore};

/// The three action kinds the agent may perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateTicket,
    UpdateCategory,
    ReopenTicket,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateTicket => "create_ticket",
            ActionKind::UpdateCategory => "update_category",
            ActionKind::ReopenTicket => "reopen_ticket",
        }
    }
}

/// Kind-specific before/after record attached to the assistant message
/// that performed the mutation. Exists iff ticket state actually changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDetails {
    Created {
        ticket_id: i64,
        category: Category,
        assigned_team: Team,
        status: TicketStatus,
        confidence: f32,
        /// Whether the model or the keyword fallback classified it
        source: Source,
        eta: DateTime<Utc>,
    },
    Recategorized {
        ticket_id: i64,
        old_category: Category,
        new_category: Category,
        old_team: Team,
        new_team: Team,
        old_status: TicketStatus,
        new_status: TicketStatus,
        new_eta: DateTime<Utc>,
    },
    Reopened {
        ticket_id: i64,
        old_status: TicketStatus,
        new_status: TicketStatus,
    },
}

/// Action failures. Each maps to a terminal `error` event upstream.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("ticket #{0} not found")]
    NotFound(i64),

    #[error("ticket #{ticket_id} is currently {status}; only resolved or closed tickets can be reopened")]
    InvalidTransition { ticket_id: i64, status: TicketStatus },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ActionError::NotFound(id),
            StoreError::Unavailable(msg) => ActionError::StoreUnavailable(msg),
        }
    }
}

/// Expected-resolution policy: a fixed offset from now per category.
#[derive(Debug, Clone)]
pub struct EtaPolicy {
    pub billing_hours: i64,
    pub technical_hours: i64,
    pub delivery_hours: i64,
    pub general_hours: i64,
}

impl Default for EtaPolicy {
    fn default() -> Self {
        // Delivery issues are urgent; technical ones take the longest.
        Self {
            billing_hours: 4,
            technical_hours: 8,
            delivery_hours: 2,
            general_hours: 6,
        }
    }
}

impl EtaPolicy {
    pub fn eta_for(&self, category: Category) -> DateTime<Utc> {
        let hours = match category {
            Category::Billing => self.billing_hours,
            Category::Technical => self.technical_hours,
            Category::Delivery => self.delivery_hours,
            Category::General => self.general_hours,
        };
        Utc::now() + Duration::hours(hours)
    }
}

/// Applies ticket-mutating intents against the ticket store
pub struct ActionExecutor {
    tickets: Arc<dyn TicketStore>,
    classifier: Arc<RetryingClassifier>,
    eta: EtaPolicy,
}

impl ActionExecutor {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        classifier: Arc<RetryingClassifier>,
        eta: EtaPolicy,
    ) -> Self {
        Self { tickets, classifier, eta }
    }

    /// Classify the message and insert a fresh pending ticket.
    ///
    /// Classification is total, so this only fails when the ticket store
    /// itself is unavailable.
    pub async fn create_ticket(
        &self,
        user_id: &str,
        message: &str,
    ) -> Result<(Ticket, ActionDetails), ActionError> {
        let classification = self.classifier.classify(message).await;
        let team = route(classification.category);
        let eta = self.eta.eta_for(classification.category);

        let ticket = self
            .tickets
            .create(NewTicket {
                user_id: user_id.to_string(),
                message: message.to_string(),
                category: classification.category,
                assigned_team: team,
                confidence: classification.confidence,
                expected_resolution: eta,
            })
            .await?;

        info!(
            ticket_id = ticket.id,
            category = %ticket.category,
            team = %ticket.assigned_team,
            source = ?classification.source,
            "ticket created"
        );

        let details = ActionDetails::Created {
            ticket_id: ticket.id,
            category: ticket.category,
            assigned_team: ticket.assigned_team,
            status: ticket.status,
            confidence: classification.confidence,
            source: classification.source,
            eta,
        };
        Ok((ticket, details))
    }

    /// Change a ticket's category: reroute the team, reset status to
    /// pending, recompute the ETA.
    pub async fn update_category(
        &self,
        ticket_id: i64,
        new_category: Category,
    ) -> Result<(Ticket, ActionDetails), ActionError> {
        let before = self.tickets.get(ticket_id).await?;
        let new_team = route(new_category);
        let new_eta = self.eta.eta_for(new_category);

        let after = self
            .tickets
            .update(
                ticket_id,
                TicketPatch {
                    category: Some(new_category),
                    assigned_team: Some(new_team),
                    // Any rework restarts the pending clock
                    status: Some(TicketStatus::Pending),
                    expected_resolution: Some(new_eta),
                },
            )
            .await?;

        info!(
            ticket_id,
            old_category = %before.category,
            new_category = %after.category,
            "ticket recategorized"
        );

        let details = ActionDetails::Recategorized {
            ticket_id,
            old_category: before.category,
            new_category: after.category,
            old_team: before.assigned_team,
            new_team: after.assigned_team,
            old_status: before.status,
            new_status: after.status,
            new_eta,
        };
        Ok((after, details))
    }

    /// Reopen a resolved or closed ticket
    pub async fn reopen_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<(Ticket, ActionDetails), ActionError> {
        let before = self.tickets.get(ticket_id).await?;
        if !before.status.is_reopenable() {
            return Err(ActionError::InvalidTransition {
                ticket_id,
                status: before.status,
            });
        }

        let after = self
            .tickets
            .update(
                ticket_id,
                TicketPatch {
                    status: Some(TicketStatus::Pending),
                    ..TicketPatch::default()
                },
            )
            .await?;

        info!(ticket_id, old_status = %before.status, "ticket reopened");

        let details = ActionDetails::Reopened {
            ticket_id,
            old_status: before.status,
            new_status: after.status,
        };
        Ok((after, details))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::classify::{Classifier, ClassifyError, RetryConfig};
    use crate::tickets::MemoryTicketStore;

    use super::*;

    /// Model stub that always fails, forcing the keyword fallback
    struct DownClassifier;

    #[async_trait]
    impl Classifier for DownClassifier {
        async fn classify(&self, _text: &str) -> Result<(Category, f32), ClassifyError> {
            Err(ClassifyError::Model("offline".to_string()))
        }
    }

    fn executor_with(store: Arc<MemoryTicketStore>) -> ActionExecutor {
        let classifier = Arc::new(RetryingClassifier::new(
            Arc::new(DownClassifier),
            RetryConfig { jitter: false, ..RetryConfig::default() },
        ));
        ActionExecutor::new(store, classifier, EtaPolicy::default())
    }

    fn seeded(store: &MemoryTicketStore, status: TicketStatus) -> Ticket {
        store.seed(
            NewTicket {
                user_id: "alice".to_string(),
                message: "app crashes on login".to_string(),
                category: Category::Technical,
                assigned_team: Team::TechSupport,
                confidence: 0.9,
                expected_resolution: Utc::now(),
            },
            status,
        )
    }

    #[tokio::test]
    async fn create_classifies_and_inserts_pending() {
        let store = Arc::new(MemoryTicketStore::new());
        let executor = executor_with(store.clone());

        let (ticket, details) = executor
            .create_ticket("alice", "I was charged twice, please refund me")
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.category, Category::Billing);
        assert_eq!(ticket.assigned_team, Team::BillingTeam);
        assert!(ticket.expected_resolution > Utc::now());
        match details {
            ActionDetails::Created { source, .. } => assert_eq!(source, Source::Fallback),
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_category_reroutes_and_resets_status() {
        let store = Arc::new(MemoryTicketStore::new());
        let ticket = seeded(&store, TicketStatus::InProgress);
        let executor = executor_with(store.clone());

        let (after, details) = executor
            .update_category(ticket.id, Category::Billing)
            .await
            .unwrap();

        assert_eq!(after.category, Category::Billing);
        assert_eq!(after.assigned_team, Team::BillingTeam);
        // Status resets to pending regardless of prior status
        assert_eq!(after.status, TicketStatus::Pending);
        assert!(after.expected_resolution > ticket.expected_resolution);
        match details {
            ActionDetails::Recategorized { old_category, old_status, .. } => {
                assert_eq!(old_category, Category::Technical);
                assert_eq!(old_status, TicketStatus::InProgress);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_category_unknown_ticket_is_not_found() {
        let store = Arc::new(MemoryTicketStore::new());
        let executor = executor_with(store);

        let err = executor.update_category(404, Category::General).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(404)));
    }

    #[tokio::test]
    async fn reopen_succeeds_from_resolved_and_closed() {
        let store = Arc::new(MemoryTicketStore::new());
        let resolved = seeded(&store, TicketStatus::Resolved);
        let closed = seeded(&store, TicketStatus::Closed);
        let executor = executor_with(store.clone());

        for ticket in [resolved, closed] {
            let (after, _) = executor.reopen_ticket(ticket.id).await.unwrap();
            assert_eq!(after.status, TicketStatus::Pending);
        }
    }

    #[tokio::test]
    async fn reopen_rejects_open_tickets_and_leaves_them_unchanged() {
        let store = Arc::new(MemoryTicketStore::new());
        let executor = executor_with(store.clone());

        for status in [TicketStatus::Pending, TicketStatus::InProgress] {
            let ticket = seeded(&store, status);
            let err = executor.reopen_ticket(ticket.id).await.unwrap_err();
            assert!(matches!(err, ActionError::InvalidTransition { .. }));

            let untouched = store.get(ticket.id).await.unwrap();
            assert_eq!(untouched.status, status);
        }
    }

    #[test]
    fn eta_policy_orders_categories_by_urgency() {
        let policy = EtaPolicy::default();
        let delivery = policy.eta_for(Category::Delivery);
        let technical = policy.eta_for(Category::Technical);
        assert!(delivery < technical);
    }
}
