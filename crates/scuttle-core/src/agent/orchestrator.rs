//! Agent orchestrator
//!
//! Top-level entry point: takes a user utterance plus an optional
//! session id and produces a live stream of events, ending in exactly
//! one `complete` or `error` record. Each invocation runs as its own
//! task; invocations on the same session queue behind a per-session
//! lock so message appends never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::classify::RetryingClassifier;
use crate::error::AgentError;
use crate::storage::{MessageRole, SessionError, SessionStore};
use crate::tickets::{Ticket, TicketStore};

use super::actions::{ActionDetails, ActionError, ActionExecutor, ActionKind, EtaPolicy};
use super::events::AgentEvent;
use super::intent::{Intent, IntentResolver, KeywordIntentResolver};
use super::reply;

/// One inbound agent request
#[derive(Debug, Clone)]
pub struct HandleRequest {
    /// Absent for the first message of a new conversation
    pub session_id: Option<String>,
    pub user_id: String,
    pub text: String,
}

/// Payload for the terminal `complete` event and the assistant append
struct Outcome {
    response: String,
    action: Option<(ActionKind, ActionDetails)>,
}

/// Orchestrates classification, actions, and session persistence for
/// conversational ticket requests.
pub struct AgentOrchestrator {
    sessions: Arc<SessionStore>,
    tickets: Arc<dyn TicketStore>,
    executor: ActionExecutor,
    intents: Arc<dyn IntentResolver>,
    /// One lock per session id; a session admits one in-flight call
    session_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl AgentOrchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        tickets: Arc<dyn TicketStore>,
        classifier: Arc<RetryingClassifier>,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(tickets.clone(), classifier, EtaPolicy::default()),
            sessions,
            tickets,
            intents: Arc::new(KeywordIntentResolver::new()),
            session_locks: DashMap::new(),
        }
    }

    /// Swap in a different intent resolver
    pub fn with_intent_resolver(mut self, intents: Arc<dyn IntentResolver>) -> Self {
        self.intents = intents;
        self
    }

    /// Handle one user utterance.
    ///
    /// Returns immediately with the event stream; the work runs in its
    /// own task. Dropping the stream does not cancel the work: ticket
    /// mutations and session appends still complete, only their event
    /// delivery is lost.
    pub fn handle(self: Arc<Self>, request: HandleRequest) -> UnboundedReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = self;

        tokio::spawn(async move {
            let terminal = match this.run(&request, &tx).await {
                Ok(event) => event,
                Err(e) => {
                    warn!(user_id = %request.user_id, "agent invocation failed: {}", e);
                    AgentEvent::error(e.to_string())
                }
            };
            let _ = tx.send(terminal);
        });

        UnboundedReceiverStream::new(rx)
    }

    fn lock_for(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn run(
        &self,
        request: &HandleRequest,
        tx: &mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<AgentEvent, AgentError> {
        let session_id = self.resolve_session(request)?;

        // Serialize the whole exchange per session: both appends happen
        // under the lock, so a second call queues rather than interleaves.
        let lock = self.lock_for(&session_id);
        let _guard = lock.lock().await;

        self.sessions
            .append_message(&session_id, MessageRole::User, &request.text, None, None)
            .map_err(map_session_error)?;

        let _ = tx.send(AgentEvent::status("Looking up your tickets..."));
        let pending = self
            .tickets
            .list_pending(&request.user_id)
            .await
            .map_err(AgentError::from)?;

        let intent = self.intents.resolve(&request.text, &pending);
        debug!(session_id = %session_id, intent = ?intent, "intent resolved");

        let outcome = self.execute(request, &pending, intent, tx).await?;

        let details_value = outcome
            .action
            .as_ref()
            .map(|(_, details)| serde_json::to_value(details))
            .transpose()
            .map_err(|e| AgentError::Internal(e.to_string()))?;
        let message_id = self
            .sessions
            .append_message(
                &session_id,
                MessageRole::Assistant,
                &outcome.response,
                outcome.action.as_ref().map(|(kind, _)| kind.as_str()),
                details_value.as_ref(),
            )
            .map_err(map_session_error)?;

        Ok(AgentEvent::Complete {
            response: outcome.response,
            session_id,
            message_id: message_id.to_string(),
            action_performed: outcome.action.as_ref().map(|(kind, _)| *kind),
            action_details: outcome.action.map(|(_, details)| details),
        })
    }

    /// Look up the caller's session, or create one titled after the
    /// first message.
    fn resolve_session(&self, request: &HandleRequest) -> Result<String, AgentError> {
        match &request.session_id {
            Some(id) => {
                let owned = self
                    .sessions
                    .verify_ownership(id, &request.user_id)
                    .map_err(map_session_error)?;
                if !owned {
                    return Err(AgentError::SessionNotFound(id.clone()));
                }
                Ok(id.clone())
            }
            None => {
                let title = SessionStore::generate_title_from_content(&request.text);
                let session = self
                    .sessions
                    .create_session(&request.user_id, &title)
                    .map_err(map_session_error)?;
                Ok(session.id)
            }
        }
    }

    async fn execute(
        &self,
        request: &HandleRequest,
        pending: &[Ticket],
        intent: Intent,
        tx: &mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<Outcome, AgentError> {
        match intent {
            Intent::CreateTicket { message } => {
                let _ = tx.send(AgentEvent::status("Classifying message..."));
                let _ = tx.send(AgentEvent::status("Creating ticket..."));
                let (_, details) = self
                    .executor
                    .create_ticket(&request.user_id, &message)
                    .await
                    .map_err(map_action_error)?;
                Ok(Outcome {
                    response: reply::action_response(&details),
                    action: Some((ActionKind::CreateTicket, details)),
                })
            }
            Intent::UpdateCategory { ticket_id, category } => {
                let _ = tx.send(AgentEvent::status("Updating ticket..."));
                let (_, details) = self
                    .executor
                    .update_category(ticket_id, category)
                    .await
                    .map_err(map_action_error)?;
                Ok(Outcome {
                    response: reply::action_response(&details),
                    action: Some((ActionKind::UpdateCategory, details)),
                })
            }
            Intent::ReopenTicket { ticket_id } => {
                let _ = tx.send(AgentEvent::status("Looking up ticket..."));
                let (_, details) = self
                    .executor
                    .reopen_ticket(ticket_id)
                    .await
                    .map_err(map_action_error)?;
                Ok(Outcome {
                    response: reply::action_response(&details),
                    action: Some((ActionKind::ReopenTicket, details)),
                })
            }
            Intent::StatusQuery { ticket_id } => {
                let response = match ticket_id {
                    Some(id) => {
                        let _ = tx.send(AgentEvent::status("Looking up ticket..."));
                        let ticket = self.tickets.get(id).await.map_err(AgentError::from)?;
                        reply::status_response(std::slice::from_ref(&ticket))
                    }
                    None => reply::status_response(pending),
                };
                Ok(Outcome { response, action: None })
            }
            Intent::GeneralChat => Ok(Outcome {
                response: reply::general_chat_response(pending),
                action: None,
            }),
        }
    }
}

fn map_session_error(err: SessionError) -> AgentError {
    match err {
        SessionError::NotFound(id) => AgentError::SessionNotFound(id),
        SessionError::Storage(e) => AgentError::StoreUnavailable(e.to_string()),
    }
}

fn map_action_error(err: ActionError) -> AgentError {
    match err {
        ActionError::NotFound(id) => AgentError::TicketNotFound(id),
        e @ ActionError::InvalidTransition { .. } => AgentError::InvalidTransition(e.to_string()),
        ActionError::StoreUnavailable(msg) => AgentError::StoreUnavailable(msg),
    }
}
