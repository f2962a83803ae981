//! Conversational agent
//!
//! The orchestrator turns a user utterance into a routed, auditable
//! outcome: it resolves the session, interprets intent against the
//! user's pending tickets, invokes the classification pipeline and the
//! action executor as needed, and streams progress events to the caller.
//!
//! ## Core Components
//! - `AgentOrchestrator` - per-invocation state machine and event stream
//! - `ActionExecutor` - the three ticket mutations, all-or-nothing
//! - `IntentResolver` / `KeywordIntentResolver` - pluggable intent routing
//! - `AgentEvent` - the streaming wire records

pub mod actions;
pub mod events;
pub mod intent;
pub mod orchestrator;
pub mod reply;

pub use actions::{ActionDetails, ActionError, ActionExecutor, ActionKind, EtaPolicy};
pub use events::AgentEvent;
pub use intent::{Intent, IntentResolver, KeywordIntentResolver};
pub use orchestrator::{AgentOrchestrator, HandleRequest};
