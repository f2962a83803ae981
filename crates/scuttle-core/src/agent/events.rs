//! Streaming wire events
//!
//! Transport-agnostic records pushed to the caller during one agent
//! invocation. Every stream is `status* (complete | error)`: any number
//! of observational status records, then exactly one terminal record.

use serde::{Deserialize, Serialize};

use super::actions::{ActionDetails, ActionKind};

/// One record on the event stream for a single `handle` call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// In-progress note. Purely observational, never alters state.
    Status { message: String },

    /// Terminal success record
    Complete {
        response: String,
        session_id: String,
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        action_performed: Option<ActionKind>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action_details: Option<ActionDetails>,
    },

    /// Terminal failure record
    Error { message: String },
}

impl AgentEvent {
    pub fn status(message: impl Into<String>) -> Self {
        AgentEvent::Status { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AgentEvent::Error { message: message.into() }
    }

    /// Whether this record terminates the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AgentEvent::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_the_wire_shape() {
        let json = serde_json::to_value(AgentEvent::status("Classifying message...")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "status", "message": "Classifying message..."})
        );
    }

    #[test]
    fn complete_omits_absent_action_fields() {
        let event = AgentEvent::Complete {
            response: "hi".to_string(),
            session_id: "s-1".to_string(),
            message_id: "7".to_string(),
            action_performed: None,
            action_details: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "complete",
                "response": "hi",
                "session_id": "s-1",
                "message_id": "7"
            })
        );
    }

    #[test]
    fn error_round_trips() {
        let event = AgentEvent::error("ticket #9 not found");
        let json = serde_json::to_string(&event).unwrap();
        let back: AgentEvent = serde_json::from_str(&json).unwrap();
        assert!(back.is_terminal());
        assert!(matches!(back, AgentEvent::Error { message } if message.contains("#9")));
    }
}
