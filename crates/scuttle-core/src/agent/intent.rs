//! Intent resolution
//!
//! Best-effort interpretation of a free-text utterance against the
//! user's pending tickets. Pluggable behind `IntentResolver`; the
//! default is keyword-driven. Ambiguous input resolves to `GeneralChat`,
//! never to a mutating action.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::Category;
use crate::tickets::Ticket;

/// What the user is asking the agent to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CreateTicket { message: String },
    UpdateCategory { ticket_id: i64, category: Category },
    ReopenTicket { ticket_id: i64 },
    /// Surface ticket fields; a specific ticket when one was named
    StatusQuery { ticket_id: Option<i64> },
    GeneralChat,
}

/// Pluggable intent router. Implementations must be pure: same utterance
/// and ticket list, same intent.
pub trait IntentResolver: Send + Sync {
    fn resolve(&self, text: &str, pending: &[Ticket]) -> Intent;
}

const REOPEN_KEYWORDS: &[&str] = &[
    "reopen",
    "open again",
    "not resolved",
    "still have issue",
    "not fixed",
    "still broken",
    "issue persists",
];

const CREATE_KEYWORDS: &[&str] = &[
    "create ticket",
    "create a ticket",
    "new ticket",
    "open ticket",
    "open a ticket",
    "submit ticket",
    "file a ticket",
    "make a ticket",
    "raise a ticket",
    "report issue",
    "report an issue",
    "i need help",
    "i have a problem",
];

const CHANGE_KEYWORDS: &[&str] = &[
    "change category",
    "change team",
    "wrong category",
    "wrong team",
    "should be",
    "this is actually",
    "reassign",
    "move to",
];

const STATUS_KEYWORDS: &[&str] = &[
    "status",
    "eta",
    "when will",
    "how long",
    "progress",
    "any update",
    "where is my ticket",
];

/// Category cue words for the change intent. Broader than the category
/// name alone: "move this to the billing team" names no category slug.
const CATEGORY_CUES: [(Category, &[&str]); 4] = [
    (Category::Billing, &["billing", "payment", "invoice", "charge", "refund"]),
    (Category::Technical, &["technical", "tech", "bug", "error", "software"]),
    (Category::Delivery, &["delivery", "shipping", "order", "package"]),
    (Category::General, &["general", "other"]),
];

/// "ticket #12", "ticket 12", "#12"
static EXPLICIT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:ticket\s*#?\s*|#)(\d+)").expect("valid regex"));

/// Any bare number; only trusted when it names one of the user's tickets
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("valid regex"));

/// Leading connector after a create keyword: "create a ticket for ..."
static CONNECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(?:for|about|regarding|concerning|with|:)\s+").expect("valid regex"));

/// Keyword-driven resolver recovered from the original agent
#[derive(Debug, Default, Clone)]
pub struct KeywordIntentResolver;

impl KeywordIntentResolver {
    pub fn new() -> Self {
        Self
    }

    /// An id the user explicitly wrote as a ticket reference
    fn explicit_ticket_id(text: &str) -> Option<i64> {
        EXPLICIT_ID
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Explicit id, else a bare number matching one of the user's
    /// tickets, else the most recent pending ticket.
    fn referenced_ticket_id(text: &str, pending: &[Ticket]) -> Option<i64> {
        if let Some(id) = Self::explicit_ticket_id(text) {
            return Some(id);
        }
        for caps in BARE_NUMBER.captures_iter(text) {
            if let Ok(id) = caps[1].parse::<i64>() {
                if pending.iter().any(|t| t.id == id) {
                    return Some(id);
                }
            }
        }
        pending.first().map(|t| t.id)
    }

    /// Extract the ticket body from a create request: the text after the
    /// keyword, connectors stripped; short remainders keep the whole
    /// message.
    fn extract_ticket_message(text: &str, text_lower: &str) -> String {
        for keyword in CREATE_KEYWORDS {
            if let Some(idx) = text_lower.find(keyword) {
                let after = text[idx + keyword.len()..].trim();
                let cleaned = CONNECTOR.replace(after, "").trim().to_string();
                if cleaned.chars().count() >= 10 {
                    return cleaned;
                }
                break;
            }
        }
        text.trim().to_string()
    }

    fn requested_category(text_lower: &str) -> Option<Category> {
        CATEGORY_CUES
            .iter()
            .find(|(_, cues)| cues.iter().any(|cue| text_lower.contains(cue)))
            .map(|(category, _)| *category)
    }
}

impl IntentResolver for KeywordIntentResolver {
    fn resolve(&self, text: &str, pending: &[Ticket]) -> Intent {
        let text_lower = text.to_lowercase();

        // Reopen targets settled tickets, which never appear in the
        // pending list, so it demands an explicit id: guessing here would
        // let ambiguity resolve into a mutation.
        if REOPEN_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            if let Some(ticket_id) = Self::explicit_ticket_id(text) {
                return Intent::ReopenTicket { ticket_id };
            }
        }

        if CREATE_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            return Intent::CreateTicket {
                message: Self::extract_ticket_message(text, &text_lower),
            };
        }

        if CHANGE_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            if let Some(category) = Self::requested_category(&text_lower) {
                if let Some(ticket_id) = Self::referenced_ticket_id(text, pending) {
                    return Intent::UpdateCategory { ticket_id, category };
                }
            }
        }

        if STATUS_KEYWORDS.iter().any(|kw| text_lower.contains(kw)) {
            let named = Self::explicit_ticket_id(text).or_else(|| {
                BARE_NUMBER
                    .captures_iter(text)
                    .filter_map(|caps| caps[1].parse::<i64>().ok())
                    .find(|id| pending.iter().any(|t| t.id == *id))
            });
            return Intent::StatusQuery { ticket_id: named };
        }

        Intent::GeneralChat
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::classify::route;
    use crate::tickets::TicketStatus;

    use super::*;

    fn pending_ticket(id: i64) -> Ticket {
        Ticket {
            id,
            user_id: "alice".to_string(),
            message: "message".to_string(),
            category: Category::General,
            assigned_team: route(Category::General),
            status: TicketStatus::Pending,
            confidence: 0.8,
            created_at: Utc::now(),
            expected_resolution: Utc::now(),
        }
    }

    #[test]
    fn reopen_with_explicit_id() {
        let resolver = KeywordIntentResolver::new();
        let intent = resolver.resolve("please reopen ticket #42, it's still broken", &[]);
        assert_eq!(intent, Intent::ReopenTicket { ticket_id: 42 });
    }

    #[test]
    fn reopen_without_id_never_mutates() {
        let resolver = KeywordIntentResolver::new();
        let intent = resolver.resolve("this is still broken", &[pending_ticket(7)]);
        assert_eq!(intent, Intent::GeneralChat);
    }

    #[test]
    fn create_extracts_the_ticket_body() {
        let resolver = KeywordIntentResolver::new();
        let intent = resolver.resolve(
            "Please create a ticket for my broken laptop screen flickering",
            &[],
        );
        match intent {
            Intent::CreateTicket { message } => {
                assert_eq!(message, "my broken laptop screen flickering");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn create_with_short_remainder_keeps_full_message() {
        let resolver = KeywordIntentResolver::new();
        let intent = resolver.resolve("I have a problem", &[]);
        assert_eq!(
            intent,
            Intent::CreateTicket { message: "I have a problem".to_string() }
        );
    }

    #[test]
    fn change_needs_a_category_cue() {
        let resolver = KeywordIntentResolver::new();
        let tickets = [pending_ticket(3)];

        let intent = resolver.resolve("this is in the wrong category, should be billing", &tickets);
        assert_eq!(
            intent,
            Intent::UpdateCategory { ticket_id: 3, category: Category::Billing }
        );

        // A change phrase without a target category stays conversational
        let vague = resolver.resolve("I think this is assigned wrong category", &tickets);
        assert_eq!(vague, Intent::GeneralChat);
    }

    #[test]
    fn change_prefers_the_explicitly_named_ticket() {
        let resolver = KeywordIntentResolver::new();
        let tickets = [pending_ticket(9), pending_ticket(3)];

        let intent = resolver.resolve("reassign ticket 3 to the delivery team", &tickets);
        assert_eq!(
            intent,
            Intent::UpdateCategory { ticket_id: 3, category: Category::Delivery }
        );
    }

    #[test]
    fn status_query_with_and_without_a_named_ticket() {
        let resolver = KeywordIntentResolver::new();
        let tickets = [pending_ticket(12)];

        assert_eq!(
            resolver.resolve("what's the status of #12?", &tickets),
            Intent::StatusQuery { ticket_id: Some(12) }
        );
        assert_eq!(
            resolver.resolve("any update on my tickets?", &tickets),
            Intent::StatusQuery { ticket_id: None }
        );
    }

    #[test]
    fn bare_numbers_only_count_when_they_name_a_known_ticket() {
        let resolver = KeywordIntentResolver::new();
        let tickets = [pending_ticket(12)];

        // 99 names no ticket; the most recent pending one is used instead
        let intent = resolver.resolve("wrong category, this is a billing charge 99", &tickets);
        assert_eq!(
            intent,
            Intent::UpdateCategory { ticket_id: 12, category: Category::Billing }
        );
    }

    #[test]
    fn plain_chat_defaults_to_general_chat() {
        let resolver = KeywordIntentResolver::new();
        assert_eq!(resolver.resolve("good morning!", &[]), Intent::GeneralChat);
    }

    #[test]
    fn resolution_ignores_ticket_status_fields() {
        // The resolver only reads ids; a resolved ticket in the slice
        // (however it got there) changes nothing.
        let mut ticket = pending_ticket(5);
        ticket.status = TicketStatus::Resolved;
        let resolver = KeywordIntentResolver::new();
        assert_eq!(
            resolver.resolve("reopen ticket 5", &[ticket]),
            Intent::ReopenTicket { ticket_id: 5 }
        );
    }
}
