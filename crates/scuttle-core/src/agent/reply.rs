//! Response text builders
//!
//! Natural-language summaries of what the agent did, plus the structured
//! ticket-summary block surfaced by status queries. Deterministic on
//! purpose: the reply is part of the audit trail.

use std::fmt::Write as _;

use crate::tickets::Ticket;

use super::actions::ActionDetails;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Confirmation for a completed action
pub fn action_response(details: &ActionDetails) -> String {
    match details {
        ActionDetails::Created { ticket_id, category, assigned_team, status, eta, .. } => {
            format!(
                "Ticket #{ticket_id} created successfully! Category: {category}, \
                 assigned to {assigned_team}, status: {status}. \
                 Expected resolution by {}.",
                eta.format(TIME_FORMAT)
            )
        }
        ActionDetails::Recategorized {
            ticket_id,
            old_category,
            new_category,
            new_team,
            new_eta,
            ..
        } => {
            format!(
                "Ticket #{ticket_id} category updated from {old_category} to {new_category}. \
                 Team reassigned to {new_team} and status reset to pending. \
                 New expected resolution: {}.",
                new_eta.format(TIME_FORMAT)
            )
        }
        ActionDetails::Reopened { ticket_id, old_status, .. } => {
            format!(
                "Ticket #{ticket_id} has been reopened (was {old_status}) and is now pending review."
            )
        }
    }
}

/// Structured summary block for one or more tickets
pub fn ticket_summary_block(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No pending tickets found.".to_string();
    }

    let mut out = String::new();
    for ticket in tickets {
        let mut message = ticket.message.chars().take(200).collect::<String>();
        if ticket.message.chars().count() > 200 {
            message.push_str("...");
        }
        let _ = writeln!(out, "Ticket #{}:", ticket.id);
        let _ = writeln!(out, "  - Category: {}", ticket.category);
        let _ = writeln!(out, "  - Status: {}", ticket.status);
        let _ = writeln!(out, "  - Assigned Team: {}", ticket.assigned_team);
        let _ = writeln!(out, "  - Message: {}", message);
        let _ = writeln!(out, "  - Created: {}", ticket.created_at.format(TIME_FORMAT));
        let _ = writeln!(
            out,
            "  - Expected Resolution: {}",
            ticket.expected_resolution.format(TIME_FORMAT)
        );
    }
    out.trim_end().to_string()
}

/// Response for a status query
pub fn status_response(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "You have no pending tickets right now. If something needs attention, \
                just describe the problem and I'll open a ticket for you."
            .to_string();
    }

    let plural = if tickets.len() == 1 { "" } else { "s" };
    format!(
        "Here's where your {count} ticket{plural} stand{verb}:\n\n{block}",
        count = tickets.len(),
        plural = plural,
        verb = if tickets.len() == 1 { "s" } else { "" },
        block = ticket_summary_block(tickets)
    )
}

/// Deterministic reply when no actionable intent was recognized
pub fn general_chat_response(pending: &[Ticket]) -> String {
    let capabilities = "I can create a support ticket, check ticket status, \
                        change a ticket's category, or reopen a resolved ticket.";
    if pending.is_empty() {
        format!("{capabilities} You have no pending tickets at the moment.")
    } else {
        format!(
            "{capabilities} You currently have {} pending ticket{}; ask for \"status\" to see the details.",
            pending.len(),
            if pending.len() == 1 { "" } else { "s" }
        )
    }
}
