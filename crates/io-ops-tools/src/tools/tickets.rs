//! Ticket tools: create_ticket, get_ticket_status, update_ticket_status.
//!
//! All three delegate to the `TicketBackend` in the context. The backend
//! enforces its own confirmation step, so an unconfirmed write comes back
//! as a confirmation request rather than an error.

use async_trait::async_trait;
use serde_json::{Value, json};

use io_protocol::Operation;
use io_protocol::tickets::{DEFAULT_SEVERITY, TicketStatus};

use crate::error::ToolResult;
use crate::types::{OpsTool, ToolContext, confirm_flag, optional_str, primary_str, required_str};

// ── create_ticket ─────────────────────────────────────────────

pub struct CreateTicket;

#[async_trait]
impl OpsTool for CreateTicket {
    fn operation(&self) -> Operation {
        Operation::CreateTicket
    }

    fn description(&self) -> &str {
        "Open a new incident ticket. Requires explicit user intent and confirm=true"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "description": { "type": "string" },
                "severity": {
                    "type": "string",
                    "description": "Free text, e.g. Low, Medium, High, Critical",
                    "default": DEFAULT_SEVERITY
                },
                "confirm": {
                    "type": "boolean",
                    "description": "Must be true to actually create the ticket",
                    "default": false
                }
            },
            "required": ["title", "description"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext<'_>) -> ToolResult<String> {
        let title = required_str(&args, "title")?;
        let description = required_str(&args, "description")?;
        let severity = optional_str(&args, "severity").unwrap_or_else(|| DEFAULT_SEVERITY.into());
        let confirm = confirm_flag(&args);
        Ok(ctx
            .tickets
            .create_ticket(&title, &description, &severity, confirm)?)
    }
}

// ── get_ticket_status ─────────────────────────────────────────

pub struct GetTicketStatus;

#[async_trait]
impl OpsTool for GetTicketStatus {
    fn operation(&self) -> Operation {
        Operation::GetTicketStatus
    }

    fn description(&self) -> &str {
        "Show title, description, severity and status of a ticket"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticket_id": {
                    "type": "string",
                    "description": "Ticket id such as INC-1"
                }
            },
            "required": ["ticket_id"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext<'_>) -> ToolResult<String> {
        let ticket_id = primary_str(&args, "ticket_id")?;
        Ok(ctx.tickets.get_ticket_status(ticket_id.trim()))
    }
}

// ── update_ticket_status ──────────────────────────────────────

pub struct UpdateTicketStatus;

#[async_trait]
impl OpsTool for UpdateTicketStatus {
    fn operation(&self) -> Operation {
        Operation::UpdateTicketStatus
    }

    fn description(&self) -> &str {
        "Move a ticket to another status. Requires explicit user intent and confirm=true"
    }

    fn parameters_schema(&self) -> Value {
        let statuses: Vec<&str> = TicketStatus::ALL.iter().map(|s| s.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "ticket_id": { "type": "string" },
                "new_status": { "type": "string", "enum": statuses },
                "confirm": {
                    "type": "boolean",
                    "description": "Must be true to actually change the status",
                    "default": false
                }
            },
            "required": ["ticket_id", "new_status"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext<'_>) -> ToolResult<String> {
        let ticket_id = required_str(&args, "ticket_id")?;
        let new_status = required_str(&args, "new_status")?;
        let confirm = confirm_flag(&args);
        Ok(ctx
            .tickets
            .update_ticket_status(ticket_id.trim(), &new_status, confirm)?)
    }
}
