use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of operations the gateway will ever execute.
///
/// Anything outside this enum is refused by the policy gate before it
/// reaches a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Look up runbook / incident reference text.
    RetrieveIncidentInfo,
    /// Restricted arithmetic.
    Calculate,
    /// Open a new ticket (mutating).
    CreateTicket,
    /// Read a ticket's fields.
    GetTicketStatus,
    /// Move a ticket to another status (mutating).
    UpdateTicketStatus,
}

impl Operation {
    /// Every allowlisted operation, in registry order.
    pub const ALL: [Operation; 5] = [
        Operation::RetrieveIncidentInfo,
        Operation::Calculate,
        Operation::CreateTicket,
        Operation::GetTicketStatus,
        Operation::UpdateTicketStatus,
    ];

    /// Wire name used by tools, the reasoner and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::RetrieveIncidentInfo => "retrieve_incident_info",
            Operation::Calculate => "calculate",
            Operation::CreateTicket => "create_ticket",
            Operation::GetTicketStatus => "get_ticket_status",
            Operation::UpdateTicketStatus => "update_ticket_status",
        }
    }

    /// Resolve a wire name. Exact match only.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Whether the operation changes persisted ticket state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::CreateTicket | Operation::UpdateTicketStatus
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested operation together with the text that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCall {
    /// Requested operation name (not yet validated against the allowlist).
    pub name: String,
    /// Opaque structured arguments.
    #[serde(default)]
    pub arguments: serde_json::Value,
    /// The user request this call is being made on behalf of.
    pub originating_user_text: String,
}

impl OperationCall {
    pub fn new(
        name: impl Into<String>,
        arguments: serde_json::Value,
        originating_user_text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            originating_user_text: originating_user_text.into(),
        }
    }

    /// Serialized argument text as seen by the policy gate.
    ///
    /// A bare JSON string is passed through unquoted so an expression such
    /// as `2 + 2` is inspected as typed.
    pub fn arguments_text(&self) -> String {
        match &self.arguments {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
