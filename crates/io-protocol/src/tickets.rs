use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every ticket identifier.
pub const TICKET_ID_PREFIX: &str = "INC-";

/// Severity used when the caller does not provide one.
pub const DEFAULT_SEVERITY: &str = "Medium";

/// Lifecycle status of a ticket.
///
/// Any status may move to any other; the only constraint is that the
/// target is one of these five values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
        TicketStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
            TicketStatus::OnHold => "On Hold",
        }
    }

    /// Parse a display name. Case-sensitive, exact match.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// `"Open, In Progress, Resolved, Closed, On Hold"`.
    pub fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(TicketStatus::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mock incident ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: TicketStatus,
}

impl Ticket {
    /// A freshly created ticket is always Open.
    pub fn open(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: severity.into(),
            status: TicketStatus::Open,
        }
    }
}

/// Format the identifier for sequence number `n`.
pub fn ticket_id(n: u64) -> String {
    format!("{TICKET_ID_PREFIX}{n}")
}

/// Numeric suffix of an `INC-<n>` identifier.
pub fn ticket_number(id: &str) -> Option<u64> {
    id.strip_prefix(TICKET_ID_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_exact() {
        assert_eq!(TicketStatus::parse("In Progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("Resolved"), Some(TicketStatus::Resolved));
        assert_eq!(TicketStatus::parse("resolved"), None);
        assert_eq!(TicketStatus::parse("NotAStatus"), None);
    }

    #[test]
    fn status_serializes_display_name() {
        let json = serde_json::to_string(&TicketStatus::OnHold).unwrap();
        assert_eq!(json, r#""On Hold""#);
        let back: TicketStatus = serde_json::from_str(r#""In Progress""#).unwrap();
        assert_eq!(back, TicketStatus::InProgress);
    }

    #[test]
    fn valid_list_matches_enumeration_order() {
        assert_eq!(
            TicketStatus::valid_list(),
            "Open, In Progress, Resolved, Closed, On Hold"
        );
    }

    #[test]
    fn id_helpers() {
        assert_eq!(ticket_id(7), "INC-7");
        assert_eq!(ticket_number("INC-42"), Some(42));
        assert_eq!(ticket_number("inc-42"), None);
        assert_eq!(ticket_number("INC-x"), None);
    }

    #[test]
    fn new_ticket_is_open() {
        let t = Ticket::open("Web down", "503s", DEFAULT_SEVERITY);
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.severity, "Medium");
    }
}
