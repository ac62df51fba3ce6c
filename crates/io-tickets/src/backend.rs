//! Ticket backend capability.

use crate::error::TicketResult;

/// Operations every ticket backend provides.
///
/// Return values are user-facing response strings. Writes return `Err` only
/// when the change could not be made durable; in that case nothing changed.
pub trait TicketBackend: Send + Sync {
    /// Create a ticket. Without `confirm` nothing is written and a
    /// confirmation request naming `title` and `severity` is returned.
    fn create_ticket(
        &self,
        title: &str,
        description: &str,
        severity: &str,
        confirm: bool,
    ) -> TicketResult<String>;

    /// Multi-line dump of the ticket, or a not-found error string.
    fn get_ticket_status(&self, ticket_id: &str) -> String;

    /// Validate status, then existence, then confirmation, then write.
    fn update_ticket_status(
        &self,
        ticket_id: &str,
        new_status: &str,
        confirm: bool,
    ) -> TicketResult<String>;

    /// Drop every ticket and restart numbering at 1. Demo/test setup only.
    fn reset_store(&self) -> TicketResult<()>;
}
