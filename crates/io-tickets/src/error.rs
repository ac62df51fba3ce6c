//! Ticket store error types.

use thiserror::Error;

/// Failures of the backing storage. Domain outcomes (not found, invalid
/// status, confirmation pending) are plain response strings, not errors.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to serialize ticket store: {0}")]
    Serialize(String),

    #[error("ticket id counter exhausted")]
    IdsExhausted,
}

/// Convenience alias for ticket store results.
pub type TicketResult<T> = Result<T, TicketError>;
