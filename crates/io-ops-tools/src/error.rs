//! Tool and retriever error types.

use thiserror::Error;

use io_tickets::TicketError;

/// Errors from the knowledge retriever collaborator.
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("corpus directory not found: {0}")]
    CorpusNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while executing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("missing '{0}' argument")]
    MissingArgument(String),

    #[error("invalid '{name}' argument: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("ticket store: {0}")]
    Ticket(#[from] TicketError),

    #[error("retriever: {0}")]
    Retriever(#[from] RetrieverError),
}

/// Convenience alias for tool results.
pub type ToolResult<T> = Result<T, ToolError>;
