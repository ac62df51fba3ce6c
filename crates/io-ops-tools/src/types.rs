//! The OpsTool trait and its execution context.

use async_trait::async_trait;
use serde_json::Value;

use io_protocol::Operation;
use io_tickets::TicketBackend;

use crate::error::{ToolError, ToolResult};
use crate::retriever::KnowledgeRetriever;

/// Default number of passages fetched by `retrieve_incident_info`.
pub const DEFAULT_TOP_K: usize = 4;

/// Collaborators a tool may touch while executing.
pub struct ToolContext<'a> {
    pub tickets: &'a dyn TicketBackend,
    pub retriever: &'a dyn KnowledgeRetriever,
    /// Passages requested per retrieval.
    pub top_k: usize,
}

impl<'a> ToolContext<'a> {
    pub fn new(tickets: &'a dyn TicketBackend, retriever: &'a dyn KnowledgeRetriever) -> Self {
        Self {
            tickets,
            retriever,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

/// An allowlisted operation implementation.
///
/// Tools never authorize themselves; callers run the policy gate first and
/// only then call `execute`. The result is the user-facing response text.
#[async_trait]
pub trait OpsTool: Send + Sync {
    /// The allowlisted operation this tool implements.
    fn operation(&self) -> Operation;

    /// Wire name (e.g., "create_ticket").
    fn name(&self) -> &'static str {
        self.operation().as_str()
    }

    /// Human-readable description shown to the reasoner.
    fn description(&self) -> &str;

    /// JSON Schema describing accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute with JSON arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext<'_>) -> ToolResult<String>;
}

// ── Argument helpers ──────────────────────────────────────────

/// Required string field, or the bare string when `args` is itself a string
/// and `name` is the tool's primary argument.
pub(crate) fn primary_str(args: &Value, name: &str) -> ToolResult<String> {
    match args {
        Value::String(s) => Ok(s.clone()),
        _ => required_str(args, name),
    }
}

pub(crate) fn required_str(args: &Value, name: &str) -> ToolResult<String> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(ToolError::MissingArgument(name.into())),
        Some(other) => Err(ToolError::InvalidArgument {
            name: name.into(),
            message: format!("expected a string, got {other}"),
        }),
    }
}

pub(crate) fn optional_str(args: &Value, name: &str) -> Option<String> {
    args.get(name).and_then(Value::as_str).map(String::from)
}

/// `confirm` accepts JSON `true` or the string "true" (any case). Anything
/// else, including absence, is false.
pub(crate) fn confirm_flag(args: &Value) -> bool {
    match args.get("confirm") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
