//! Language-model reasoner used when no deterministic route matches.
//!
//! The reasoner never executes tools itself. Every tool call it wants is
//! handed to a `ToolHook`, which authorizes it through the policy gate and
//! either returns the tool output or aborts the run with a refusal.

pub mod ollama;

use async_trait::async_trait;
use serde::Serialize;

use io_ops_tools::ToolError;
use io_protocol::PolicyRefusal;

pub use ollama::{OllamaConfig, OllamaReasoner};

/// Tool description offered to the reasoner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Everything the reasoner sees for one turn.
#[derive(Debug, Clone)]
pub struct ReasonerRequest {
    /// Current user request.
    pub input: String,
    /// Earlier turns as `Human: ...` / `AI: ...` lines.
    pub history: Vec<String>,
    /// Allowlisted tools.
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    /// The policy gate refused a requested tool call. Ends the turn.
    #[error("{0}")]
    Refused(#[from] PolicyRefusal),

    #[error("tool failed: {0}")]
    Tool(#[from] ToolError),

    #[error("reasoner unavailable: {0}")]
    Unavailable(String),

    #[error("invalid reasoner response: {0}")]
    InvalidResponse(String),

    #[error("reasoner stopped after {0} iterations without a final answer")]
    IterationLimit(usize),
}

/// Interception point for every tool call a reasoner makes.
#[async_trait]
pub trait ToolHook: Send + Sync {
    /// Authorize and run `name` with `args`; the `Ok` value is the
    /// observation handed back to the model.
    async fn call_tool(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<String, ReasonerError>;
}

/// A black-box reasoner: tools and history in, final answer out.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn run(
        &self,
        request: &ReasonerRequest,
        hook: &dyn ToolHook,
    ) -> Result<String, ReasonerError>;

    /// Name for logs.
    fn name(&self) -> &str;
}
