//! Incident ops agent library.
//!
//! The binary in `main.rs` is a thin wrapper over `cli`; everything else is
//! exposed so integration tests can drive a turn end to end.

pub mod audit;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod reasoner;
pub mod registry;
pub mod router;

pub use audit::AuditLog;
pub use config::AgentConfig;
pub use orchestrator::{AnswerOrigin, Orchestrator, TurnOutcome};
pub use reasoner::{Reasoner, ReasonerError, ReasonerRequest, ToolHook, ToolSpec};
pub use registry::ToolRegistry;
pub use router::{DeterministicRouter, Route, RouteKind};
