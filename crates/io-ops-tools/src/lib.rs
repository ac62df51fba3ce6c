//! Operation implementations behind the policy gate.
//!
//! Provides the restricted arithmetic evaluator, the `KnowledgeRetriever`
//! abstraction with a file-corpus implementation, and the five allowlisted
//! tools: retrieve_incident_info, calculate, create_ticket,
//! get_ticket_status, update_ticket_status.

pub mod calculator;
pub mod error;
pub mod mock;
pub mod retriever;
pub mod tools;
pub mod types;

pub use calculator::{EvalError, evaluate};
pub use error::{RetrieverError, ToolError, ToolResult};
pub use mock::MockRetriever;
pub use retriever::{CorpusRetriever, KnowledgeRetriever, Passage, Retrieval, extract_sources};
pub use types::{OpsTool, ToolContext};
