//! Audit events emitted for every significant action in a turn.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Which check produced a guardrail block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailStage {
    Input,
    Output,
}

/// Event body, tagged by `event` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// An authorized tool is about to run.
    ToolStart { tool: String, input: String },

    /// A tool finished.
    ToolEnd { tool: String, output: String },

    /// Guardrail rejected the request or the candidate answer.
    GuardrailBlocked {
        stage: GuardrailStage,
        #[serde(skip_serializing_if = "Option::is_none")]
        matched: Option<String>,
    },

    /// The deterministic router claimed the request.
    RouteSelected { route: String, tool: String },

    /// The policy gate refused a call.
    PolicyBlocked { code: String, tool: String },

    /// Final answer returned to the user.
    AgentResponse { origin: String, answer: String },

    /// A collaborator failed; the turn ended with an error answer.
    AgentError { error: String },

    /// Scripted demo started.
    DemoSetup { reset_store: bool, queries: usize },
}

impl AuditEvent {
    /// Wire tag of this event.
    pub fn tag(&self) -> &'static str {
        match self {
            AuditEvent::ToolStart { .. } => "tool_start",
            AuditEvent::ToolEnd { .. } => "tool_end",
            AuditEvent::GuardrailBlocked { .. } => "guardrail_blocked",
            AuditEvent::RouteSelected { .. } => "route_selected",
            AuditEvent::PolicyBlocked { .. } => "policy_blocked",
            AuditEvent::AgentResponse { .. } => "agent_response",
            AuditEvent::AgentError { .. } => "agent_error",
            AuditEvent::DemoSetup { .. } => "demo_setup",
        }
    }
}

/// A timestamped audit record: `{"ts": ..., "event": ..., ...fields}`.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    /// Groups records belonging to one user turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn now(event: AuditEvent, request_id: Option<Uuid>) -> Self {
        Self {
            ts: Utc::now(),
            request_id,
            event,
        }
    }
}
