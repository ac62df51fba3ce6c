use serde::{Deserialize, Serialize};

/// Closed set of reasons the policy gate can refuse an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalCode {
    ToolNotAllowed,
    ExfiltrationAttempt,
    MutationIntentUnclear,
    ConfirmationRequired,
}

impl RefusalCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalCode::ToolNotAllowed => "TOOL_NOT_ALLOWED",
            RefusalCode::ExfiltrationAttempt => "EXFILTRATION_ATTEMPT",
            RefusalCode::MutationIntentUnclear => "MUTATION_INTENT_UNCLEAR",
            RefusalCode::ConfirmationRequired => "CONFIRMATION_REQUIRED",
        }
    }
}

/// A refused operation. The JSON payload is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message} (tool: {tool})")]
pub struct PolicyRefusal {
    pub code: RefusalCode,
    pub message: String,
    pub tool: String,
}

/// Wire shape of a refusal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefusalPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: RefusalCode,
    pub message: String,
    pub tool: String,
    pub action: String,
}

impl PolicyRefusal {
    pub fn new(code: RefusalCode, message: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            tool: tool.into(),
        }
    }

    pub fn payload(&self) -> RefusalPayload {
        RefusalPayload {
            kind: "policy_refusal".into(),
            code: self.code,
            message: self.message.clone(),
            tool: self.tool.clone(),
            action: "blocked".into(),
        }
    }

    /// Serialized payload, the user-facing answer for a refused call.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.payload()).unwrap_or_else(|_| {
            format!(
                r#"{{"type":"policy_refusal","code":"{}","action":"blocked"}}"#,
                self.code.as_str()
            )
        })
    }
}

/// Outcome of a single authorization check. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(PolicyRefusal),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    pub fn into_result(self) -> Result<(), PolicyRefusal> {
        match self {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny(refusal) => Err(refusal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_payload_shape() {
        let refusal = PolicyRefusal::new(
            RefusalCode::ConfirmationRequired,
            "Mutation tool call requires confirm=True.",
            "create_ticket",
        );
        let value: serde_json::Value = serde_json::from_str(&refusal.to_json()).unwrap();
        assert_eq!(value["type"], "policy_refusal");
        assert_eq!(value["code"], "CONFIRMATION_REQUIRED");
        assert_eq!(value["tool"], "create_ticket");
        assert_eq!(value["action"], "blocked");
        assert_eq!(value["message"], "Mutation tool call requires confirm=True.");
    }

    #[test]
    fn code_serialization_matches_as_str() {
        for code in [
            RefusalCode::ToolNotAllowed,
            RefusalCode::ExfiltrationAttempt,
            RefusalCode::MutationIntentUnclear,
            RefusalCode::ConfirmationRequired,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn decision_into_result() {
        assert!(PolicyDecision::Allow.into_result().is_ok());
        let deny = PolicyDecision::Deny(PolicyRefusal::new(
            RefusalCode::ToolNotAllowed,
            "nope",
            "rm",
        ));
        assert!(!deny.is_allowed());
        assert_eq!(deny.into_result().unwrap_err().code, RefusalCode::ToolNotAllowed);
    }
}
