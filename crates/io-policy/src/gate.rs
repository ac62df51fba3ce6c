//! Tool-invocation policy gate.
//!
//! Every operation call passes through `PolicyGate::evaluate` before it
//! runs, whichever path produced it. Checks run in a fixed order and the
//! first failing one decides:
//!
//! 1. the name must be on the operation allowlist
//! 2. request and arguments must not mention secrets or prompts
//! 3. a mutating call needs an explicit intent phrase in the request
//! 4. a mutating call needs a literal `confirm: true` in its arguments

use std::sync::LazyLock;

use regex::Regex;

use io_protocol::{Operation, OperationCall, PolicyDecision, PolicyRefusal, RefusalCode};

use crate::normalize::normalize;
use crate::patterns::{PatternTables, PhraseSet};

const EXFILTRATION_MESSAGE: &str = "Request appears to target prompts, secrets, or credentials.";
const INTENT_MESSAGE: &str = "Mutation tool call blocked because user intent is not explicit.";
const CONFIRM_MESSAGE: &str = "Mutation tool call requires confirm=True.";

/// `"confirm": true`, `'confirm':true`, `confirm=true`, `confirm = true`, any case.
static RE_CONFIRM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?\bconfirm\b["']?\s*[:=]\s*true\b"#).unwrap()
});

#[derive(Debug, Clone)]
pub struct PolicyGate {
    exfiltration: PhraseSet,
    create_intent: PhraseSet,
    update_intent: PhraseSet,
}

impl Default for PolicyGate {
    fn default() -> Self {
        Self::new(&PatternTables::default())
    }
}

impl PolicyGate {
    pub fn new(tables: &PatternTables) -> Self {
        Self {
            exfiltration: PhraseSet::new(&tables.exfiltration),
            create_intent: PhraseSet::new(&tables.create_intent),
            update_intent: PhraseSet::new(&tables.update_intent),
        }
    }

    /// Decide whether `operation` may run with `arguments_text` on behalf of
    /// `user_text`.
    pub fn evaluate(&self, operation: &str, arguments_text: &str, user_text: &str) -> PolicyDecision {
        let Some(op) = Operation::from_name(operation) else {
            return deny(
                RefusalCode::ToolNotAllowed,
                format!("Tool '{operation}' is not in the allowlist."),
                operation,
            );
        };

        let inspected = normalize(&format!("{user_text}\n{arguments_text}"));
        if self.exfiltration.matches(&inspected) {
            return deny(RefusalCode::ExfiltrationAttempt, EXFILTRATION_MESSAGE, operation);
        }

        if op.is_mutating() {
            let intent = match op {
                Operation::CreateTicket => &self.create_intent,
                _ => &self.update_intent,
            };
            if !intent.matches(&normalize(user_text)) {
                return deny(RefusalCode::MutationIntentUnclear, INTENT_MESSAGE, operation);
            }
            if !self.has_confirm_flag(arguments_text) {
                return deny(RefusalCode::ConfirmationRequired, CONFIRM_MESSAGE, operation);
            }
        }

        PolicyDecision::Allow
    }

    /// `evaluate` as a `Result`.
    pub fn authorize(
        &self,
        operation: &str,
        arguments_text: &str,
        user_text: &str,
    ) -> Result<(), PolicyRefusal> {
        self.evaluate(operation, arguments_text, user_text).into_result()
    }

    pub fn authorize_call(&self, call: &OperationCall) -> Result<(), PolicyRefusal> {
        self.authorize(&call.name, &call.arguments_text(), &call.originating_user_text)
    }

    pub fn has_confirm_flag(&self, text: &str) -> bool {
        has_confirm_flag(text)
    }
}

/// Whether `text` carries a literal true-valued confirm flag.
///
/// The match runs over the raw argument text, not a parsed `confirm` key,
/// so a flag anywhere in it counts, including one embedded in a string
/// value such as a ticket title. Mutations still need explicit intent in
/// the user's own words.
pub fn has_confirm_flag(text: &str) -> bool {
    RE_CONFIRM.is_match(text)
}

fn deny(code: RefusalCode, message: impl Into<String>, tool: &str) -> PolicyDecision {
    PolicyDecision::Deny(PolicyRefusal::new(code, message, tool))
}
