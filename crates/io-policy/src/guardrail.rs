//! Two-sided text guardrail.
//!
//! `admit_input` runs on the raw request before anything else sees it;
//! `admit_output` runs on every candidate answer. Matching is literal
//! phrase containment over normalized text. Rejections are logged with the
//! matched phrase and never retried.

use crate::normalize::normalize;
use crate::patterns::{PatternTables, PhraseSet};

/// Answer substituted for a rejected output.
pub const OUTPUT_REFUSAL: &str = "I cannot provide that information due to a guardrail policy.";

/// Answer returned for a rejected input.
pub const INPUT_REFUSAL: &str =
    "Your request was blocked by the input guardrail. Please refine your query.";

/// Which table caused a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    BlockedKeyword,
    OutOfScope,
    PersonalData,
    SecretSeekingRequest,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockedKeyword => "blocked_keyword",
            Self::OutOfScope => "out_of_scope",
            Self::PersonalData => "personal_data",
            Self::SecretSeekingRequest => "secret_seeking_request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Admit,
    Reject {
        reason: RejectReason,
        /// Phrase as it appears in the pattern table.
        matched: String,
    },
}

impl GuardrailVerdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }

    pub fn matched(&self) -> Option<&str> {
        match self {
            Self::Admit => None,
            Self::Reject { matched, .. } => Some(matched),
        }
    }

    fn reject(reason: RejectReason, matched: &str) -> Self {
        Self::Reject {
            reason,
            matched: matched.to_string(),
        }
    }
}

/// Stateless admission checks over request and answer text.
#[derive(Debug, Clone)]
pub struct GuardrailFilter {
    blocked: PhraseSet,
    out_of_scope: PhraseSet,
    pii: PhraseSet,
    secret_seeking: PhraseSet,
}

impl Default for GuardrailFilter {
    fn default() -> Self {
        Self::new(&PatternTables::default())
    }
}

impl GuardrailFilter {
    pub fn new(tables: &PatternTables) -> Self {
        Self {
            blocked: PhraseSet::new(&tables.blocked_keywords),
            out_of_scope: PhraseSet::new(&tables.out_of_scope_hints),
            pii: PhraseSet::new(&tables.pii_markers),
            secret_seeking: PhraseSet::new(&tables.secret_seeking),
        }
    }

    pub fn admit_input(&self, text: &str) -> bool {
        self.check_input(text).is_admitted()
    }

    pub fn admit_output(&self, text: &str, originating_user_text: &str) -> bool {
        self.check_output(text, originating_user_text).is_admitted()
    }

    /// Blocked keywords first, then out-of-scope hints.
    pub fn check_input(&self, text: &str) -> GuardrailVerdict {
        let norm = normalize(text);

        if let Some(phrase) = self.blocked.find(&norm) {
            tracing::warn!(matched = %phrase, "input guardrail: blocked keyword");
            return GuardrailVerdict::reject(RejectReason::BlockedKeyword, phrase);
        }
        if let Some(phrase) = self.out_of_scope.find(&norm) {
            tracing::warn!(matched = %phrase, "input guardrail: out-of-scope request");
            return GuardrailVerdict::reject(RejectReason::OutOfScope, phrase);
        }
        GuardrailVerdict::Admit
    }

    /// Personal data in the answer, then a secret-seeking original request.
    pub fn check_output(&self, text: &str, originating_user_text: &str) -> GuardrailVerdict {
        if let Some(phrase) = self.pii.find(&normalize(text)) {
            tracing::warn!(matched = %phrase, "output guardrail: personal data in answer");
            return GuardrailVerdict::reject(RejectReason::PersonalData, phrase);
        }
        if let Some(phrase) = self.secret_seeking.find(&normalize(originating_user_text)) {
            tracing::warn!(matched = %phrase, "output guardrail: request sought secrets");
            return GuardrailVerdict::reject(RejectReason::SecretSeekingRequest, phrase);
        }
        GuardrailVerdict::Admit
    }
}
