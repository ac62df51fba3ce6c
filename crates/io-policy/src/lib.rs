//! Policy layer for the incident ops gateway.
//!
//! `GuardrailFilter` admits or rejects raw request and answer text;
//! `PolicyGate` authorizes each operation call before it executes. Both
//! match phrases from `PatternTables` against normalized text, so casing
//! and accents do not matter.

pub mod gate;
pub mod guardrail;
pub mod normalize;
pub mod patterns;

pub use gate::{PolicyGate, has_confirm_flag};
pub use guardrail::{GuardrailFilter, GuardrailVerdict, INPUT_REFUSAL, OUTPUT_REFUSAL, RejectReason};
pub use normalize::normalize;
pub use patterns::{PatternError, PatternTables, PhraseSet};
