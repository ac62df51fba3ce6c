//! Deterministic router: pattern matching for unambiguous requests.
//!
//! Claims requests that map to exactly one operation with arguments that
//! can be read straight off the text, so they never reach the reasoner.
//! The router only recognizes; the orchestrator still runs every routed
//! call through the policy gate.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use io_policy::{PatternTables, PhraseSet, has_confirm_flag, normalize};
use io_protocol::tickets::DEFAULT_SEVERITY;
use io_protocol::{Operation, OperationCall};

/// `calculate <expr>` / `beräkna <expr>` / `räkna ut <expr>`, matched on
/// normalized text.
static RE_CALCULATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:calculate|berakna|rakna ut)\b\s*:?\s*(.+)$").unwrap()
});

static RE_TICKET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bINC-\d+\b").unwrap());

static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:title|titel)\s*:\s*"([^"]*)""#).unwrap());

static RE_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:description|beskrivning)\s*:\s*"([^"]*)""#).unwrap()
});

static RE_SEVERITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:severity|allvarlighetsgrad)\s*:\s*"([^"]*)""#).unwrap()
});

/// Words that mark a ticket lookup ("ticket", Swedish "ärende").
const TICKET_WORDS: &[&str] = &["ticket", "arende"];

/// Which pattern claimed the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Calculation,
    TicketCreation,
    TicketStatus,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calculation => "calculation",
            Self::TicketCreation => "ticket_creation",
            Self::TicketStatus => "ticket_status",
        }
    }
}

/// A recognized request: the route and the call it implies.
#[derive(Debug, Clone)]
pub struct Route {
    pub kind: RouteKind,
    pub call: OperationCall,
}

pub struct DeterministicRouter {
    create_intent: PhraseSet,
}

impl Default for DeterministicRouter {
    fn default() -> Self {
        Self::new(&PatternTables::default())
    }
}

impl DeterministicRouter {
    pub fn new(tables: &PatternTables) -> Self {
        Self {
            create_intent: PhraseSet::new(&tables.create_intent),
        }
    }

    /// Recognize `text`, or `None` to defer to the reasoner.
    pub fn try_route(&self, text: &str) -> Option<Route> {
        let norm = normalize(text);

        if let Some(expression) = calculation(&norm) {
            return Some(route(RouteKind::Calculation, Operation::Calculate, Value::String(expression), text));
        }

        if self.create_intent.matches(&norm)
            && let Some(args) = creation_args(text)
        {
            return Some(route(RouteKind::TicketCreation, Operation::CreateTicket, args, text));
        }

        if let Some(ticket_id) = status_query(text, &norm) {
            return Some(route(
                RouteKind::TicketStatus,
                Operation::GetTicketStatus,
                json!({ "ticket_id": ticket_id }),
                text,
            ));
        }

        None
    }
}

fn route(kind: RouteKind, op: Operation, arguments: Value, text: &str) -> Route {
    Route {
        kind,
        call: OperationCall::new(op.as_str(), arguments, text),
    }
}

fn calculation(norm: &str) -> Option<String> {
    let caps = RE_CALCULATE.captures(norm)?;
    let expression = caps.get(1)?.as_str().trim();
    (!expression.is_empty()).then(|| expression.to_string())
}

/// Title and description are required; captured from the original text so
/// casing and accents survive.
fn creation_args(text: &str) -> Option<Value> {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };
    let title = capture(&RE_TITLE)?;
    let description = capture(&RE_DESCRIPTION)?;
    let severity = capture(&RE_SEVERITY)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SEVERITY.to_string());

    Some(json!({
        "title": title,
        "description": description,
        "severity": severity,
        "confirm": has_confirm_flag(text),
    }))
}

fn status_query(text: &str, norm: &str) -> Option<String> {
    let id = RE_TICKET_ID.find(text)?;
    let mentions_ticket = TICKET_WORDS.iter().any(|w| norm.contains(w));
    (norm.contains("status") && mentions_ticket).then(|| id.as_str().to_uppercase())
}
