//! Shared test harness for E2E integration tests.
//!
//! Wires a file-backed ticket store, the sample runbook retriever, a
//! capturing audit log and a scripted reasoner into a real `Orchestrator`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use io_agent::{
    AuditLog, Orchestrator, Reasoner, ReasonerError, ReasonerRequest, ToolHook, TurnOutcome,
};
use io_ops_tools::MockRetriever;
use io_protocol::Conversation;
use io_tickets::MockTicketStore;

// ── Scripted reasoner ─────────────────────────────────────────

/// Replays a fixed list of tool calls through the hook, then answers.
/// A hook error ends the run, as it would for a real model loop.
pub struct ScriptedReasoner {
    calls: Vec<(String, serde_json::Value)>,
    answer: String,
    requests: Mutex<Vec<ReasonerRequest>>,
    observations: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn answering(answer: &str) -> Self {
        Self {
            calls: Vec::new(),
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
            observations: Mutex::new(Vec::new()),
        }
    }

    pub fn then_call(mut self, tool: &str, args: serde_json::Value) -> Self {
        self.calls.push((tool.to_string(), args));
        self
    }

    /// Requests received, one per run.
    pub fn requests(&self) -> Vec<ReasonerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Tool outputs the hook handed back.
    pub fn observations(&self) -> Vec<String> {
        self.observations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn run(
        &self,
        request: &ReasonerRequest,
        hook: &dyn ToolHook,
    ) -> Result<String, ReasonerError> {
        self.requests.lock().unwrap().push(request.clone());
        for (tool, args) in &self.calls {
            let observation = hook.call_tool(tool, args.clone()).await?;
            self.observations.lock().unwrap().push(observation);
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct TestHarness {
    /// Holds the ticket file and audit log.
    pub dir: TempDir,
    pub store: MockTicketStore,
    pub retriever: MockRetriever,
    pub audit: AuditLog,
    pub reasoner: ScriptedReasoner,
}

impl TestHarness {
    /// Reasoner answers a fixed sentence without calling tools.
    pub fn new() -> Self {
        Self::with_reasoner(ScriptedReasoner::answering("No further action needed."))
    }

    pub fn with_reasoner(reasoner: ScriptedReasoner) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = MockTicketStore::open(dir.path().join("tickets.json"));
        let audit = AuditLog::with_file(dir.path().join("logs/ops.jsonl")).capturing();
        Self {
            dir,
            store,
            retriever: MockRetriever::with_runbook_sample(),
            audit,
            reasoner,
        }
    }

    pub fn tickets_path(&self) -> PathBuf {
        self.dir.path().join("tickets.json")
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.path().join("logs/ops.jsonl")
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(&self.store, &self.retriever, &self.audit).with_reasoner(&self.reasoner)
    }

    /// One turn with no history.
    pub async fn turn(&self, text: &str) -> TurnOutcome {
        self.orchestrator().handle_turn(text, &Conversation::new()).await
    }

    /// Raw ticket file contents, `None` before the first write.
    pub fn ticket_file(&self) -> Option<Vec<u8>> {
        std::fs::read(self.tickets_path()).ok()
    }

    /// Parsed audit file lines.
    pub fn audit_lines(&self) -> Vec<serde_json::Value> {
        std::fs::read_to_string(self.audit_path())
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}
