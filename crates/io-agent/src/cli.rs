//! `incident-ops` command line: chat, demo and status.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;

use io_ops_tools::CorpusRetriever;
use io_policy::PatternTables;
use io_protocol::{AuditEvent, AuditRecord, Conversation};
use io_tickets::{MockTicketStore, TicketBackend};

use crate::audit::AuditLog;
use crate::config::AgentConfig;
use crate::orchestrator::{AnswerOrigin, Orchestrator, TurnOutcome};
use crate::reasoner::{OllamaReasoner, Reasoner};

/// Requests replayed by `demo`, in order.
pub const DEMO_QUERIES: &[&str] = &[
    "What is the runbook for web CPU spikes?",
    "Calculate (10 + 20 + 30) / 3",
    r#"Create a new ticket. Title: "Web Server Critical", Description: "The web server is completely down", Severity: "Critical". Then create it with confirm=True."#,
];

#[derive(Debug, Parser)]
#[command(
    name = "incident-ops",
    about = "Incident ops agent with guardrails and a policy-gated tool layer",
    after_help = "Examples:\n  incident-ops chat\n  incident-ops demo --reset\n  incident-ops status INC-1"
)]
pub struct Cli {
    /// TOML config file. Environment overrides apply on top.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Start an interactive chat session")]
    Chat,
    #[command(about = "Run the scripted demo queries")]
    Demo {
        #[arg(long, help = "Reset the ticket store before the first query")]
        reset: bool,
    },
    #[command(about = "Look up a ticket through the policy gate")]
    Status {
        #[arg(help = "Ticket ID (e.g. INC-1)")]
        ticket_id: Option<String>,
    },
}

// ── Runtime ───────────────────────────────────────────────────

/// Everything an orchestrator borrows, built once from config.
pub struct Runtime {
    pub store: MockTicketStore,
    pub retriever: CorpusRetriever,
    pub reasoner: Option<OllamaReasoner>,
    pub audit: AuditLog,
    pub tables: PatternTables,
    pub top_k: usize,
}

impl Runtime {
    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let tables = match &config.patterns_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading pattern tables");
                PatternTables::from_file(path)?
            }
            None => PatternTables::default(),
        };

        let store = MockTicketStore::open(&config.tickets_path);
        tracing::info!(path = %config.tickets_path.display(), "ticket store opened");

        let retriever = CorpusRetriever::new(
            &config.corpus_dir,
            config.retriever.chunk_size,
            config.retriever.chunk_overlap,
        );

        let reasoner = if config.reasoner.enabled {
            tracing::info!(
                host = %config.reasoner.host,
                model = %config.reasoner.model,
                "ollama reasoner enabled"
            );
            Some(OllamaReasoner::new(config.reasoner.clone())?)
        } else {
            tracing::info!("ollama reasoner disabled");
            None
        };

        let audit = match &config.audit_log_path {
            Some(path) => AuditLog::with_file(path),
            None => AuditLog::new(),
        }
        .capturing();

        Ok(Self {
            store,
            retriever,
            reasoner,
            audit,
            tables,
            top_k: config.retriever.top_k,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        let orch = Orchestrator::new(&self.store, &self.retriever, &self.audit)
            .with_patterns(&self.tables)
            .with_top_k(self.top_k);
        match &self.reasoner {
            Some(r) => orch.with_reasoner(r as &dyn Reasoner),
            None => orch,
        }
    }
}

// ── Commands ──────────────────────────────────────────────────

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    }
    .with_env_overrides();

    let runtime = Runtime::from_config(&config)?;
    match cli.command {
        Command::Chat => chat(&runtime).await,
        Command::Demo { reset } => demo(&runtime, reset).await,
        Command::Status { ticket_id } => {
            match ticket_id {
                Some(id) => status(&runtime, &id).await,
                None => println!("Usage: incident-ops status <ticket_id>"),
            }
            Ok(())
        }
    }
}

async fn chat(runtime: &Runtime) -> anyhow::Result<()> {
    let orch = runtime.orchestrator();
    let mut conversation = Conversation::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("Incident Ops Agent initiated in interactive chat mode. Type 'exit' to quit.");
    loop {
        print!("\n[You]: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            println!("Exiting agent. Goodbye!");
            break;
        }

        let outcome = orch.handle_turn(input, &conversation).await;
        print_turn(&runtime.audit, &outcome);
        if outcome.should_record() {
            conversation.push_exchange(input, outcome.answer);
        }
    }
    Ok(())
}

async fn demo(runtime: &Runtime, reset: bool) -> anyhow::Result<()> {
    if reset {
        runtime.store.reset_store()?;
        tracing::info!("ticket store reset for demo");
    }
    runtime.audit.emit(
        AuditEvent::DemoSetup {
            reset_store: reset,
            queries: DEMO_QUERIES.len(),
        },
        None,
    );
    runtime.audit.drain();

    let orch = runtime.orchestrator();
    println!("\n--- Running Demo Queries ---");
    for (i, query) in DEMO_QUERIES.iter().enumerate() {
        println!("\n{0} DEMO Query {1}/{2} {0}", "=".repeat(10), i + 1, DEMO_QUERIES.len());
        println!("[You]: {query}");
        let outcome = orch.handle_turn(query, &Conversation::new()).await;
        print_turn(&runtime.audit, &outcome);
    }
    Ok(())
}

async fn status(runtime: &Runtime, ticket_id: &str) {
    println!("\n--- Checking Status for Ticket ID: {ticket_id} ---");
    println!("[You]: status {ticket_id}");
    let outcome = runtime.orchestrator().ticket_status(ticket_id).await;
    print_turn(&runtime.audit, &outcome);
}

// ── Output ────────────────────────────────────────────────────

fn print_turn(audit: &AuditLog, outcome: &TurnOutcome) {
    for record in audit.drain() {
        print_tool_record(&record);
    }

    match outcome.origin {
        AnswerOrigin::Guardrail => println!("[Agent]: {}", outcome.answer),
        AnswerOrigin::Error => println!("[Agent Error]: {}", outcome.answer),
        _ => {
            if outcome.output_blocked {
                println!("[Agent]: The response was blocked by the output guardrail.");
            }
            println!("\n[Agent Final Answer]: {}", outcome.answer);
            println!("[Source]: {}", outcome.source_line());
            println!("[Confidence]: {}", outcome.origin.confidence_label());
        }
    }
}

fn print_tool_record(record: &AuditRecord) {
    match &record.event {
        AuditEvent::ToolStart { tool, input } => {
            println!("\n[Tool Used]: {tool} with input: {input}");
        }
        AuditEvent::ToolEnd { output, .. } => println!("[Tool Output]: {output}"),
        _ => {}
    }
}
