//! Incident Ops Agent: guardrailed, policy-gated incident assistant.
//!
//! Deterministic routes for arithmetic and ticket requests, an Ollama
//! reasoner for everything else, and one policy gate in front of every
//! tool call.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use io_agent::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "incident-ops starting");

    cli::run(Cli::parse()).await
}
