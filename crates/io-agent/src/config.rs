//! Agent configuration, loadable from TOML or environment.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::reasoner::OllamaConfig;

/// Top-level configuration for the incident ops agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Ticket store JSON file.
    #[serde(default = "default_tickets_path")]
    pub tickets_path: PathBuf,
    /// JSONL audit file. None logs through tracing only.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
    /// Directory of `*.txt` reference documents.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
    /// TOML file overriding the guardrail / policy phrase tables.
    #[serde(default)]
    pub patterns_file: Option<PathBuf>,
    /// Reasoner fallback settings.
    #[serde(default)]
    pub reasoner: OllamaConfig,
    /// Corpus retrieval settings.
    #[serde(default)]
    pub retriever: RetrieverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Passages per retrieval.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_tickets_path() -> PathBuf {
    PathBuf::from("tickets.json")
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("corpus")
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    4
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tickets_path: default_tickets_path(),
            audit_log_path: None,
            corpus_dir: default_corpus_dir(),
            patterns_file: None,
            reasoner: OllamaConfig::default(),
            retriever: RetrieverConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `OPS_*` / `OLLAMA_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("OPS_TICKETS_PATH") {
            self.tickets_path = v.into();
        }
        if let Some(v) = get("OPS_LOG_FILE") {
            self.audit_log_path = Some(v.into());
        }
        if let Some(v) = get("OPS_CORPUS_DIR") {
            self.corpus_dir = v.into();
        }
        if let Some(v) = get("OPS_PATTERNS_FILE") {
            self.patterns_file = Some(v.into());
        }
        if let Some(v) = get("OLLAMA_HOST") {
            self.reasoner.host = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.reasoner.model = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_config_uses_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.tickets_path, PathBuf::from("tickets.json"));
        assert_eq!(config.corpus_dir, PathBuf::from("corpus"));
        assert!(config.audit_log_path.is_none());
        assert_eq!(config.retriever.chunk_size, 1000);
        assert_eq!(config.retriever.chunk_overlap, 200);
        assert_eq!(config.retriever.top_k, 4);
        assert_eq!(config.reasoner.max_iterations, 25);
    }

    #[test]
    fn deserialize_full_config() {
        let toml = r#"
tickets_path = "/var/lib/ops/tickets.json"
audit_log_path = "/var/log/ops/events.jsonl"
corpus_dir = "/srv/corpus"
patterns_file = "/etc/ops/patterns.toml"

[reasoner]
host = "http://gpu-box:11434"
model = "qwen2.5:7b"
timeout_secs = 90
enabled = false
max_iterations = 10

[retriever]
chunk_size = 500
chunk_overlap = 50
top_k = 2
"#;
        let config: AgentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.audit_log_path, Some(PathBuf::from("/var/log/ops/events.jsonl")));
        assert_eq!(config.reasoner.model, "qwen2.5:7b");
        assert!(!config.reasoner.enabled);
        assert_eq!(config.reasoner.max_iterations, 10);
        assert_eq!(config.retriever.top_k, 2);
    }

    #[test]
    fn overrides_replace_fields_and_skip_blanks() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPS_TICKETS_PATH", "/tmp/t.json"),
            ("OPS_LOG_FILE", "  "),
            ("OLLAMA_MODEL", "mistral"),
        ]);
        let config = AgentConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.tickets_path, PathBuf::from("/tmp/t.json"));
        assert!(config.audit_log_path.is_none());
        assert_eq!(config.reasoner.model, "mistral");
        assert_eq!(config.reasoner.host, "http://localhost:11434");
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "corpus_dir = \"docs\"\n").unwrap();
        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("docs"));
        assert!(AgentConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
