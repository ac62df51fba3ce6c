//! Audit trail for every significant action in a turn.
//!
//! Each record is logged as a structured `tracing` event under the `audit`
//! target and, when a log path is configured, appended to it as one JSON
//! line. A failing file write is logged and otherwise ignored.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use io_protocol::{AuditEvent, AuditRecord};

#[derive(Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
    /// Records kept in memory, for tests and the demo summary.
    captured: Option<Mutex<Vec<AuditRecord>>>,
}

impl AuditLog {
    /// Tracing only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracing plus JSONL append to `path`.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            captured: None,
        }
    }

    /// Keep every record in memory as well.
    pub fn capturing(mut self) -> Self {
        self.captured = Some(Mutex::new(Vec::new()));
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn emit(&self, event: AuditEvent, request_id: Option<Uuid>) {
        let record = AuditRecord::now(event, request_id);
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize audit record");
                return;
            }
        };

        tracing::info!(target: "audit", event = record.event.tag(), record = %line);

        if let Some(path) = &self.path
            && let Err(e) = append_line(path, &line)
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to append audit record");
        }

        if let Some(captured) = &self.captured
            && let Ok(mut records) = captured.lock()
        {
            records.push(record);
        }
    }

    /// Captured records; empty unless built with `capturing()`.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.captured
            .as_ref()
            .and_then(|c| c.lock().ok().map(|r| r.clone()))
            .unwrap_or_default()
    }

    /// Remove and return the captured records.
    pub fn drain(&self) -> Vec<AuditRecord> {
        self.captured
            .as_ref()
            .and_then(|c| c.lock().ok().map(|mut r| std::mem::take(&mut *r)))
            .unwrap_or_default()
    }

    /// Event tags of the captured records, in order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.event.tag()).collect()
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/ops.jsonl");
        let audit = AuditLog::with_file(&path);

        audit.emit(
            AuditEvent::ToolStart { tool: "calculate".into(), input: "1+1".into() },
            None,
        );
        audit.emit(
            AuditEvent::ToolEnd { tool: "calculate".into(), output: "2".into() },
            Some(Uuid::now_v7()),
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "tool_start");
        assert_eq!(lines[1]["event"], "tool_end");
        assert_eq!(lines[1]["output"], "2");
        assert!(lines[1]["request_id"].is_string());
    }

    #[test]
    fn capturing_keeps_records_in_order() {
        let audit = AuditLog::new().capturing();
        audit.emit(AuditEvent::AgentError { error: "down".into() }, None);
        audit.emit(AuditEvent::DemoSetup { reset_store: false, queries: 3 }, None);
        assert_eq!(audit.tags(), vec!["agent_error", "demo_setup"]);

        assert_eq!(audit.drain().len(), 2);
        assert!(audit.records().is_empty());
    }

    #[test]
    fn unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let audit = AuditLog::with_file(dir.path()).capturing();
        audit.emit(AuditEvent::AgentError { error: "x".into() }, None);
        assert_eq!(audit.records().len(), 1);
    }

    #[test]
    fn plain_log_records_nothing_in_memory() {
        let audit = AuditLog::new();
        audit.emit(AuditEvent::AgentError { error: "x".into() }, None);
        assert!(audit.records().is_empty());
    }
}
