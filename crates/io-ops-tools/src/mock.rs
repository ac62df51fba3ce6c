//! Mock retriever for testing, serving fixed passages.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RetrieverError;
use crate::retriever::{KnowledgeRetriever, Passage, Retrieval};

/// Returns the first `k` preloaded passages for every query and records
/// the queries it saw.
#[derive(Default)]
pub struct MockRetriever {
    passages: Vec<Passage>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_passage(&mut self, text: impl Into<String>, source: impl Into<String>) {
        self.passages.push(Passage {
            text: text.into(),
            source: source.into(),
        });
    }

    /// Two runbook-style passages about web CPU spikes and DB latency.
    pub fn with_runbook_sample() -> Self {
        let mut m = Self::new();
        m.add_passage(
            "Web CPU spike runbook: check the load balancer, identify hot endpoints, scale out web nodes.",
            "corpus/web_cpu_runbook.txt",
        );
        m.add_passage(
            "Incident 2024-02-15: DB latency caused by a missing index on the orders table.",
            "corpus/db_incident_feb15.txt",
        );
        m
    }

    /// A retriever whose every search fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KnowledgeRetriever for MockRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Retrieval, RetrieverError> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.to_string());
        }
        if self.fail {
            return Err(RetrieverError::Other("mock retriever failure".into()));
        }
        Ok(Retrieval {
            passages: self.passages.iter().take(k).cloned().collect(),
        })
    }
}
