//! Knowledge retriever abstraction and the file-corpus implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::RetrieverError;

/// Marker line appended to retrieval output, followed by comma-separated sources.
pub const SOURCES_MARKER: &str = "[SOURCES]:";

/// Source label used when nothing matched.
pub const UNKNOWN_SOURCE: &str = "unknown_source";

/// Passage sources read `corpus/<file name>` wherever the directory lives.
const SOURCE_PREFIX: &str = "corpus";

/// A ranked passage with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub source: String,
}

/// Ranked passages for one query, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieval {
    pub passages: Vec<Passage>,
}

impl Retrieval {
    /// Unique sources in rank order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for p in &self.passages {
            if !seen.contains(&p.source) {
                seen.push(p.source.clone());
            }
        }
        seen
    }

    /// Tool output: joined passages then the `[SOURCES]:` line.
    pub fn render(&self) -> String {
        let sources = self.sources();
        let sources = if sources.is_empty() {
            UNKNOWN_SOURCE.to_string()
        } else {
            sources.join(", ")
        };
        let text = if self.passages.is_empty() {
            "No matching reference text found.".to_string()
        } else {
            self.passages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        format!("{text}\n\n{SOURCES_MARKER} {sources}")
    }
}

/// Parse the sources back out of a rendered retrieval.
pub fn extract_sources(tool_output: &str) -> Vec<String> {
    let Some((_, tail)) = tool_output.split_once(SOURCES_MARKER) else {
        return Vec::new();
    };
    tail.trim()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Turns a query into ranked reference passages.
///
/// Swappable so tests can use `MockRetriever` and deployments can plug in
/// an embedding-backed index.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Retrieval, RetrieverError>;
}

/// Lexical retriever over `*.txt` files in a corpus directory.
///
/// Files are read and chunked on first search and cached for the lifetime
/// of the retriever.
pub struct CorpusRetriever {
    dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
    chunks: OnceCell<Vec<Passage>>,
}

impl CorpusRetriever {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            dir: dir.into(),
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            chunks: OnceCell::new(),
        }
    }

    async fn chunks(&self) -> Result<&[Passage], RetrieverError> {
        let chunks = self
            .chunks
            .get_or_try_init(|| load_corpus(&self.dir, self.chunk_size, self.chunk_overlap))
            .await?;
        Ok(chunks.as_slice())
    }
}

#[async_trait]
impl KnowledgeRetriever for CorpusRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Retrieval, RetrieverError> {
        let chunks = self.chunks().await?;
        let terms = query_terms(query);

        let mut scored: Vec<(usize, usize)> = chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                let score = score_chunk(&chunk.text, &terms);
                (score > 0).then_some((i, score))
            })
            .collect();
        // Highest score first; earlier chunks win ties.
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let passages: Vec<Passage> = scored
            .into_iter()
            .take(k)
            .map(|(i, _)| chunks[i].clone())
            .collect();

        tracing::debug!(query = %query, hits = passages.len(), "corpus search");
        Ok(Retrieval { passages })
    }
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "what", "for", "of", "on", "in", "to", "and", "how",
    "me", "my", "do", "does", "did", "with", "about",
];

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in words(query) {
        if word.len() >= 2 && !STOP_WORDS.contains(&word.as_str()) && !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn score_chunk(text: &str, terms: &[String]) -> usize {
    if terms.is_empty() {
        return 0;
    }
    words(text).filter(|w| terms.contains(w)).count()
}

async fn load_corpus(
    dir: &Path,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Passage>, RetrieverError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RetrieverError::CorpusNotFound(dir.display().to_string())
        } else {
            RetrieverError::Io(format!("{}: {e}", dir.display()))
        }
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RetrieverError::Io(e.to_string()))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            files.push(path);
        }
    }
    files.sort();

    let mut passages = Vec::new();
    for path in files {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RetrieverError::Io(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = format!("{SOURCE_PREFIX}/{name}");
        for chunk in split_chunks(&text, chunk_size, chunk_overlap) {
            passages.push(Passage {
                text: chunk,
                source: source.clone(),
            });
        }
    }

    tracing::info!(dir = %dir.display(), chunks = passages.len(), "corpus indexed");
    Ok(passages)
}

/// Overlapping character windows, trimmed; blank windows are dropped.
fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
