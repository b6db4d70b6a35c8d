//! Core data models used throughout knowledge-agent.
//!
//! These types represent the sources, chunks, and retrieval results that
//! flow through the ingestion and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Origin type of an ingested source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Web,
    Youtube,
    Pdf,
    Docx,
    Text,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Web => "web",
            SourceKind::Youtube => "youtube",
            SourceKind::Pdf => "pdf",
            SourceKind::Docx => "docx",
            SourceKind::Text => "text",
        }
    }

    /// Parse the stored string form back into a kind. Unknown values map
    /// to `Text` so old rows never make listing fail.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "web" => SourceKind::Web,
            "youtube" => SourceKind::Youtube,
            "pdf" => SourceKind::Pdf,
            "docx" => SourceKind::Docx,
            _ => SourceKind::Text,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of a loader before chunking: plain text plus metadata.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub kind: SourceKind,
    /// URL or filename that identifies the source.
    pub origin: String,
    pub title: Option<String>,
    pub text: String,
}

/// An ingested document or page, persisted in SQLite.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
    pub origin: String,
    pub title: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

/// A contiguous token window of a source's text.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub token_count: i64,
    pub hash: String,
}

/// A retrieval hit: one chunk with its parent source and similarity score.
/// Ephemeral — produced per question, never persisted.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub source_id: String,
    pub origin: String,
    pub kind: SourceKind,
    pub text: String,
    pub token_count: i64,
    pub score: f64,
}
