//! Answer assembly: retrieval, prompt construction, and citations.
//!
//! Given a question, retrieves the most similar chunks, builds a
//! context-only prompt with bracketed citation labels, makes exactly one
//! chat-completion call, and returns the answer with the citations that
//! were actually sent. An empty knowledge base (or empty retrieval)
//! short-circuits before any API call.

use anyhow::{bail, Result};

use crate::chat::ChatModel;
use crate::chunk::Chunker;
use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, Embedder};
use crate::models::ScoredChunk;
use crate::store::VectorStore;

/// Answer returned when nothing relevant is stored. Kept as a constant so
/// the CLI, server, and tests agree on the wording.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant context in the knowledge base for this question. \
     Ingest some sources and try again.";

const SYSTEM_PROMPT: &str = "Answer using only provided context and cite sources.";

/// A reference from the answer back to one retrieved chunk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Citation {
    /// 1-based index matching the bracket markers in the prompt.
    pub index: usize,
    pub origin: String,
    pub kind: String,
    pub chunk_id: String,
    pub score: f64,
}

impl Citation {
    /// Label used both in the prompt and in the rendered citation list,
    /// e.g. `[2] https://example.com (web)`.
    pub fn label(&self) -> String {
        format!("[{}] {} ({})", self.index, self.origin, self.kind)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    fn no_context() -> Self {
        Self {
            text: NO_CONTEXT_ANSWER.to_string(),
            citations: Vec::new(),
        }
    }
}

pub async fn answer_question(
    store: &VectorStore,
    embedder: &dyn Embedder,
    chat: &dyn ChatModel,
    chunker: &Chunker,
    retrieval: &RetrievalConfig,
    question: &str,
) -> Result<Answer> {
    let question = question.trim();
    if question.is_empty() {
        bail!("Question must not be empty");
    }

    // An empty store answers without touching the network.
    if store.count_chunks().await? == 0 {
        return Ok(Answer::no_context());
    }

    let query_vec = embed_query(embedder, question).await?;
    let hits = store.query(&query_vec, retrieval.top_k).await?;
    if hits.is_empty() {
        return Ok(Answer::no_context());
    }

    // The question rides inside the prompt, so its tokens come out of
    // the context budget before any chunk does.
    let budget = retrieval
        .max_context_tokens
        .saturating_sub(chunker.count_tokens(question));
    let kept = fit_context_budget(hits, budget);
    tracing::debug!(kept = kept.len(), "assembled retrieval context");

    let citations: Vec<Citation> = kept
        .iter()
        .enumerate()
        .map(|(i, hit)| Citation {
            index: i + 1,
            origin: hit.origin.clone(),
            kind: hit.kind.as_str().to_string(),
            chunk_id: hit.chunk_id.clone(),
            score: hit.score,
        })
        .collect();

    let context_parts: Vec<String> = kept
        .iter()
        .zip(citations.iter())
        .map(|(hit, citation)| format!("{}\n{}", citation.label(), hit.text))
        .collect();

    let prompt = format!(
        "You are a helpful assistant answering from provided context only. \
         If answer is missing, say you don't know. \
         Include bracket citations like [1], [2].\n\n\
         Question:\n{}\n\nContext:\n{}",
        question,
        context_parts.join("\n\n")
    );

    let text = chat.complete(SYSTEM_PROMPT, &prompt).await?;

    Ok(Answer { text, citations })
}

/// Drop lowest-similarity chunks until the context fits the token
/// budget. Hits arrive ranked best-first, so trimming is from the tail;
/// the best chunk is always kept.
fn fit_context_budget(hits: Vec<ScoredChunk>, max_context_tokens: usize) -> Vec<ScoredChunk> {
    let mut kept = Vec::with_capacity(hits.len());
    let mut used: usize = 0;

    for hit in hits {
        let cost = hit.token_count.max(0) as usize;
        if !kept.is_empty() && used + cost > max_context_tokens {
            break;
        }
        used += cost;
        kept.push(hit);
    }

    kept
}
