//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for one source: loaded text → token
//! chunking → embedding → storage. Re-ingesting an origin replaces its
//! previous chunks.

use anyhow::{bail, Result};

use crate::chunk::Chunker;
use crate::embedding::Embedder;
use crate::models::LoadedSource;
use crate::store::VectorStore;

/// Outcome of one ingestion, reported to the CLI and the HTTP API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestReport {
    pub source_id: String,
    pub origin: String,
    pub kind: String,
    pub chunks: usize,
}

pub async fn ingest_source(
    store: &VectorStore,
    embedder: &dyn Embedder,
    chunker: &Chunker,
    loaded: LoadedSource,
) -> Result<IngestReport> {
    if loaded.text.trim().is_empty() {
        bail!("Loaded content is empty and cannot be ingested");
    }

    let source_id = store
        .upsert_source(loaded.kind, &loaded.origin, loaded.title.as_deref())
        .await?;

    let chunks = chunker.split(&source_id, &loaded.text)?;
    if chunks.is_empty() {
        bail!("No chunks were created from this source");
    }

    tracing::debug!(
        origin = %loaded.origin,
        chunks = chunks.len(),
        "chunked source, requesting embeddings"
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;

    store.replace_chunks(&source_id, &chunks, &vectors).await?;

    tracing::info!(
        origin = %loaded.origin,
        kind = %loaded.kind,
        chunks = chunks.len(),
        "ingested source"
    );

    Ok(IngestReport {
        source_id,
        origin: loaded.origin,
        kind: loaded.kind.as_str().to_string(),
        chunks: chunks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::SourceKind;
    use crate::testing::CountingEmbedder;
    use crate::{db, migrate};

    async fn test_store() -> (tempfile::TempDir, VectorStore) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.dir = tmp.path().to_path_buf();
        let pool = db::connect(&config).await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        (tmp, VectorStore::new(pool, "test_collection"))
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_any_work() {
        let (_tmp, store) = test_store().await;
        let embedder = CountingEmbedder::new(4);
        let chunker = Chunker::new(50, 10).unwrap();
        let loaded = LoadedSource {
            kind: SourceKind::Text,
            origin: "empty.txt".to_string(),
            title: None,
            text: "   \n  ".to_string(),
        };

        let err = ingest_source(&store, &embedder, &chunker, loaded)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert_eq!(embedder.calls(), 0);
        assert_eq!(store.count_chunks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_stores_chunks_and_vectors() {
        let (_tmp, store) = test_store().await;
        let embedder = CountingEmbedder::new(4);
        let chunker = Chunker::new(8, 2).unwrap();
        let text = (0..40)
            .map(|i| format!("token{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let loaded = LoadedSource {
            kind: SourceKind::Web,
            origin: "https://example.com/article".to_string(),
            title: Some("Article".to_string()),
            text,
        };

        let report = ingest_source(&store, &embedder, &chunker, loaded)
            .await
            .unwrap();
        assert!(report.chunks > 1);
        assert_eq!(report.kind, "web");
        assert_eq!(store.count_chunks().await.unwrap(), report.chunks as i64);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn reingest_does_not_duplicate() {
        let (_tmp, store) = test_store().await;
        let embedder = CountingEmbedder::new(4);
        let chunker = Chunker::new(8, 2).unwrap();
        let make = || LoadedSource {
            kind: SourceKind::Text,
            origin: "notes.txt".to_string(),
            title: None,
            text: "the same short note body".to_string(),
        };

        let first = ingest_source(&store, &embedder, &chunker, make())
            .await
            .unwrap();
        let second = ingest_source(&store, &embedder, &chunker, make())
            .await
            .unwrap();

        assert_eq!(first.source_id, second.source_id);
        assert_eq!(first.chunks, second.chunks);
        assert_eq!(store.count_chunks().await.unwrap(), first.chunks as i64);
        assert_eq!(store.list_sources().await.unwrap().len(), 1);
    }
}
