//! Vector store adapter over SQLite.
//!
//! A thin wrapper persisting (chunk text, metadata, vector) triples and
//! issuing nearest-neighbor queries. All persistence is delegated to
//! SQLite via `sqlx`; this module adds no algorithm beyond parameter
//! translation and cosine ranking of the fetched vectors.
//!
//! Rows are scoped by a collection name so one database file can host
//! several knowledge bases.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, ScoredChunk, Source, SourceKind};

pub struct VectorStore {
    pool: SqlitePool,
    collection: String,
}

impl VectorStore {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or update the source row for an origin. Re-ingesting the
    /// same origin keeps the existing source id so its chunks can be
    /// replaced rather than duplicated.
    pub async fn upsert_source(
        &self,
        kind: SourceKind,
        origin: &str,
        title: Option<&str>,
    ) -> Result<String> {
        let existing_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM sources WHERE collection = ? AND origin = ?")
                .bind(&self.collection)
                .bind(origin)
                .fetch_optional(&self.pool)
                .await?;

        let source_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO sources (id, collection, kind, origin, title, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, origin) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&source_id)
        .bind(&self.collection)
        .bind(kind.as_str())
        .bind(origin)
        .bind(title)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(source_id)
    }

    /// Replace all chunks (and their vectors) for a source in one
    /// transaction. Chunk inserts are idempotent per chunk id.
    pub async fn replace_chunks(
        &self,
        source_id: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        anyhow::ensure!(
            chunks.len() == vectors.len(),
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, source_id, chunk_index, text, token_count, hash)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source_id = excluded.source_id,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    token_count = excluded.token_count,
                    hash = excluded.hash
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.source_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(chunk.token_count)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, source_id, dims, embedding)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    source_id = excluded.source_id,
                    dims = excluded.dims,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.source_id)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return the `k` most similar chunks to `query_vec`, ranked by
    /// cosine similarity descending. Ties rank by insertion order.
    pub async fn query(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT cv.rowid AS insert_order, cv.chunk_id, cv.embedding,
                   c.source_id, c.text, c.token_count,
                   s.origin, s.kind
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            JOIN sources s ON s.id = c.source_id
            WHERE s.collection = ?
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(i64, ScoredChunk)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                let score = cosine_similarity(query_vec, &vec) as f64;
                let kind: String = row.get("kind");
                let insert_order: i64 = row.get("insert_order");
                (
                    insert_order,
                    ScoredChunk {
                        chunk_id: row.get("chunk_id"),
                        source_id: row.get("source_id"),
                        origin: row.get("origin"),
                        kind: SourceKind::from_str_lossy(&kind),
                        text: row.get("text"),
                        token_count: row.get("token_count"),
                        score,
                    },
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    /// List ingested sources, oldest first.
    pub async fn list_sources(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, origin, title, ingested_at
            FROM sources
            WHERE collection = ?
            ORDER BY ingested_at ASC, origin ASC
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let sources = rows
            .iter()
            .map(|row| {
                let kind: String = row.get("kind");
                let ts: i64 = row.get("ingested_at");
                Source {
                    id: row.get("id"),
                    kind: SourceKind::from_str_lossy(&kind),
                    origin: row.get("origin"),
                    title: row.get("title"),
                    ingested_at: Utc.timestamp_opt(ts, 0).single().unwrap_or_default(),
                }
            })
            .collect();

        Ok(sources)
    }

    /// Number of persisted chunks in the collection.
    pub async fn count_chunks(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chunks c
            JOIN sources s ON s.id = c.source_id
            WHERE s.collection = ?
            "#,
        )
        .bind(&self.collection)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Remove every persisted row for this collection.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chunk_vectors WHERE source_id IN (SELECT id FROM sources WHERE collection = ?)",
        )
        .bind(&self.collection)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM chunks WHERE source_id IN (SELECT id FROM sources WHERE collection = ?)",
        )
        .bind(&self.collection)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM sources WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
