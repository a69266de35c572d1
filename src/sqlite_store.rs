//! SQLite-backed implementation of the storage traits.
//!
//! Chunks and fingerprints share one database. Similarity search fetches
//! all stored vectors and scores them in process with cosine similarity;
//! corpora here are small enough that a scan beats carrying a vector-index
//! extension.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::PipelineError;
use crate::models::{Chunk, Passage};
use crate::store::{FingerprintStore, VectorStore, VectorHit};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: sqlx::Error) -> PipelineError {
    PipelineError::StorageFailed(e.to_string())
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn store_chunks(
        &self,
        batch: &[(Chunk, Option<Vec<f32>>)],
    ) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for (chunk, embedding) in batch {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document, fingerprint, chunk_index, text)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document)
            .bind(&chunk.fingerprint)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

            if let Some(vec) = embedding {
                sqlx::query(
                    "INSERT INTO chunk_vectors (chunk_id, document, embedding) VALUES (?, ?, ?)",
                )
                .bind(&chunk.id)
                .bind(&chunk.document)
                .bind(vec_to_blob(vec))
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
            }
        }

        tx.commit().await.map_err(storage_err)
    }

    async fn search(&self, query_vec: &[f32], top_n: i64) -> Result<Vec<VectorHit>, PipelineError> {
        // Fetch all vectors and score in Rust.
        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.embedding, c.document, c.chunk_index, c.text
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::SearchUnavailable(e.to_string()))?;

        let mut hits: Vec<VectorHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                VectorHit {
                    passage: Passage {
                        chunk_id: row.get("chunk_id"),
                        document: row.get("document"),
                        chunk_index: row.get("chunk_index"),
                        text: row.get("text"),
                    },
                    similarity: cosine_similarity(query_vec, &vec) as f64,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n.max(0) as usize);
        Ok(hits)
    }

    async fn all_passages(&self) -> Result<Vec<Passage>, PipelineError> {
        let rows = sqlx::query(
            "SELECT id, document, chunk_index, text FROM chunks ORDER BY document, chunk_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|row| Passage {
                chunk_id: row.get("id"),
                document: row.get("document"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
            })
            .collect())
    }

    async fn delete_document(&self, document: &str) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document = ?")
            .bind(document)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        sqlx::query("DELETE FROM chunks WHERE document = ?")
            .bind(document)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)
    }

    async fn chunk_count(&self) -> Result<i64, PipelineError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }
}

#[async_trait]
impl FingerprintStore for SqliteStore {
    async fn persisted_fingerprints(&self) -> Result<HashMap<String, String>, PipelineError> {
        let rows = sqlx::query("SELECT path, fingerprint FROM documents")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|row| (row.get("path"), row.get("fingerprint")))
            .collect())
    }

    async fn commit(&self, document: &str, fingerprint: &str) -> Result<(), PipelineError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO documents (path, fingerprint, indexed_at)
            VALUES (?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET fingerprint = excluded.fingerprint,
                                            indexed_at = excluded.indexed_at
            "#,
        )
        .bind(document)
        .bind(fingerprint)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn clear(&self, document: &str) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn document_count(&self) -> Result<i64, PipelineError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::apply_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn chunk(id: &str, document: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document: document.to_string(),
            fingerprint: "fp".to_string(),
            chunk_index: index,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn store_and_search_by_similarity() {
        let store = test_store().await;
        store
            .store_chunks(&[
                (chunk("c1", "a.txt", 0, "near"), Some(vec![1.0, 0.0])),
                (chunk("c2", "a.txt", 1, "far"), Some(vec![0.0, 1.0])),
                (chunk("c3", "a.txt", 2, "no vector"), None),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].passage.chunk_id, "c1");
        assert!(hits[0].similarity > hits[1].similarity);

        // Unembedded chunk still visible to lexical scoring.
        assert_eq!(store.all_passages().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_document_cascades_to_vectors() {
        let store = test_store().await;
        store
            .store_chunks(&[
                (chunk("c1", "a.txt", 0, "one"), Some(vec![1.0])),
                (chunk("c2", "b.txt", 0, "two"), Some(vec![0.5])),
            ])
            .await
            .unwrap();

        store.delete_document("a.txt").await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        let hits = store.search(&[1.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].passage.document, "b.txt");
    }

    #[tokio::test]
    async fn fingerprint_commit_is_an_upsert() {
        let store = test_store().await;
        store.commit("a.txt", "fp1").await.unwrap();
        store.commit("a.txt", "fp2").await.unwrap();
        store.commit("b.txt", "fp3").await.unwrap();

        let fps = store.persisted_fingerprints().await.unwrap();
        assert_eq!(fps.len(), 2);
        assert_eq!(fps.get("a.txt").map(String::as_str), Some("fp2"));
        assert_eq!(store.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_chunk_index_is_a_storage_failure() {
        let store = test_store().await;
        store
            .store_chunks(&[(chunk("c1", "a.txt", 0, "one"), None)])
            .await
            .unwrap();
        let err = store
            .store_chunks(&[(chunk("c2", "a.txt", 0, "dup"), None)])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StorageFailed(_)));
    }
}
