//! Storage traits for chunks, vectors, and document fingerprints.
//!
//! [`VectorStore`] persists chunks (with or without embeddings) and answers
//! similarity searches; [`FingerprintStore`] records the per-document
//! content fingerprints that drive incremental indexing. The SQLite
//! implementation lives in [`crate::sqlite_store`]; [`InMemoryStore`] backs
//! the pipeline's unit tests.
//!
//! A document's fingerprint is only committed after all of its chunks are
//! stored, so a partially indexed document is retried on the next run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::PipelineError;
use crate::models::{Chunk, Passage};

/// A passage returned by similarity search, with its cosine similarity to
/// the query vector.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub passage: Passage,
    pub similarity: f64,
}

/// Chunk and vector persistence plus similarity search.
///
/// `store_chunks` batches never span documents; a failed batch is
/// attributable to exactly one document. A chunk stored with `None` for its
/// embedding participates in lexical scoring but never in vector search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist a batch of chunks with optional embeddings.
    async fn store_chunks(
        &self,
        batch: &[(Chunk, Option<Vec<f32>>)],
    ) -> Result<(), PipelineError>;

    /// Return the `top_n` stored passages most similar to `query_vec`,
    /// ordered by descending similarity.
    async fn search(&self, query_vec: &[f32], top_n: i64) -> Result<Vec<VectorHit>, PipelineError>;

    /// Every stored passage, for corpus-wide lexical scoring.
    async fn all_passages(&self) -> Result<Vec<Passage>, PipelineError>;

    /// Remove all chunks and vectors belonging to a document.
    async fn delete_document(&self, document: &str) -> Result<(), PipelineError>;

    async fn chunk_count(&self) -> Result<i64, PipelineError>;
}

/// Per-document fingerprint persistence.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// The committed fingerprint of every known document, keyed by identity.
    async fn persisted_fingerprints(&self) -> Result<HashMap<String, String>, PipelineError>;

    /// Record `fingerprint` as the committed state of `document`. Called
    /// only after the document's chunks are fully stored.
    async fn commit(&self, document: &str, fingerprint: &str) -> Result<(), PipelineError>;

    /// Forget the committed fingerprint of `document`. Called when its
    /// stored chunks are about to be replaced, so a failure mid-replace
    /// leaves the document marked for retry instead of falsely committed.
    async fn clear(&self, document: &str) -> Result<(), PipelineError>;

    async fn document_count(&self) -> Result<i64, PipelineError>;
}

/// In-memory store used by unit tests.
///
/// Search availability can be toggled to exercise the lexical-only
/// degradation path.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<(Chunk, Option<Vec<f32>>)>>,
    fingerprints: RwLock<HashMap<String, String>>,
    search_down: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `search` calls fail with `SearchUnavailable`.
    pub fn set_search_down(&self, down: bool) {
        self.search_down.store(down, Ordering::SeqCst);
    }

    fn passage_of(chunk: &Chunk) -> Passage {
        Passage {
            chunk_id: chunk.id.clone(),
            document: chunk.document.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn store_chunks(
        &self,
        batch: &[(Chunk, Option<Vec<f32>>)],
    ) -> Result<(), PipelineError> {
        let mut chunks = self
            .chunks
            .write()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        chunks.extend(batch.iter().cloned());
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], top_n: i64) -> Result<Vec<VectorHit>, PipelineError> {
        if self.search_down.load(Ordering::SeqCst) {
            return Err(PipelineError::SearchUnavailable(
                "search backend is down".to_string(),
            ));
        }

        let chunks = self
            .chunks
            .read()
            .map_err(|e| PipelineError::SearchUnavailable(e.to_string()))?;

        let mut hits: Vec<VectorHit> = chunks
            .iter()
            .filter_map(|(chunk, embedding)| {
                embedding.as_ref().map(|vec| VectorHit {
                    passage: Self::passage_of(chunk),
                    similarity: cosine_similarity(query_vec, vec) as f64,
                })
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
        let chunks = self
            .chunks
            .read()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        Ok(chunks.iter().map(|(c, _)| Self::passage_of(c)).collect())
    }

    async fn delete_document(&self, document: &str) -> Result<(), PipelineError> {
        let mut chunks = self
            .chunks
            .write()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        chunks.retain(|(c, _)| c.document != document);
        Ok(())
    }

    async fn chunk_count(&self) -> Result<i64, PipelineError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        Ok(chunks.len() as i64)
    }
}

#[async_trait]
impl FingerprintStore for InMemoryStore {
    async fn persisted_fingerprints(&self) -> Result<HashMap<String, String>, PipelineError> {
        let fps = self
            .fingerprints
            .read()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        Ok(fps.clone())
    }

    async fn commit(&self, document: &str, fingerprint: &str) -> Result<(), PipelineError> {
        let mut fps = self
            .fingerprints
            .write()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        fps.insert(document.to_string(), fingerprint.to_string());
        Ok(())
    }

    async fn clear(&self, document: &str) -> Result<(), PipelineError> {
        let mut fps = self
            .fingerprints
            .write()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        fps.remove(document);
        Ok(())
    }

    async fn document_count(&self) -> Result<i64, PipelineError> {
        let fps = self
            .fingerprints
            .read()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        Ok(fps.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, document: &str, index: i64) -> Chunk {
        Chunk {
            id: id.to_string(),
            document: document.to_string(),
            fingerprint: "fp".to_string(),
            chunk_index: index,
            text: format!("text {id}"),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .store_chunks(&[
                (chunk("near", "a.txt", 0), Some(vec![1.0, 0.0])),
                (chunk("far", "a.txt", 1), Some(vec![0.0, 1.0])),
                (chunk("no-vec", "a.txt", 2), None),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].passage.chunk_id, "near");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn search_down_is_search_unavailable() {
        let store = InMemoryStore::new();
        store.set_search_down(true);
        let err = store.search(&[1.0], 10).await.unwrap_err();
        assert!(matches!(err, PipelineError::SearchUnavailable(_)));
    }

    #[tokio::test]
    async fn delete_document_removes_its_chunks_only() {
        let store = InMemoryStore::new();
        store
            .store_chunks(&[
                (chunk("c1", "a.txt", 0), None),
                (chunk("c2", "b.txt", 0), None),
            ])
            .await
            .unwrap();

        store.delete_document("a.txt").await.unwrap();
        let passages = store.all_passages().await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].document, "b.txt");
    }

    #[tokio::test]
    async fn commit_overwrites_fingerprint() {
        let store = InMemoryStore::new();
        store.commit("a.txt", "fp1").await.unwrap();
        store.commit("a.txt", "fp2").await.unwrap();
        let fps = store.persisted_fingerprints().await.unwrap();
        assert_eq!(fps.get("a.txt").map(String::as_str), Some("fp2"));
        assert_eq!(store.document_count().await.unwrap(), 1);
    }
}
