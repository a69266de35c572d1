//! Core data models that flow through the indexing and query pipelines.

use serde::Serialize;
use std::path::PathBuf;

/// A source document discovered on disk, before extraction.
///
/// Identity is the path relative to the corpus root (`rel_path`); the
/// content fingerprint is computed separately over `bytes` and is the sole
/// change-detection key. Identity and fingerprint are deliberately distinct
/// fields so a renamed file is a new identity, not a silent collision.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the corpus root; the document's logical identity.
    pub rel_path: String,
    /// Raw byte content.
    pub bytes: Vec<u8>,
    /// MIME content type guessed from the file extension.
    pub content_type: String,
}

/// A bounded span of a document's extracted text; the unit of embedding
/// and storage.
///
/// All chunks produced in one indexing pass carry the fingerprint their
/// document had at chunk-creation time. Chunk indices are zero-based and
/// contiguous per document.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk UUID.
    pub id: String,
    /// Parent document identity (corpus-relative path).
    pub document: String,
    /// Content fingerprint of the parent document at chunk-creation time.
    pub fingerprint: String,
    /// Zero-based position within the document.
    pub chunk_index: i64,
    /// The chunk's text span.
    pub text: String,
}

/// A stored passage as returned by the store: chunk content plus the
/// metadata needed for downstream attribution.
#[derive(Debug, Clone)]
pub struct Passage {
    /// Chunk UUID (storage identity).
    pub chunk_id: String,
    /// Parent document identity.
    pub document: String,
    /// Zero-based position within the document.
    pub chunk_index: i64,
    /// Chunk text.
    pub text: String,
}

/// A query-scoped candidate carrying per-branch and fused scores.
///
/// Created during fusion, enriched by re-ranking, discarded when the query
/// completes.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub passage: Passage,
    /// Lexical score in `[0, 1]`; `0.0` when the lexical branch did not
    /// see this passage.
    pub lexical_score: f64,
    /// Cosine similarity from the vector branch; `0.0` when absent.
    pub vector_score: f64,
    /// `keyword_weight * lexical + (1 - keyword_weight) * vector`.
    pub fused_score: f64,
    /// Pairwise relevance score, set by the re-ranker when it ran.
    pub rerank_score: Option<f64>,
}

/// A final ranked passage handed to the caller (and ultimately to the
/// answer-generation collaborator).
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    /// Source document identity (corpus-relative path).
    pub document: String,
    /// Zero-based chunk position within the document.
    pub chunk_index: i64,
    /// Passage text.
    pub content: String,
    /// Final score: the re-rank score when re-ranking ran, the fused score
    /// otherwise.
    pub score: f64,
}

impl Candidate {
    /// The score that decides this candidate's final rank.
    pub fn final_score(&self) -> f64 {
        self.rerank_score.unwrap_or(self.fused_score)
    }

    pub fn into_ranked(self) -> RankedResult {
        let score = self.final_score();
        RankedResult {
            document: self.passage.document,
            chunk_index: self.passage.chunk_index,
            content: self.passage.text,
            score,
        }
    }
}
