//! Failure taxonomy for the indexing and query pipelines.
//!
//! Every collaborator (extractor, embedder, vector store, pairwise model,
//! fingerprint store) fails with a [`PipelineError`] variant, so orchestrators
//! can match on the variant and apply the documented degradation path instead
//! of treating all failures alike.

use thiserror::Error;

/// A failure from one of the pipeline's collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction failed for a source document (corrupt file, scanned
    /// PDF with no extractable text). Skips that document, never the run.
    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    /// The embedding provider could not produce vectors (rate limit, auth,
    /// network, or provider disabled).
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The embedding provider returned a different number of vectors than
    /// texts submitted. Contract violation, not an outage; the document is
    /// skipped and its fingerprint not committed.
    #[error("embedding batch mismatch: {expected} texts, {found} vectors")]
    EmbeddingMismatch { expected: usize, found: usize },

    /// The vector similarity search backend is unreachable. Queries degrade
    /// to lexical-only scoring.
    #[error("similarity search unavailable: {0}")]
    SearchUnavailable(String),

    /// The pairwise relevance model is not loaded or failed to respond.
    /// Re-ranking passes the fused ordering through unchanged.
    #[error("pairwise relevance model unavailable: {0}")]
    ModelUnavailable(String),

    /// Persisting chunks or fingerprints failed. The affected document's
    /// fingerprint is not committed, so it is retried on the next run.
    #[error("storage failed: {0}")]
    StorageFailed(String),

    /// A chunk carried a different fingerprint than its parent document.
    /// Internal consistency check; treated like a storage failure (the
    /// document's fingerprint must not be committed).
    #[error("fingerprint mismatch for {document}: expected {expected}, found {found}")]
    FingerprintMismatch {
        document: String,
        expected: String,
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = PipelineError::ExtractionFailed("bad xref table".into());
        assert!(err.to_string().contains("bad xref table"));
    }

    #[test]
    fn fingerprint_mismatch_names_document() {
        let err = PipelineError::FingerprintMismatch {
            document: "report.pdf".into(),
            expected: "aaa".into(),
            found: "bbb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("report.pdf"));
        assert!(msg.contains("aaa"));
        assert!(msg.contains("bbb"));
    }
}
