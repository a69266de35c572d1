//! Indexing pipeline orchestration.
//!
//! Coordinates the full indexing flow: corpus scan → fingerprint plan →
//! extraction → chunking → embedding → storage → fingerprint commit.
//! Failures are isolated per document: one corrupt file records a failure
//! and the run moves on. A document's fingerprint is committed only after
//! all of its chunks are stored, so interrupted or failed documents are
//! retried on the next run.
//!
//! An embedding provider failure mid-run is a per-document failure like any
//! other: the document is skipped without committing, so it is retried once
//! the provider recovers. Only a provider disabled by configuration stores
//! chunks without vectors (lexical-only corpus, reported as pending).

use anyhow::Result;

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::corpus::scan_corpus;
use crate::db;
use crate::embedding::{create_embedder, Embedder};
use crate::error::PipelineError;
use crate::extract::{DefaultExtractor, Extractor};
use crate::fingerprint::{plan, PlannedDocument};
use crate::migrate::apply_schema;
use crate::models::Chunk;
use crate::sqlite_store::SqliteStore;
use crate::store::{FingerprintStore, VectorStore};

/// Collaborator handles for one indexing run.
pub struct IndexContext<'a> {
    pub extractor: &'a dyn Extractor,
    pub embedder: &'a dyn Embedder,
    pub vectors: &'a dyn VectorStore,
    pub fingerprints: &'a dyn FingerprintStore,
}

/// A per-document failure recorded during a run.
#[derive(Debug)]
pub struct DocFailure {
    pub document: String,
    pub error: PipelineError,
}

/// Counters for one indexing run.
#[derive(Debug, Default)]
pub struct IndexOutcome {
    /// Documents fully indexed and committed this run.
    pub indexed: u64,
    /// Documents skipped because their fingerprint was unchanged.
    pub skipped: u64,
    /// Chunks written to storage this run.
    pub chunks_stored: u64,
    /// Chunks stored without an embedding (provider disabled by config).
    pub embeddings_pending: u64,
    /// Documents that failed; their fingerprints were not committed.
    pub failures: Vec<DocFailure>,
}

/// Options controlling one indexing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Re-index every document regardless of fingerprint.
    pub force: bool,
    /// Index at most this many changed documents.
    pub limit: Option<usize>,
}

/// Index the given documents against the persisted fingerprint state.
///
/// Reading the persisted fingerprints is the only step that fails the
/// whole run; everything after is isolated per document.
pub async fn index_documents(
    ctx: &IndexContext<'_>,
    docs: Vec<crate::models::SourceDocument>,
    config: &Config,
    options: IndexOptions,
) -> Result<IndexOutcome, PipelineError> {
    let persisted = ctx.fingerprints.persisted_fingerprints().await?;
    let mut index_plan = plan(docs, &persisted, options.force);

    if let Some(limit) = options.limit {
        index_plan.to_index.truncate(limit);
    }

    let mut outcome = IndexOutcome {
        skipped: index_plan.to_skip.len() as u64,
        ..Default::default()
    };

    for planned in index_plan.to_index {
        match index_one(ctx, &planned, config, &mut outcome).await {
            Ok(()) => outcome.indexed += 1,
            Err(error) => outcome.failures.push(DocFailure {
                document: planned.doc.rel_path.clone(),
                error,
            }),
        }
    }

    Ok(outcome)
}

/// Index a single planned document end to end. Any error leaves the
/// document's persisted fingerprint untouched.
async fn index_one(
    ctx: &IndexContext<'_>,
    planned: &PlannedDocument,
    config: &Config,
    outcome: &mut IndexOutcome,
) -> Result<(), PipelineError> {
    let text = ctx.extractor.extract(&planned.doc)?;

    let chunks = chunk_document(
        &planned.doc.rel_path,
        &planned.fingerprint,
        &text,
        config.chunking.max_tokens,
    );
    if chunks.is_empty() {
        return Err(PipelineError::ExtractionFailed(
            "document produced no chunks".to_string(),
        ));
    }

    for chunk in &chunks {
        if chunk.fingerprint != planned.fingerprint {
            return Err(PipelineError::FingerprintMismatch {
                document: planned.doc.rel_path.clone(),
                expected: planned.fingerprint.clone(),
                found: chunk.fingerprint.clone(),
            });
        }
    }

    // Purge any chunks from a previous version of this document before
    // the new ones land, and forget its committed fingerprint so a
    // failure below leaves the document marked for retry.
    ctx.vectors.delete_document(&planned.doc.rel_path).await?;
    ctx.fingerprints.clear(&planned.doc.rel_path).await?;

    let mut stored = 0u64;
    let mut pending = 0u64;

    for batch in chunks.chunks(config.indexing.batch_size) {
        let rows: Vec<(Chunk, Option<Vec<f32>>)> = if config.embedding.is_enabled() {
            // Any embedding failure fails this document; no fingerprint
            // was committed, so the document is retried next run.
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vecs = ctx.embedder.embed_batch(&texts).await?;
            if vecs.len() != batch.len() {
                return Err(PipelineError::EmbeddingMismatch {
                    expected: batch.len(),
                    found: vecs.len(),
                });
            }
            batch.iter().cloned().zip(vecs.into_iter().map(Some)).collect()
        } else {
            pending += batch.len() as u64;
            batch.iter().map(|c| (c.clone(), None)).collect()
        };

        ctx.vectors.store_chunks(&rows).await?;
        stored += rows.len() as u64;
    }

    // All chunks are durable; the fingerprint may now advance.
    ctx.fingerprints
        .commit(&planned.doc.rel_path, &planned.fingerprint)
        .await?;

    outcome.chunks_stored += stored;
    outcome.embeddings_pending += pending;
    Ok(())
}

/// CLI entry point: scan the corpus, index it, and print a summary.
pub async fn run_index(
    config: &Config,
    force: bool,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let docs = scan_corpus(&config.corpus)?;

    let pool = db::open(&config.db).await?;
    apply_schema(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    if dry_run {
        let persisted = store.persisted_fingerprints().await?;
        let index_plan = plan(docs, &persisted, force);
        println!("index {} (dry-run)", config.corpus.root.display());
        println!("  documents found: {}", index_plan.to_index.len() + index_plan.to_skip.len());
        println!("  to index: {}", index_plan.to_index.len());
        println!("  skipped (unchanged): {}", index_plan.to_skip.len());
        pool.close().await;
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    let ctx = IndexContext {
        extractor: &DefaultExtractor,
        embedder: embedder.as_ref(),
        vectors: &store,
        fingerprints: &store,
    };

    let outcome = index_documents(&ctx, docs, config, IndexOptions { force, limit }).await?;

    for failure in &outcome.failures {
        eprintln!("Warning: {}: {}", failure.document, failure.error);
    }

    println!("index {}", config.corpus.root.display());
    println!("  indexed: {}", outcome.indexed);
    println!("  skipped (unchanged): {}", outcome.skipped);
    println!("  chunks stored: {}", outcome.chunks_stored);
    if outcome.embeddings_pending > 0 {
        println!("  embeddings pending: {}", outcome.embeddings_pending);
    }
    if !outcome.failures.is_empty() {
        println!("  failed: {}", outcome.failures.len());
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
