//! Query pipeline orchestration.
//!
//! Runs the full retrieval flow: query embedding → vector search → lexical
//! scoring → fusion → pairwise re-ranking. Each stage degrades rather than
//! fails: an unavailable embedder or search backend drops the vector branch
//! (lexical weight becomes 1.0), an unavailable relevance model passes the
//! fused ordering through. Degradations are collected as warnings so the
//! caller can surface them without losing the answer.

use anyhow::Result;

use crate::config::{Config, LexicalScope};
use crate::db;
use crate::embedding::{create_embedder, embed_query, Embedder};
use crate::error::PipelineError;
use crate::fusion::{fuse, BranchScore};
use crate::lexical::LexicalScorer;
use crate::migrate::apply_schema;
use crate::models::RankedResult;
use crate::rerank::{create_reranker, rerank, PairwiseScorer};
use crate::sqlite_store::SqliteStore;
use crate::store::VectorStore;

/// Collaborator handles for one query.
pub struct QueryContext<'a> {
    pub embedder: &'a dyn Embedder,
    pub scorer: &'a dyn PairwiseScorer,
    pub vectors: &'a dyn VectorStore,
}

/// Final results plus any degradations encountered along the way.
#[derive(Debug)]
pub struct QueryOutcome {
    pub results: Vec<RankedResult>,
    pub warnings: Vec<String>,
}

/// Answer a query against the stored corpus.
pub async fn query_corpus(
    ctx: &QueryContext<'_>,
    config: &Config,
    query: &str,
) -> Result<QueryOutcome, PipelineError> {
    let retrieval = &config.retrieval;
    let mut warnings = Vec::new();

    // Vector branch: query embedding then similarity search. Either step
    // being unavailable drops the branch; the query continues lexically.
    let vector_hits = match embed_query(ctx.embedder, query).await {
        Ok(query_vec) => match ctx.vectors.search(&query_vec, retrieval.candidate_k).await {
            Ok(hits) => hits,
            Err(PipelineError::SearchUnavailable(reason)) => {
                warnings.push(format!("similarity search unavailable ({reason}); lexical-only results"));
                Vec::new()
            }
            Err(other) => return Err(other),
        },
        Err(PipelineError::EmbeddingUnavailable(reason)) => {
            warnings.push(format!("embedding unavailable ({reason}); lexical-only results"));
            Vec::new()
        }
        Err(other) => return Err(other),
    };

    // With no vector branch the lexical weight is effectively 1.0 and the
    // candidates scope would score nothing, so widen to the whole corpus.
    let keyword_weight = if vector_hits.is_empty() {
        1.0
    } else {
        retrieval.keyword_weight
    };

    let scorer = LexicalScorer::new(&retrieval.extra_stopwords);
    let lexical = match retrieval.lexical_scope {
        LexicalScope::Candidates if !vector_hits.is_empty() => vector_hits
            .iter()
            .map(|hit| BranchScore {
                passage: hit.passage.clone(),
                score: scorer.score(query, &hit.passage.text),
            })
            .collect(),
        _ => {
            let passages = ctx.vectors.all_passages().await?;
            passages
                .into_iter()
                .filter_map(|passage| {
                    let score = scorer.score(query, &passage.text);
                    (score > 0.0).then_some(BranchScore { passage, score })
                })
                .collect::<Vec<_>>()
        }
    };

    let vector = vector_hits
        .into_iter()
        .map(|hit| BranchScore {
            passage: hit.passage,
            score: hit.similarity,
        })
        .collect();

    let candidates = fuse(lexical, vector, keyword_weight);

    let (ranked, degraded) = rerank(
        ctx.scorer,
        query,
        candidates,
        retrieval.rerank_top_n,
        retrieval.top_k,
    )
    .await;
    if ctx.scorer.is_available() {
        if let Some(err) = degraded {
            warnings.push(format!("{err}; returning fused ordering"));
        }
    }

    Ok(QueryOutcome {
        results: ranked.into_iter().map(|c| c.into_ranked()).collect(),
        warnings,
    })
}

/// CLI entry point: run a query and print ranked passages.
pub async fn run_query(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let mut config = config.clone();
    if let Some(k) = top_k {
        config.retrieval.top_k = k;
        config.retrieval.rerank_top_n = config.retrieval.rerank_top_n.max(k);
    }

    let pool = db::open(&config.db).await?;
    apply_schema(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    let embedder = create_embedder(&config.embedding)?;
    let scorer = create_reranker(&config.rerank)?;
    let ctx = QueryContext {
        embedder: embedder.as_ref(),
        scorer: scorer.as_ref(),
        vectors: &store,
    };

    let outcome = query_corpus(&ctx, &config, query).await?;

    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.results)?);
    } else if outcome.results.is_empty() {
        println!("No results.");
    } else {
        for (i, result) in outcome.results.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} #{}",
                i + 1,
                result.score,
                result.document,
                result.chunk_index
            );
            println!("    \"{}\"", excerpt(&result.content));
            println!();
        }
    }

    pool.close().await;
    Ok(())
}

/// One-line excerpt of a passage for terminal display.
fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.len() <= 160 {
        return flat.to_string();
    }
    let mut cut = 160;
    while cut > 0 && !flat.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &flat[..cut])
}
