//! Pairwise re-ranking of fused candidates.
//!
//! A [`PairwiseScorer`] scores `(query, passage)` pairs with a relevance
//! model; [`rerank`] applies it to the top of the fused candidate list and
//! re-orders by the model's scores. When the model is unavailable or fails
//! mid-query, the fused ordering passes through unchanged — re-ranking is
//! an enhancement, never a gate.
//!
//! Implementations:
//! - **[`DisabledReranker`]** — never available; every query passes through.
//! - **[`HttpReranker`]** — POSTs to a TEI-style `/rerank` endpoint.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::RerankConfig;
use crate::error::PipelineError;
use crate::models::Candidate;

/// Passages are truncated to this many characters before being sent to the
/// relevance model; pairwise models have tight input windows and the head
/// of a chunk carries most of its signal.
const MAX_PASSAGE_CHARS: usize = 512;

/// A pairwise relevance model: one score per `(query, passage)` pair,
/// higher meaning more relevant. Scores are only compared with each other
/// within a single query.
#[async_trait]
pub trait PairwiseScorer: Send + Sync {
    /// Whether the model is configured and expected to respond.
    fn is_available(&self) -> bool;
    /// Score each passage against the query, in input order.
    async fn score_pairs(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f64>, PipelineError>;
}

/// Re-rank the top `top_n` fused candidates and return the final `top_k`.
///
/// Candidates beyond `top_n` are discarded before scoring. If the scorer is
/// unavailable or fails, the fused ordering is kept and the first `top_k`
/// candidates are returned with `rerank_score` unset; the failure is
/// reported alongside so the caller can surface the degradation.
pub async fn rerank(
    scorer: &dyn PairwiseScorer,
    query: &str,
    mut candidates: Vec<Candidate>,
    top_n: usize,
    top_k: usize,
) -> (Vec<Candidate>, Option<PipelineError>) {
    candidates.truncate(top_n);

    if !scorer.is_available() {
        candidates.truncate(top_k);
        return (
            candidates,
            Some(PipelineError::ModelUnavailable(
                "pairwise relevance model is not configured".to_string(),
            )),
        );
    }

    let passages: Vec<String> = candidates
        .iter()
        .map(|c| truncate_passage(&c.passage.text))
        .collect();

    match scorer.score_pairs(query, &passages).await {
        Ok(scores) if scores.len() == candidates.len() => {
            for (candidate, score) in candidates.iter_mut().zip(scores) {
                candidate.rerank_score = Some(score);
            }
            // Stable sort: model-score ties keep the fused ordering.
            candidates.sort_by(|a, b| {
                b.final_score()
                    .partial_cmp(&a.final_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            candidates.truncate(top_k);
            (candidates, None)
        }
        Ok(scores) => {
            candidates.truncate(top_k);
            (
                candidates,
                Some(PipelineError::ModelUnavailable(format!(
                    "model returned {} scores for {} passages",
                    scores.len(),
                    passages.len()
                ))),
            )
        }
        Err(err) => {
            candidates.truncate(top_k);
            (candidates, Some(err))
        }
    }
}

/// Truncate a passage to [`MAX_PASSAGE_CHARS`], snapping to a char boundary.
fn truncate_passage(text: &str) -> String {
    if text.len() <= MAX_PASSAGE_CHARS {
        return text.to_string();
    }
    let mut cut = MAX_PASSAGE_CHARS;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text[..cut].to_string()
}

// ============ Disabled reranker ============

/// Used when `rerank.provider = "disabled"`.
pub struct DisabledReranker;

#[async_trait]
impl PairwiseScorer for DisabledReranker {
    fn is_available(&self) -> bool {
        false
    }
    async fn score_pairs(
        &self,
        _query: &str,
        _passages: &[String],
    ) -> Result<Vec<f64>, PipelineError> {
        Err(PipelineError::ModelUnavailable(
            "pairwise relevance model is disabled".to_string(),
        ))
    }
}

// ============ HTTP reranker ============

/// Scorer backed by a TEI-style HTTP `/rerank` endpoint.
///
/// Sends `{"query": ..., "texts": [...]}` (plus `"model"` when configured)
/// and expects `[{"index": n, "score": s}, ...]` back.
pub struct HttpReranker {
    endpoint: String,
    model: Option<String>,
    client: reqwest::Client,
}

impl HttpReranker {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("rerank.endpoint required for http provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            client,
        })
    }
}

#[async_trait]
impl PairwiseScorer for HttpReranker {
    fn is_available(&self) -> bool {
        true
    }

    async fn score_pairs(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f64>, PipelineError> {
        let mut body = serde_json::json!({
            "query": query,
            "texts": passages,
        });
        if let Some(model) = &self.model {
            body["model"] = serde_json::Value::String(model.clone());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::ModelUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::ModelUnavailable(format!(
                "rerank endpoint returned {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::ModelUnavailable(format!("invalid rerank response: {e}")))?;

        parse_rerank_response(&json, passages.len())
    }
}

/// Parse a `[{"index": n, "score": s}, ...]` response into per-passage
/// scores in input order.
fn parse_rerank_response(json: &serde_json::Value, count: usize) -> Result<Vec<f64>, PipelineError> {
    let items = json.as_array().ok_or_else(|| {
        PipelineError::ModelUnavailable("invalid rerank response: expected array".to_string())
    })?;

    let mut scores = vec![0.0f64; count];
    let mut covered = vec![false; count];

    for item in items {
        let index = item.get("index").and_then(|i| i.as_u64()).ok_or_else(|| {
            PipelineError::ModelUnavailable("invalid rerank response: missing index".to_string())
        })? as usize;
        let score = item.get("score").and_then(|s| s.as_f64()).ok_or_else(|| {
            PipelineError::ModelUnavailable("invalid rerank response: missing score".to_string())
        })?;

        if index >= count {
            return Err(PipelineError::ModelUnavailable(format!(
                "invalid rerank response: index {index} out of range"
            )));
        }
        if covered[index] {
            return Err(PipelineError::ModelUnavailable(format!(
                "invalid rerank response: duplicate index {index}"
            )));
        }
        scores[index] = score;
        covered[index] = true;
    }

    if let Some(missing) = covered.iter().position(|c| !c) {
        return Err(PipelineError::ModelUnavailable(format!(
            "rerank response missing a score for passage {missing}"
        )));
    }

    Ok(scores)
}

/// Create the [`PairwiseScorer`] named by the configuration.
pub fn create_reranker(config: &RerankConfig) -> Result<Box<dyn PairwiseScorer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledReranker)),
        "http" => Ok(Box::new(HttpReranker::new(config)?)),
        other => bail!("Unknown rerank provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;

    struct FixedScorer(Vec<f64>);

    #[async_trait]
    impl PairwiseScorer for FixedScorer {
        fn is_available(&self) -> bool {
            true
        }
        async fn score_pairs(
            &self,
            _query: &str,
            _passages: &[String],
        ) -> Result<Vec<f64>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl PairwiseScorer for FailingScorer {
        fn is_available(&self) -> bool {
            true
        }
        async fn score_pairs(
            &self,
            _query: &str,
            _passages: &[String],
        ) -> Result<Vec<f64>, PipelineError> {
            Err(PipelineError::ModelUnavailable("connection refused".into()))
        }
    }

    fn candidate(chunk_id: &str, fused: f64) -> Candidate {
        Candidate {
            passage: Passage {
                chunk_id: chunk_id.to_string(),
                document: "doc.txt".to_string(),
                chunk_index: 0,
                text: format!("text of {chunk_id}"),
            },
            lexical_score: 0.0,
            vector_score: 0.0,
            fused_score: fused,
            rerank_score: None,
        }
    }

    #[tokio::test]
    async fn model_scores_reorder_candidates() {
        let candidates = vec![candidate("a", 0.9), candidate("b", 0.5)];
        let scorer = FixedScorer(vec![0.1, 0.8]);
        let (ranked, degraded) = rerank(&scorer, "q", candidates, 10, 10).await;
        assert!(degraded.is_none());
        assert_eq!(ranked[0].passage.chunk_id, "b");
        assert_eq!(ranked[0].rerank_score, Some(0.8));
        assert_eq!(ranked[1].passage.chunk_id, "a");
    }

    #[tokio::test]
    async fn unavailable_model_passes_fused_order_through() {
        let candidates = vec![candidate("a", 0.9), candidate("b", 0.5)];
        let (ranked, degraded) = rerank(&DisabledReranker, "q", candidates, 10, 10).await;
        assert!(matches!(
            degraded,
            Some(PipelineError::ModelUnavailable(_))
        ));
        assert_eq!(ranked[0].passage.chunk_id, "a");
        assert!(ranked[0].rerank_score.is_none());
    }

    #[tokio::test]
    async fn mid_query_failure_passes_through() {
        let candidates = vec![candidate("a", 0.9), candidate("b", 0.5)];
        let (ranked, degraded) = rerank(&FailingScorer, "q", candidates, 10, 10).await;
        assert!(degraded.is_some());
        assert_eq!(ranked[0].passage.chunk_id, "a");
    }

    #[tokio::test]
    async fn only_top_n_are_scored_and_top_k_returned() {
        let candidates = vec![
            candidate("a", 0.9),
            candidate("b", 0.8),
            candidate("c", 0.7),
        ];
        // Scores for the two survivors of top_n = 2.
        let scorer = FixedScorer(vec![0.2, 0.9]);
        let (ranked, degraded) = rerank(&scorer, "q", candidates, 2, 1).await;
        assert!(degraded.is_none());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].passage.chunk_id, "b");
    }

    #[tokio::test]
    async fn score_count_mismatch_degrades() {
        let candidates = vec![candidate("a", 0.9), candidate("b", 0.5)];
        let scorer = FixedScorer(vec![0.2]);
        let (ranked, degraded) = rerank(&scorer, "q", candidates, 10, 10).await;
        assert!(degraded.is_some());
        assert_eq!(ranked[0].passage.chunk_id, "a");
        assert!(ranked[0].rerank_score.is_none());
    }

    #[test]
    fn passage_truncation_respects_char_boundaries() {
        let long = "é".repeat(600);
        let cut = truncate_passage(&long);
        assert!(cut.len() <= MAX_PASSAGE_CHARS);
        assert!(cut.chars().all(|c| c == 'é'));

        let short = "short passage";
        assert_eq!(truncate_passage(short), short);
    }

    #[test]
    fn parse_response_orders_by_index() {
        let json = serde_json::json!([
            { "index": 1, "score": 0.9 },
            { "index": 0, "score": 0.2 },
        ]);
        let scores = parse_rerank_response(&json, 2).unwrap();
        assert_eq!(scores, vec![0.2, 0.9]);
    }

    #[test]
    fn parse_response_incomplete_is_error() {
        let json = serde_json::json!([{ "index": 0, "score": 0.2 }]);
        assert!(parse_rerank_response(&json, 2).is_err());
    }

    #[test]
    fn parse_response_duplicate_index_is_error() {
        // Two entries for passage 0 must not pass for passage 1's score.
        let json = serde_json::json!([
            { "index": 0, "score": 0.9 },
            { "index": 0, "score": 0.2 },
        ]);
        let err = parse_rerank_response(&json, 2).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
        assert!(err.to_string().contains("duplicate index 0"));
    }
}
