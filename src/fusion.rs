//! Hybrid fusion of lexical and vector branch scores.
//!
//! Merges the two candidate sets as a union — a passage found by only one
//! branch still participates, with the missing branch's score treated as
//! `0.0` — and ranks by the weighted sum
//! `fused = keyword_weight * lexical + (1 - keyword_weight) * vector`.
//!
//! Ordering is fully deterministic: descending fused score, ties broken by
//! the higher raw vector score (the semantically richer signal), remaining
//! ties by insertion order (lexical branch first), preserved by the stable
//! sort.

use std::collections::HashMap;

use crate::models::{Candidate, Passage};

/// One branch's score for a passage.
#[derive(Debug, Clone)]
pub struct BranchScore {
    pub passage: Passage,
    pub score: f64,
}

/// Fuse lexical and vector branch scores into a ranked candidate list.
///
/// `keyword_weight` must be in `[0.0, 1.0]`; the vector weight is its
/// complement. At `1.0` the output ranking is the pure lexical ranking,
/// at `0.0` the pure vector ranking.
pub fn fuse(
    lexical: Vec<BranchScore>,
    vector: Vec<BranchScore>,
    keyword_weight: f64,
) -> Vec<Candidate> {
    let vector_weight = 1.0 - keyword_weight;

    // Union in first-seen order, keyed by storage identity.
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Candidate> = HashMap::new();

    for b in lexical {
        let key = b.passage.chunk_id.clone();
        merged.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Candidate {
                passage: b.passage,
                lexical_score: b.score,
                vector_score: 0.0,
                fused_score: 0.0,
                rerank_score: None,
            }
        });
    }

    for b in vector {
        match merged.get_mut(&b.passage.chunk_id) {
            Some(candidate) => candidate.vector_score = b.score,
            None => {
                let key = b.passage.chunk_id.clone();
                order.push(key.clone());
                merged.insert(
                    key,
                    Candidate {
                        passage: b.passage,
                        lexical_score: 0.0,
                        vector_score: b.score,
                        fused_score: 0.0,
                        rerank_score: None,
                    },
                );
            }
        }
    }

    let mut candidates: Vec<Candidate> = order
        .into_iter()
        .map(|key| {
            let mut c = merged.remove(&key).expect("candidate for ordered key");
            c.fused_score = keyword_weight * c.lexical_score + vector_weight * c.vector_score;
            c
        })
        .collect();

    // Vec::sort_by is stable, so insertion order survives full ties.
    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.vector_score
                    .partial_cmp(&a.vector_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    candidates
}
