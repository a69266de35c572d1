//! In-process lexical scoring of passages against a query.
//!
//! Deterministic and stateless: no index, no network, so the lexical branch
//! keeps working when the vector backend is down. Both sides are normalized
//! (lowercased, diacritics stripped, stopwords removed), tokenized on word
//! boundaries, and scored as a weighted blend of exact term overlap and a
//! fuzzy bonus for near-matches (morphological variants like "indexing" vs
//! "indexed" without a full stemmer).
//!
//! Scores are always in `[0.0, 1.0]`.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Weight of exact term overlap in the final score.
const EXACT_WEIGHT: f64 = 0.7;
/// Weight of the fuzzy/partial-match bonus.
const FUZZY_WEIGHT: f64 = 0.3;
/// Jaro-Winkler threshold above which two tokens count as a near-match.
/// Calibrated so suffix variants ("indexing"/"indexed" ≈ 0.87) pass while
/// unrelated words stay well below.
const NEAR_MATCH_THRESHOLD: f64 = 0.85;
/// Minimum token length for substring containment to count as a match.
const SUBSTRING_MIN_LEN: usize = 4;
/// Tokens shorter than this are dropped during normalization.
const MIN_TOKEN_LEN: usize = 3;

/// French + English stopwords removed before scoring.
///
/// The French set mirrors the accent-stripped forms produced by
/// [`normalize`] (e.g. `etre`, `etes`).
const STOPWORDS: &[&str] = &[
    // French
    "les", "une", "des", "aux", "est", "sont", "suis", "sommes", "etes", "etre", "avoir", "que",
    "qui", "quoi", "dont", "cet", "cette", "ces", "mon", "ton", "son", "mes", "tes", "ses",
    "notre", "votre", "leur", "nos", "vos", "leurs", "nous", "vous", "ils", "elles", "elle",
    "mais", "donc", "car", "quel", "quelle", "quels", "quelles", "sur", "sous", "dans", "par",
    "pour", "avec", "sans", "comme", "plus", "moins", "tres", "tout", "tous", "toute", "toutes",
    // English
    "the", "and", "for", "are", "was", "were", "with", "that", "this", "these", "those", "from",
    "has", "have", "had", "not", "but", "what", "which", "who", "whom", "how", "when", "where",
    "why", "its", "his", "her", "their", "our", "your", "you", "they", "she", "him", "them",
    "can", "could", "would", "should", "about", "into", "over", "under", "between", "does", "did",
];

/// Lexical scorer with a fixed stopword set.
pub struct LexicalScorer {
    stopwords: HashSet<String>,
}

impl LexicalScorer {
    /// Build a scorer with the built-in stopword set plus `extra` words
    /// (normalized before insertion, so accented config entries match).
    pub fn new(extra_stopwords: &[String]) -> Self {
        let mut stopwords: HashSet<String> = STOPWORDS.iter().map(|s| s.to_string()).collect();
        for word in extra_stopwords {
            stopwords.insert(normalize(word));
        }
        Self { stopwords }
    }

    /// Score `text` against `query`, returning a value in `[0.0, 1.0]`.
    ///
    /// The score blends (a) the fraction of query tokens present verbatim
    /// in the text and (b) a fuzzy bonus for query tokens that appear as
    /// substrings or Jaro-Winkler near-matches of text tokens. An empty
    /// query (after stopword removal) scores `0.0`.
    pub fn score(&self, query: &str, text: &str) -> f64 {
        let query_tokens = self.tokens(query);
        if query_tokens.is_empty() {
            return 0.0;
        }

        let text_tokens = self.tokens(text);
        if text_tokens.is_empty() {
            return 0.0;
        }
        let text_set: HashSet<&str> = text_tokens.iter().map(|t| t.as_str()).collect();

        let mut exact = 0usize;
        let mut fuzzy = 0usize;

        for token in &query_tokens {
            if text_set.contains(token.as_str()) {
                exact += 1;
            } else if text_tokens.iter().any(|t| near_match(token, t)) {
                fuzzy += 1;
            }
        }

        let total = query_tokens.len() as f64;
        EXACT_WEIGHT * (exact as f64 / total) + FUZZY_WEIGHT * (fuzzy as f64 / total)
    }

    /// Normalize and tokenize, dropping stopwords, short tokens, and
    /// duplicates (first occurrence kept).
    fn tokens(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut seen = HashSet::new();
        normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= MIN_TOKEN_LEN)
            .filter(|t| !self.stopwords.contains(*t))
            .filter(|t| seen.insert(t.to_string()))
            .map(|t| t.to_string())
            .collect()
    }
}

/// Lowercase and strip diacritics (NFD decomposition, combining marks
/// removed), so "Éléphant" matches "elephant".
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Whether a query token counts as a partial match of a text token:
/// either one contains the other (both long enough), or they are within
/// the Jaro-Winkler near-match threshold.
fn near_match(query_token: &str, text_token: &str) -> bool {
    if query_token.len() >= SUBSTRING_MIN_LEN && text_token.contains(query_token) {
        return true;
    }
    if text_token.len() >= SUBSTRING_MIN_LEN && query_token.contains(text_token) {
        return true;
    }
    strsim::jaro_winkler(query_token, text_token) >= NEAR_MATCH_THRESHOLD
}
