//! Content fingerprinting and incremental indexing plans.
//!
//! A fingerprint is a SHA-256 digest over a document's full byte content and
//! is the sole change-detection key: file names, sizes, and mtimes never
//! participate. [`plan`] is a pure function — persisting a new fingerprint is
//! the indexing orchestrator's job, and only after storage succeeds.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::SourceDocument;

/// Compute the content fingerprint of a byte sequence (hex SHA-256).
///
/// Deterministic: identical bytes always produce identical fingerprints.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A document paired with the fingerprint computed for this indexing pass.
///
/// The fingerprint is computed once here and reused for every chunk, so a
/// file mutating mid-run cannot split a document across two fingerprints.
#[derive(Debug)]
pub struct PlannedDocument {
    pub doc: SourceDocument,
    pub fingerprint: String,
}

/// Partition of the corpus into documents needing (re-)indexing and
/// documents whose stored chunks are still current.
#[derive(Debug)]
pub struct IndexPlan {
    pub to_index: Vec<PlannedDocument>,
    pub to_skip: Vec<PlannedDocument>,
}

/// Decide which documents need (re-)indexing.
///
/// A document is skipped iff its current fingerprint equals the persisted
/// fingerprint for the same identity. New and modified documents both land
/// in `to_index` — either way the full chunk/embed/store pass is required.
/// With `force` set, every document is re-indexed regardless of fingerprint.
pub fn plan(
    docs: Vec<SourceDocument>,
    persisted: &HashMap<String, String>,
    force: bool,
) -> IndexPlan {
    let mut to_index = Vec::new();
    let mut to_skip = Vec::new();

    for doc in docs {
        let fp = fingerprint(&doc.bytes);
        let unchanged = !force && persisted.get(&doc.rel_path) == Some(&fp);
        let planned = PlannedDocument {
            doc,
            fingerprint: fp,
        };
        if unchanged {
            to_skip.push(planned);
        } else {
            to_index.push(planned);
        }
    }

    IndexPlan { to_index, to_skip }
}
