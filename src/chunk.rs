//! Paragraph-boundary text chunker.
//!
//! Splits extracted document text into [`Chunk`]s that respect a
//! configurable `max_tokens` limit, splitting on `\n\n` boundaries to keep
//! paragraphs intact where possible. Every chunk is stamped with the parent
//! document's identity and the fingerprint computed for this indexing pass,
//! and chunk indices are zero-based and contiguous.
//!
//! An empty or whitespace-only document produces no chunks; the indexing
//! orchestrator records that as an extraction failure.

use uuid::Uuid;

use crate::models::Chunk;

/// Approximate characters-per-token ratio used to convert the configured
/// token budget into a character budget.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into fingerprint-stamped chunks for one document.
pub fn chunk_document(document: &str, fingerprint: &str, text: &str, max_tokens: usize) -> Vec<Chunk> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buf = String::new();

    let flush = |buf: &mut String, chunks: &mut Vec<Chunk>| {
        if !buf.is_empty() {
            chunks.push(make_chunk(document, fingerprint, chunks.len() as i64, buf));
            buf.clear();
        }
    };

    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }

        let appended_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if appended_len > max_chars {
            flush(&mut buf, &mut chunks);
        }

        if para.len() > max_chars {
            // Oversized paragraph: hard-split at whitespace boundaries.
            for piece in split_oversized(para, max_chars) {
                chunks.push(make_chunk(document, fingerprint, chunks.len() as i64, piece));
            }
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(para);
        }
    }
    flush(&mut buf, &mut chunks);

    chunks
}

/// Split a paragraph longer than `max_chars` into pieces, preferring the
/// last space or newline before the limit and never splitting inside a
/// UTF-8 character.
fn split_oversized(para: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut remaining = para;

    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            pieces.push(remaining);
            break;
        }

        let mut cut = max_chars;
        while cut > 0 && !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        if let Some(ws) = remaining[..cut].rfind([' ', '\n']) {
            if ws > 0 {
                cut = ws + 1;
            }
        }
        if cut == 0 {
            // A single char wider than the budget; take it whole.
            cut = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }

        let (piece, rest) = remaining.split_at(cut);
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        remaining = rest.trim_start();
    }

    pieces
}

fn make_chunk(document: &str, fingerprint: &str, index: i64, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document: document.to_string(),
        fingerprint: fingerprint.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}
