//! Text extraction from source documents.
//!
//! The [`Extractor`] trait is the pipeline's boundary to document parsing:
//! bytes plus a content type in, plain UTF-8 text out. The default
//! implementation handles PDF (via `pdf-extract`) and plain-text formats;
//! anything else is an extraction failure for that document only.

use crate::error::PipelineError;
use crate::models::SourceDocument;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Extracts plain text from a source document.
///
/// Implementations must be pure with respect to the document: the same
/// bytes always yield the same text (or the same failure).
pub trait Extractor: Send + Sync {
    fn extract(&self, doc: &SourceDocument) -> Result<String, PipelineError>;
}

/// Content-type based extractor for PDF and plain-text documents.
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(&self, doc: &SourceDocument) -> Result<String, PipelineError> {
        let text = match doc.content_type.as_str() {
            MIME_PDF => pdf_extract::extract_text_from_mem(&doc.bytes)
                .map_err(|e| PipelineError::ExtractionFailed(e.to_string()))?,
            MIME_TEXT | MIME_MARKDOWN => String::from_utf8_lossy(&doc.bytes).into_owned(),
            other => {
                return Err(PipelineError::ExtractionFailed(format!(
                    "unsupported content type: {other}"
                )))
            }
        };

        // A structurally valid but image-only PDF extracts to nothing;
        // without OCR the document cannot be indexed.
        if text.trim().is_empty() {
            return Err(PipelineError::ExtractionFailed(
                "no extractable text (scanned or empty document)".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Guess the MIME content type from a file extension.
pub fn content_type_for(rel_path: &str) -> &'static str {
    let ext = rel_path.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => MIME_PDF,
        "md" => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}
