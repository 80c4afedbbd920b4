//! PDF text extraction.
//!
//! Extraction sits behind the [`TextExtractor`] trait so the pipeline can be
//! exercised without real PDF files. The shipped implementation,
//! [`PdfExtractor`], reads the file and hands the bytes to `pdf-extract`,
//! then normalizes whitespace and strips control characters that tend to
//! leak out of PDF text streams.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Produces plain text from a source document on disk.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document at `path`.
    ///
    /// Returns [`PipelineError::Extraction`] when the document cannot be
    /// parsed. An empty or whitespace-only result is returned as-is; the
    /// caller decides whether that is fatal.
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// PDF extractor backed by the `pdf-extract` crate.
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "extracting PDF text");

        // pdf-extract is synchronous and CPU-bound; keep it off the runtime.
        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PipelineError::Extraction(format!("extraction task failed: {e}")))?
            .map_err(|e| PipelineError::Extraction(format!("PDF parsing failed: {e}")))?;

        let text = clean_text(&raw);
        info!(
            path = %path.display(),
            chars = text.chars().count(),
            "extracted PDF text"
        );
        Ok(text)
    }
}

/// Collapse runs of whitespace to single spaces, preserving paragraph breaks,
/// and drop non-printable control characters.
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for paragraph in raw.split("\n\n") {
        let printable: String = paragraph
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let cleaned = printable.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&cleaned);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_whitespace_within_paragraphs() {
        let raw = "Some   text\twith \u{0} odd\nspacing.";
        assert_eq!(clean_text(raw), "Some text with odd spacing.");
    }

    #[test]
    fn clean_preserves_paragraph_breaks() {
        let raw = "First  paragraph.\n\n\n\nSecond\nparagraph.";
        assert_eq!(clean_text(raw), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn clean_of_whitespace_only_is_empty() {
        assert_eq!(clean_text(" \n \t \n\n  "), "");
    }

    #[tokio::test]
    async fn invalid_pdf_reports_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let err = PdfExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }

    #[tokio::test]
    async fn missing_file_reports_io_error() {
        let err = PdfExtractor
            .extract(Path::new("/nonexistent/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
