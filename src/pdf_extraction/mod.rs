// PDF extraction module
use async_trait::async_trait;

use crate::types::{DocumentParseError, ExtractedText, UploadedDocument};

pub mod basic;
pub mod lopdf_helper;

#[doc(hidden)]
pub mod fixtures;

pub use basic::{extract_text, pages_to_process};

/// Turns an uploaded document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: &UploadedDocument)
        -> Result<ExtractedText, DocumentParseError>;
}

/// In-process extractor backed by lopdf. Parsing runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct LopdfExtractor {
    max_pages: usize,
}

impl LopdfExtractor {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Run a parse on the blocking pool. A panic inside `parse` becomes
/// [`DocumentParseError::Worker`] instead of unwinding into the caller.
pub async fn parse_blocking<F>(parse: F) -> Result<ExtractedText, DocumentParseError>
where
    F: FnOnce() -> Result<ExtractedText, DocumentParseError> + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| DocumentParseError::Worker(e.to_string()))?
}

#[async_trait]
impl TextExtractor for LopdfExtractor {
    async fn extract_text(
        &self,
        document: &UploadedDocument,
    ) -> Result<ExtractedText, DocumentParseError> {
        let bytes = document.bytes.clone();
        let max_pages = self.max_pages;
        let started = std::time::Instant::now();

        let extracted = parse_blocking(move || basic::extract_text(&bytes, max_pages)).await?;

        tracing::debug!(
            document = %document.name,
            pages_processed = extracted.pages_processed,
            total_pages = extracted.total_pages,
            chars = extracted.char_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extracted text"
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::{encrypted_pdf, text_pdf};

    #[tokio::test]
    async fn extractor_respects_configured_page_cap() {
        let pdf = text_pdf(&[vec!["one"], vec!["two"], vec!["three"]]).unwrap();
        let doc = UploadedDocument::new("notes.pdf", pdf);

        let extractor = LopdfExtractor::new(2);
        assert_eq!(extractor.max_pages(), 2);
        let extracted = extractor.extract_text(&doc).await.unwrap();

        assert_eq!(extracted.text, "one two");
        assert_eq!(extracted.pages_processed, 2);
        assert_eq!(extracted.total_pages, 3);
    }

    #[tokio::test]
    async fn extractor_reports_parse_errors() {
        let doc = UploadedDocument::new("notes.pdf", b"%PDF-nope".to_vec());
        let err = LopdfExtractor::default().extract_text(&doc).await.unwrap_err();
        assert!(matches!(err, DocumentParseError::Malformed(_)));
    }

    #[tokio::test]
    async fn encrypted_document_is_refused() {
        let pdf = encrypted_pdf(&[vec!["Confidential lecture notes"]]).unwrap();
        let doc = UploadedDocument::new("locked.pdf", pdf);
        let err = LopdfExtractor::default().extract_text(&doc).await.unwrap_err();
        assert!(matches!(err, DocumentParseError::Encrypted));
    }

    #[tokio::test]
    async fn parser_panic_becomes_worker_error() {
        let err = parse_blocking(|| panic!("xref table points past end of file"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentParseError::Worker(_)));
    }
}
