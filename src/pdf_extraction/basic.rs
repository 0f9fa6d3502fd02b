// Page-capped PDF text extraction
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;

use super::lopdf_helper::with_pdf;
use crate::types::{DocumentParseError, ExtractedText};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Number of pages to read out of `total_pages`.
pub fn pages_to_process(total_pages: usize, max_pages: usize) -> usize {
    total_pages.min(max_pages)
}

/// Extract text from at most `max_pages` leading pages.
///
/// Each page's text fragments are joined with a single space, each page is
/// followed by one space, and the whole result is trimmed. Any page failure
/// fails the document; no partial text is returned.
pub fn extract_text(bytes: &[u8], max_pages: usize) -> Result<ExtractedText, DocumentParseError> {
    with_pdf(bytes, |doc| extract_from_document(doc, max_pages))
}

pub fn extract_from_document(
    doc: &Document,
    max_pages: usize,
) -> Result<ExtractedText, DocumentParseError> {
    let pages = doc.get_pages();
    let total_pages = pages.len();
    let to_process = pages_to_process(total_pages, max_pages);

    let mut full_text = String::new();
    // get_pages is keyed by page number, so this walks pages in order
    for &page_number in pages.keys().take(to_process) {
        let fragments = page_fragments(doc, page_number)?;
        full_text.push_str(&fragments.join(" "));
        full_text.push(' ');
    }

    Ok(ExtractedText {
        text: full_text.trim().to_string(),
        pages_processed: to_process,
        total_pages,
    })
}

/// Discrete text runs of one page, whitespace-normalised, empties dropped.
pub fn page_fragments(doc: &Document, page_number: u32) -> Result<Vec<String>, DocumentParseError> {
    let raw = doc
        .extract_text(&[page_number])
        .map_err(|e| DocumentParseError::Page {
            page: page_number,
            reason: e.to_string(),
        })?;

    Ok(raw
        .lines()
        .map(|line| WHITESPACE_RUN.replace_all(line.trim(), " ").into_owned())
        .filter(|fragment| !fragment.is_empty())
        .collect())
}
