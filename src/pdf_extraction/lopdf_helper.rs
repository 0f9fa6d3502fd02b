// lopdf helper - Pure Rust PDF operations, in memory only
use lopdf::Document;

use crate::types::DocumentParseError;

/// Parse a PDF from a byte buffer.
pub fn load_pdf(bytes: &[u8]) -> Result<Document, DocumentParseError> {
    let document =
        Document::load_mem(bytes).map_err(|e| DocumentParseError::Malformed(e.to_string()))?;
    if document.is_encrypted() {
        return Err(DocumentParseError::Encrypted);
    }
    Ok(document)
}

/// Execute an operation with a PDF document
pub fn with_pdf<F, R>(bytes: &[u8], f: F) -> Result<R, DocumentParseError>
where
    F: FnOnce(&Document) -> Result<R, DocumentParseError>,
{
    let document = load_pdf(bytes)?;
    f(&document)
}
