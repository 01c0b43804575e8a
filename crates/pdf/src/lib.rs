use serde::{Deserialize, Serialize};
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

#[cfg(test)]
pub(crate) mod fixtures;
pub mod parser;
pub mod render;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF ready for text extraction.
pub struct ParsedDocument {
    backend: LopdfBackend,
}

impl ParsedDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(ParsedDocument {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// Text of every page, in page order.
    pub fn pages(&self) -> Result<Vec<String>, PdfError> {
        let mut pages = Vec::with_capacity(self.page_count());
        for (_, spans) in parser::layout::extract_all_pages(&self.backend)? {
            let lines = parser::layout::group_spans_into_lines(spans);
            pages.push(render::text::render_page(&lines));
        }
        Ok(pages)
    }

    pub fn metadata(&self) -> DocumentMetadata {
        let mut raw = self.backend.metadata();
        DocumentMetadata {
            title: raw.remove("Title"),
            author: raw.remove("Author"),
            creator: raw.remove("Creator"),
            producer: raw.remove("Producer"),
            page_count: self.page_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Extract text page by page.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, PdfError> {
    ParsedDocument::from_bytes(bytes)?.pages()
}

pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, PdfError> {
    Ok(ParsedDocument::from_bytes(bytes)?.metadata())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_pages() {
        let bytes = fixtures::pdf(&[
            &[("Hello", 72, 700), ("World", 120, 700), ("Second line", 72, 686)],
            &[("Page two", 72, 700), ("After a gap", 72, 600)],
        ]);

        let pages = extract_pages(&bytes).unwrap();
        assert_eq!(pages, vec!["Hello World\nSecond line", "Page two\n\nAfter a gap"]);
    }

    #[test]
    fn test_lines_come_out_top_to_bottom() {
        // Drawn bottom line first.
        let bytes = fixtures::pdf(&[&[("bottom", 72, 100), ("top", 72, 700)]]);
        assert_eq!(extract_pages(&bytes).unwrap(), vec!["top\n\nbottom"]);
    }

    #[test]
    fn test_empty_page() {
        let bytes = fixtures::pdf(&[&[]]);
        assert_eq!(extract_pages(&bytes).unwrap(), vec![""]);
        assert_eq!(ParsedDocument::from_bytes(&bytes).unwrap().page_count(), 1);
    }

    #[test]
    fn test_info() {
        let bytes = fixtures::pdf_with_title(&[&[("x", 72, 700)], &[]], "Minutes");
        let meta = info(&bytes).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Minutes"));
        assert_eq!(meta.author, None);
        assert_eq!(meta.page_count, 2);
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(info(&[]).is_err());
        assert!(matches!(extract_pages(b"%PDF-garbage"), Err(PdfError::Parse(_))));
    }
}
