//! Page text assembly and extraction results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lines::LineOptions;

/// Separator placed between pages when a document is collapsed into a single
/// text, matching what layout extractors emit at page boundaries.
pub const PAGE_SEPARATOR: &str = "\n\x0c";

/// Text-extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Text operators of the PDF content streams.
    #[default]
    Layout,
    /// Rasterize, recognize, rebuild lines.
    Ocr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Layout => write!(f, "layout"),
            ExtractionMethod::Ocr => write!(f, "ocr"),
        }
    }
}

/// Whether results are kept per page or collapsed into one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    #[default]
    Pages,
    Document,
}

/// Everything besides the input bytes that influences an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    pub method: ExtractionMethod,
    pub mode: ExtractionMode,
    /// OCR language code, e.g. `eng` or `eng+deu`.
    pub language: String,
    /// Rasterization resolution for OCR.
    pub dpi: u32,
    pub lines: LineOptions,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        ExtractionParams {
            method: ExtractionMethod::Layout,
            mode: ExtractionMode::Pages,
            language: "eng".to_string(),
            dpi: 200,
            lines: LineOptions::default(),
        }
    }
}

/// Extracted text of one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub method: ExtractionMethod,
    /// Number of pages in the source, independent of `pages.len()`.
    pub page_count: usize,
    pub pages: Vec<String>,
}

impl Extraction {
    pub fn new(method: ExtractionMethod, pages: Vec<String>) -> Self {
        Extraction {
            method,
            page_count: pages.len(),
            pages,
        }
    }

    /// Collapse all pages into a single entry. The page count is kept.
    pub fn into_document(self) -> Self {
        Extraction {
            method: self.method,
            page_count: self.page_count,
            pages: vec![document_text(&self.pages)],
        }
    }
}

/// Join reconstructed lines into a page's text.
pub fn page_text<S: AsRef<str>>(lines: &[S]) -> String {
    let lines: Vec<&str> = lines.iter().map(|line| line.as_ref()).collect();
    lines.join("\n")
}

/// Concatenate page texts into a whole-document text.
pub fn document_text<S: AsRef<str>>(pages: &[S]) -> String {
    let pages: Vec<&str> = pages.iter().map(|page| page.as_ref()).collect();
    pages.join(PAGE_SEPARATOR)
}

/// Name of the output file holding the page at 0-based `index`.
pub fn page_file_name(index: usize) -> String {
    format!("page_{index}.txt")
}

/// Human-readable report: the page count followed by each page's text.
pub fn render_report(extraction: &Extraction) -> String {
    let mut out = format!("The pdf file has {} pages\n", extraction.page_count);
    for (index, text) in extraction.pages.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("Page {}:\n", index + 1));
        out.push_str(text.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Extraction {
        Extraction::new(
            ExtractionMethod::Ocr,
            vec!["Hello World\nSecond Line".to_string(), "Back".to_string()],
        )
    }

    #[test]
    fn test_page_text_joins_lines() {
        assert_eq!(page_text(&["Hello World", "Second Line"]), "Hello World\nSecond Line");
        assert_eq!(page_text::<&str>(&[]), "");
    }

    #[test]
    fn test_page_file_name_is_zero_based() {
        assert_eq!(page_file_name(0), "page_0.txt");
        assert_eq!(page_file_name(12), "page_12.txt");
    }

    #[test]
    fn test_document_text() {
        assert_eq!(document_text(&["a", "b"]), "a\n\x0cb");
        assert_eq!(document_text(&["only"]), "only");
    }

    #[test]
    fn test_into_document_keeps_page_count() {
        let doc = sample().into_document();
        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.pages, vec!["Hello World\nSecond Line\n\x0cBack"]);
        assert_eq!(doc.pages[0], document_text(&sample().pages));
    }

    #[test]
    fn test_render_report() {
        let report = render_report(&sample());
        assert_eq!(
            report,
            "The pdf file has 2 pages\n\nPage 1:\nHello World\nSecond Line\n\nPage 2:\nBack\n"
        );
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::Ocr).unwrap(),
            "\"ocr\""
        );
        let parsed: ExtractionMode = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(parsed, ExtractionMode::Document);
    }
}
