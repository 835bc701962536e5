use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Text of a single PDF page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// Whole-document extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub pages: Vec<PageExtraction>,
    /// Page texts joined with a line break, in page order.
    pub full_text: String,
}

impl ExtractedDocument {
    pub fn from_pages(pages: Vec<PageExtraction>) -> Self {
        let full_text = join_pages(&pages);
        Self { pages, full_text }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// PDF text extraction abstraction (allows mocking for tests)
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

pub fn join_pages(pages: &[PageExtraction]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run an extractor and assemble the document text.
pub fn extract_document(
    extractor: &dyn PdfExtractor,
    pdf_bytes: &[u8],
) -> Result<ExtractedDocument, ExtractionError> {
    let document = ExtractedDocument::from_pages(extractor.extract_text(pdf_bytes)?);
    tracing::debug!(
        pages = document.page_count(),
        text_length = document.full_text.len(),
        "Document text extracted"
    );
    Ok(document)
}


/// Mock extractor for tests: returns fixed pages for any `%PDF` payload.
#[cfg(test)]
pub(crate) struct MockPdfExtractor {
    pages: Vec<String>,
}

#[cfg(test)]
impl MockPdfExtractor {
    pub(crate) fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl PdfExtractor for MockPdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        if !super::is_pdf(pdf_bytes) {
            return Err(ExtractionError::UnsupportedFormat(super::detect_mime_from_bytes(
                pdf_bytes,
            )));
        }
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text: text.clone(),
            })
            .collect())
    }
}
