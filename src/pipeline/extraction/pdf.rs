use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use super::staging::{detect_mime_from_bytes, is_pdf, StagedPayload};
use super::types::{PageExtraction, PdfExtractor};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
///
/// The payload is staged to a temp file for parsing and removed before
/// `extract_text` returns, on success and on failure.
#[derive(Debug, Default)]
pub struct PdfTextExtractor {
    staging_dir: Option<PathBuf>,
}

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage payloads under `dir` instead of the system temp directory.
    pub fn with_staging_dir(dir: PathBuf) -> Self {
        Self {
            staging_dir: Some(dir),
        }
    }
}

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        if !is_pdf(pdf_bytes) {
            return Err(ExtractionError::UnsupportedFormat(detect_mime_from_bytes(pdf_bytes)));
        }

        let staged = StagedPayload::write(self.staging_dir.as_deref(), pdf_bytes)?;
        let parsed = parse_pages(staged.path());
        staged.release()?;

        let pages = parsed?
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text,
            })
            .collect();

        Ok(pages)
    }
}

/// pdf-extract panics on some malformed content streams (text shown before
/// a font is selected, unknown font resources). A panic becomes a parse error.
fn parse_pages(path: &Path) -> Result<Vec<String>, ExtractionError> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(result) => result.map_err(|e| ExtractionError::PdfParsing(e.to_string())),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            tracing::warn!(detail = %detail, "PDF parser panicked");
            Err(ExtractionError::PdfParsing(format!("malformed PDF: {detail}")))
        }
    }
}

/// Generate a valid PDF with one text page per entry using lopdf
/// (the library that pdf-extract uses internally). Lines within a page
/// are separated by `\n`.
#[cfg(test)]
pub(crate) fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
    let streams: Vec<String> = pages
        .iter()
        .map(|text| {
            // BT /F1 12 Tf 72 720 Td (line) Tj 0 -16 Td (line) Tj ... ET
            let mut content = String::from("BT /F1 12 Tf 72 720 Td");
            for (i, line) in text.lines().enumerate() {
                if i > 0 {
                    content.push_str(" 0 -16 Td");
                }
                content.push_str(&format!(" ({line}) Tj"));
            }
            content.push_str(" ET");
            content
        })
        .collect();
    make_pdf_with_streams(&streams)
}

/// PDF whose pages carry the given raw content streams, with Helvetica
/// registered as `/F1`.
#[cfg(test)]
pub(crate) fn make_pdf_with_streams(streams: &[String]) -> Vec<u8> {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    // Font dictionary
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    // Resources dictionary
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for content in streams {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    // Catalog
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let extractor = PdfTextExtractor::new();
        let pdf_bytes = make_test_pdf(&["Hello World from Medreport"]);
        let pages = extractor.extract_text(&pdf_bytes).unwrap();

        assert!(!pages.is_empty(), "Should extract at least one page");
        let full_text: String = pages.iter().map(|p| p.text.clone()).collect();
        assert!(
            full_text.contains("Hello") || full_text.contains("World"),
            "Expected text to contain 'Hello' or 'World', got: {full_text}"
        );
    }

    #[test]
    fn pages_numbered_in_document_order() {
        let extractor = PdfTextExtractor::new();
        let pdf_bytes = make_test_pdf(&["alpha page", "beta page", "gamma page"]);
        let pages = extractor.extract_text(&pdf_bytes).unwrap();

        assert_eq!(pages.len(), 3);
        let numbers: Vec<usize> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[0].text.contains("alpha"));
        assert!(pages[2].text.contains("gamma"));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let extractor = PdfTextExtractor::new();
        let result = extractor.extract_text(b"%PDF-1.4 this is not really a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn non_pdf_payload_rejected_before_staging() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().to_path_buf());

        let result = extractor.extract_text(b"\x89PNG\r\n\x1a\n");
        match result {
            Err(ExtractionError::UnsupportedFormat(mime)) => assert_eq!(mime, "image/png"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        assert!(staging_is_empty(dir.path()));
    }

    #[test]
    fn staging_file_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().to_path_buf());

        extractor.extract_text(&make_test_pdf(&["Age: 34"])).unwrap();
        assert!(staging_is_empty(dir.path()));
    }

    #[test]
    fn staging_file_removed_after_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().to_path_buf());

        assert!(extractor.extract_text(b"%PDF-1.4 truncated").is_err());
        assert!(staging_is_empty(dir.path()));
    }

    #[test]
    fn text_before_font_selection_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().to_path_buf());
        let pdf = make_pdf_with_streams(&["BT 72 720 Td (Age: 34) Tj ET".to_string()]);

        let result = extractor.extract_text(&pdf);
        assert!(
            matches!(result, Err(ExtractionError::PdfParsing(_))),
            "expected PdfParsing, got {result:?}"
        );
        assert!(staging_is_empty(dir.path()));
    }

    #[test]
    fn undefined_font_resource_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().to_path_buf());
        let pdf = make_pdf_with_streams(&["BT /F9 12 Tf 72 720 Td (fever) Tj ET".to_string()]);

        let result = extractor.extract_text(&pdf);
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
        assert!(staging_is_empty(dir.path()));
    }

    #[test]
    fn missing_staging_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = PdfTextExtractor::with_staging_dir(dir.path().join("absent"));

        let result = extractor.extract_text(&make_test_pdf(&["text"]));
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
