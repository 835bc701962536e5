//! Report layout and PDF output.
//!
//! `compose_report` decides every line of the report; `render_pdf` only
//! places those lines on A4 pages.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::conditions::Recommendation;
use super::fields::PatientFields;
use super::labs::AbnormalResult;

pub const REPORT_TITLE: &str = "Medical Report Analysis";

pub const PATIENT_DETAILS_HEADING: &str = "--- Patient Details ---";
pub const SUMMARY_HEADING: &str = "--- Summary ---";
pub const MEDICINES_HEADING: &str = "--- Recommended Medicines ---";
pub const TEST_RESULTS_HEADING: &str = "--- Test Results ---";

pub const NO_MEDICINES_TEXT: &str = "No specific medicines found.";
pub const ALL_NORMAL_TEXT: &str = "All test results appear within normal ranges.";
pub const OUT_OF_RANGE_MARK: &str = "(Out of normal range)";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 20.0;
const TOP_MM: f32 = 280.0;
const BOTTOM_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const SECTION_GAP_MM: f32 = 6.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const WRAP_CHARS: usize = 85;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One labeled block of the report. Empty lines are vertical spacers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub sections: Vec<ReportSection>,
}

impl ReportLayout {
    pub fn section(&self, heading: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.heading == heading)
    }

    /// Plain-text rendition, sections separated by a blank line.
    pub fn to_text(&self) -> String {
        self.sections
            .iter()
            .map(|section| {
                let mut block = section.heading.clone();
                for line in &section.lines {
                    block.push('\n');
                    block.push_str(line);
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Four sections, always in the same order.
pub fn compose_report(
    patient: &PatientFields,
    summary: &str,
    recommendations: &[Recommendation],
    abnormal_results: &[AbnormalResult],
) -> ReportLayout {
    let patient_lines = vec![
        format!("Name: {}", patient.name),
        format!("Age: {}", patient.age),
    ];

    let summary_lines: Vec<String> = summary.lines().map(|l| l.trim_end().to_string()).collect();

    let medicine_lines = if recommendations.is_empty() {
        vec![NO_MEDICINES_TEXT.to_string()]
    } else {
        let mut lines = Vec::new();
        for (i, rec) in recommendations.iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            lines.push(format!("Condition: {}", capitalize(&rec.condition)));
            lines.push(format!("Medicines: {}", rec.medicines.join(", ")));
        }
        lines
    };

    let result_lines = if abnormal_results.is_empty() {
        vec![ALL_NORMAL_TEXT.to_string()]
    } else {
        abnormal_results
            .iter()
            .map(|r| {
                format!(
                    "{}: {} {OUT_OF_RANGE_MARK}",
                    capitalize(&r.test_name),
                    format_value(r.value)
                )
            })
            .collect()
    };

    ReportLayout {
        title: REPORT_TITLE.to_string(),
        sections: vec![
            ReportSection {
                heading: PATIENT_DETAILS_HEADING.to_string(),
                lines: patient_lines,
            },
            ReportSection {
                heading: SUMMARY_HEADING.to_string(),
                lines: summary_lines,
            },
            ReportSection {
                heading: MEDICINES_HEADING.to_string(),
                lines: medicine_lines,
            },
            ReportSection {
                heading: TEST_RESULTS_HEADING.to_string(),
                lines: result_lines,
            },
        ],
    }
}

/// Upper-case first character, lower-case the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Whole numbers keep one decimal place (`212` prints as `212.0`).
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Page cursor that opens a new page when the bottom margin is reached.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn ensure_room(&mut self) {
        if self.y < BOTTOM_MM {
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Page {}", self.pages + 1),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_MM;
            self.pages += 1;
        }
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        self.ensure_room();
        if !text.is_empty() {
            self.layer
                .use_text(text, size, Mm(MARGIN_LEFT_MM), Mm(self.y), font);
        }
        self.y -= LINE_HEIGHT_MM;
    }
}

/// Renders the layout to PDF bytes.
pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, RenderError> {
    let (doc, page1, layer1) =
        PdfDocument::new(&layout.title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Font(e.to_string()))?;

    let mut writer = PageWriter {
        layer: doc.get_page(page1).get_layer(layer1),
        doc: &doc,
        y: TOP_MM,
        pages: 1,
    };

    for section in &layout.sections {
        writer.line(&section.heading, HEADING_SIZE, &bold);
        for line in &section.lines {
            for wrapped in wrap_text(line, WRAP_CHARS) {
                writer.line(&wrapped, BODY_SIZE, &font);
            }
        }
        writer.y -= SECTION_GAP_MM;
    }
    let pages = writer.pages;

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Save(e.to_string()))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| RenderError::Save(e.to_string()))?;

    tracing::debug!(pages, bytes = bytes.len(), "Report PDF rendered");
    Ok(bytes)
}

/// Renders the layout and writes it to `out_dir/file_name`, replacing any
/// previous file of that name.
pub fn write_report(
    layout: &ReportLayout,
    out_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, RenderError> {
    let bytes = render_pdf(layout)?;
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(file_name);
    std::fs::write(&path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RangeDirection;

    fn patient() -> PatientFields {
        PatientFields {
            name: "Jane Doe".into(),
            age: "34".into(),
        }
    }

    fn hemoglobin_low() -> AbnormalResult {
        AbnormalResult {
            test_name: "hemoglobin".into(),
            value: 10.0,
            low: 13.5,
            high: 17.5,
            direction: RangeDirection::Low,
            group: None,
        }
    }

    #[test]
    fn sections_in_fixed_order() {
        let layout = compose_report(&patient(), "Summary.", &[], &[]);
        let headings: Vec<&str> = layout.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                PATIENT_DETAILS_HEADING,
                SUMMARY_HEADING,
                MEDICINES_HEADING,
                TEST_RESULTS_HEADING
            ]
        );
    }

    #[test]
    fn empty_findings_use_placeholders() {
        let layout = compose_report(&PatientFields::unknown(), "Nothing notable.", &[], &[]);
        assert_eq!(
            layout.section(MEDICINES_HEADING).unwrap().lines,
            vec!["No specific medicines found."]
        );
        assert_eq!(
            layout.section(TEST_RESULTS_HEADING).unwrap().lines,
            vec!["All test results appear within normal ranges."]
        );
        assert_eq!(
            layout.section(PATIENT_DETAILS_HEADING).unwrap().lines,
            vec!["Name: Unknown", "Age: Unknown"]
        );
    }

    #[test]
    fn recommendation_and_result_lines() {
        let recs = vec![
            Recommendation {
                condition: "anemia".into(),
                medicines: vec!["Ferrous sulfate".into(), "Vitamin B12".into()],
            },
            Recommendation {
                condition: "fever".into(),
                medicines: vec!["Paracetamol".into()],
            },
        ];
        let layout = compose_report(&patient(), "Low hemoglobin.", &recs, &[hemoglobin_low()]);

        assert_eq!(
            layout.section(MEDICINES_HEADING).unwrap().lines,
            vec![
                "Condition: Anemia",
                "Medicines: Ferrous sulfate, Vitamin B12",
                "",
                "Condition: Fever",
                "Medicines: Paracetamol",
            ]
        );
        assert_eq!(
            layout.section(TEST_RESULTS_HEADING).unwrap().lines,
            vec!["Hemoglobin: 10.0 (Out of normal range)"]
        );
    }

    #[test]
    fn text_rendition() {
        let layout = compose_report(&patient(), "Line one.\nLine two.", &[], &[]);
        assert_eq!(
            layout.to_text(),
            "--- Patient Details ---\nName: Jane Doe\nAge: 34\n\n\
             --- Summary ---\nLine one.\nLine two.\n\n\
             --- Recommended Medicines ---\nNo specific medicines found.\n\n\
             --- Test Results ---\nAll test results appear within normal ranges."
        );
    }

    #[test]
    fn capitalize_lowers_remainder() {
        assert_eq!(capitalize("urinary tract infection"), "Urinary tract infection");
        assert_eq!(capitalize("hbA1C"), "Hba1c");
        assert_eq!(capitalize("LDL"), "Ldl");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(10.0), "10.0");
        assert_eq!(format_value(212.0), "212.0");
        assert_eq!(format_value(7.2), "7.2");
        assert_eq!(format_value(0.35), "0.35");
        assert_eq!(format_value(15000.0), "15000.0");
    }

    #[test]
    fn wrap_breaks_long_lines() {
        let text = "word ".repeat(40);
        let lines = wrap_text(&text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(wrap_text("", 20), vec![String::new()]);
    }

    #[test]
    fn pdf_bytes_are_a_loadable_document() {
        let layout = compose_report(&patient(), "Short summary.", &[], &[hemoglobin_low()]);
        let bytes = render_pdf(&layout).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn rendered_empty_findings_show_placeholders() {
        use crate::pipeline::extraction::{extract_document, PdfTextExtractor};

        let layout = compose_report(&PatientFields::unknown(), "Nothing notable.", &[], &[]);
        let bytes = render_pdf(&layout).unwrap();

        let document = extract_document(&PdfTextExtractor::new(), &bytes).unwrap();
        let text = document.full_text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(text.contains(NO_MEDICINES_TEXT), "missing medicines placeholder in {text:?}");
        assert!(text.contains(ALL_NORMAL_TEXT), "missing results placeholder in {text:?}");
    }

    #[test]
    fn long_summary_spans_pages() {
        let summary = (0..80)
            .map(|i| format!("Paragraph {i} of a long model summary."))
            .collect::<Vec<_>>()
            .join("\n");
        let layout = compose_report(&patient(), &summary, &[], &[]);
        let bytes = render_pdf(&layout).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn write_report_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let layout = compose_report(&patient(), "First.", &[], &[]);

        let first = write_report(&layout, &out, "final_report.pdf").unwrap();
        let second = write_report(&layout, &out, "final_report.pdf").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, out.join("final_report.pdf"));

        let written = std::fs::read(&second).unwrap();
        assert!(written.starts_with(b"%PDF"));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }
}
