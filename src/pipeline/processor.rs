//! Report analysis orchestrator.
//!
//! Drives one document through extract → fields / conditions / labs →
//! summarize, and hands the result to the renderer. All engines are boxed
//! traits so the pipeline runs against mocks in tests.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::config::AnalyzerConfig;
use crate::pipeline::conditions::{recommend, Recommendation};
use crate::pipeline::extraction::{extract_document, ExtractionError, PdfExtractor, PdfTextExtractor};
use crate::pipeline::fields::{extract_patient_fields, PatientFields};
use crate::pipeline::labs::{find_abnormal_results, AbnormalResult};
use crate::pipeline::render::{compose_report, render_pdf, write_report, RenderError, ReportLayout};
use crate::pipeline::summarize::{truncate_chars, LlmSummarizer, SummarizeError, Summarizer};
use crate::reference::{ReferenceError, ReferenceTables};

/// Errors that can occur while analyzing a report.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Summarization failed: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Reference data error: {0}")]
    Reference(#[from] ReferenceError),
}

/// Upload-stage preview: who the report is about.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetails {
    pub patient: PatientFields,
    pub page_count: usize,
    pub text_length: usize,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReportAnalysis {
    pub report_id: Uuid,
    pub generated_at: DateTime<Local>,
    pub patient: PatientFields,
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    pub abnormal_results: Vec<AbnormalResult>,
    pub page_count: usize,
    pub text_length: usize,
}

impl ReportAnalysis {
    pub fn layout(&self) -> ReportLayout {
        compose_report(
            &self.patient,
            &self.summary,
            &self.recommendations,
            &self.abnormal_results,
        )
    }
}

pub struct ReportAnalyzer {
    extractor: Box<dyn PdfExtractor + Send + Sync>,
    summarizer: Box<dyn Summarizer + Send + Sync>,
    tables: ReferenceTables,
    summary_input_chars: usize,
    output_file_name: String,
}

impl ReportAnalyzer {
    pub fn new(
        extractor: Box<dyn PdfExtractor + Send + Sync>,
        summarizer: Box<dyn Summarizer + Send + Sync>,
        tables: ReferenceTables,
    ) -> Self {
        let defaults = AnalyzerConfig::default();
        Self {
            extractor,
            summarizer,
            tables,
            summary_input_chars: defaults.summary_input_chars,
            output_file_name: defaults.output_file_name,
        }
    }

    /// Production analyzer: pdf-extract, Ollama, and the configured tables.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ProcessingError> {
        let tables = ReferenceTables::from_config(config)?;
        let summarizer = LlmSummarizer::from_config(config)?;
        Ok(Self::new(
            Box::new(PdfTextExtractor::new()),
            Box::new(summarizer),
            tables,
        )
        .with_summary_input_chars(config.summary_input_chars)
        .with_output_file_name(&config.output_file_name))
    }

    pub fn with_summary_input_chars(mut self, chars: usize) -> Self {
        self.summary_input_chars = chars;
        self
    }

    pub fn with_output_file_name(mut self, name: &str) -> Self {
        self.output_file_name = name.to_string();
        self
    }

    pub fn output_file_name(&self) -> &str {
        &self.output_file_name
    }

    /// Extract text and patient fields only. Never calls the model.
    pub fn read_details(&self, pdf_bytes: &[u8]) -> Result<ReportDetails, ProcessingError> {
        let document = extract_document(self.extractor.as_ref(), pdf_bytes)?;
        let patient = extract_patient_fields(&document.full_text);
        log_patient_fields(&patient);
        Ok(ReportDetails {
            patient,
            page_count: document.page_count(),
            text_length: document.full_text.chars().count(),
        })
    }

    /// Full analysis of a PDF payload.
    pub fn analyze(&self, pdf_bytes: &[u8]) -> Result<ReportAnalysis, ProcessingError> {
        let document = extract_document(self.extractor.as_ref(), pdf_bytes)?;
        self.analyze_text(&document.full_text, document.page_count())
    }

    /// Analysis of already-extracted text.
    pub fn analyze_text(
        &self,
        text: &str,
        page_count: usize,
    ) -> Result<ReportAnalysis, ProcessingError> {
        let report_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        let patient = extract_patient_fields(text);
        log_patient_fields(&patient);
        let recommendations = recommend(text, &self.tables.medicines);
        let abnormal_results = find_abnormal_results(text, &self.tables.ranges);

        let segment = truncate_chars(text, self.summary_input_chars);
        let summary = self.summarizer.summarize(segment)?;

        tracing::info!(
            report_id = %report_id,
            pages = page_count,
            conditions = recommendations.len(),
            abnormal = abnormal_results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Report analyzed"
        );

        Ok(ReportAnalysis {
            report_id,
            generated_at: Local::now(),
            patient,
            summary,
            recommendations,
            abnormal_results,
            page_count,
            text_length: text.chars().count(),
        })
    }

    /// PDF bytes for an analysis.
    pub fn render(&self, analysis: &ReportAnalysis) -> Result<Vec<u8>, ProcessingError> {
        Ok(render_pdf(&analysis.layout())?)
    }

    /// Writes the report PDF into `out_dir` under the configured file name.
    pub fn write(&self, analysis: &ReportAnalysis, out_dir: &Path) -> Result<PathBuf, ProcessingError> {
        Ok(write_report(&analysis.layout(), out_dir, &self.output_file_name)?)
    }
}

/// Records whether the fields were found, never their values.
fn log_patient_fields(patient: &PatientFields) {
    if !patient.has_name() || !patient.has_age() {
        tracing::warn!(
            name_found = patient.has_name(),
            age_found = patient.has_age(),
            "Patient details incomplete"
        );
    }
}
