pub mod types;
pub mod staging;
pub mod pdf;

pub use types::*;
pub use staging::*;
pub use pdf::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Unsupported format for extraction (expected PDF, got {0})")]
    UnsupportedFormat(String),
}
