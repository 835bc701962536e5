//! Transient on-disk copy of an uploaded payload.
//!
//! The PDF parser reads from a path, so the payload is staged in a temp file
//! for the duration of extraction. The file is removed when the guard is
//! released or dropped, whichever comes first.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::ExtractionError;

/// Window searched for the `%PDF` header. Some producers emit junk first.
const PDF_HEADER_WINDOW: usize = 1024;

pub struct StagedPayload {
    file: NamedTempFile,
}

impl StagedPayload {
    /// Write `bytes` to a fresh temp file, in `dir` if given, else the system temp dir.
    pub fn write(dir: Option<&Path>, bytes: &[u8]) -> Result<Self, ExtractionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("medreport-").suffix(".pdf");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(size = bytes.len(), "Payload staged for extraction");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the staged file now, reporting any failure.
    pub fn release(self) -> Result<(), ExtractionError> {
        self.file.close()?;
        Ok(())
    }
}

/// True when a `%PDF` header appears near the start of the payload.
pub fn is_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// Best-effort MIME guess from magic bytes, used in error messages.
pub fn detect_mime_from_bytes(bytes: &[u8]) -> String {
    if bytes.len() < 4 {
        return "application/octet-stream".into();
    }

    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg".into();
    }
    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png".into();
    }
    if is_pdf(bytes) {
        return "application/pdf".into();
    }
    // ZIP container (docx, xlsx, ...)
    if bytes.starts_with(b"PK\x03\x04") {
        return "application/zip".into();
    }
    if std::str::from_utf8(bytes).is_ok() {
        return "text/plain".into();
    }

    "application/octet-stream".into()
}
