//! Document text extraction: turns an uploaded JD or CV into bounded plain text.
//!
//! `try_extract` reports failures as `ExtractionDegraded`; `extract_text` is the
//! boundary that logs the failure and substitutes empty text, so one unreadable
//! upload never aborts a batch.

mod docx;
mod pdf;

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// An uploaded file. Dropped once its text has been extracted.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Bytes,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detects the format from the filename extension, case-insensitively.
    pub fn detect(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".docx") {
            DocumentFormat::Docx
        } else if lower.ends_with(".pdf") {
            DocumentFormat::Pdf
        } else {
            DocumentFormat::PlainText
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            DocumentFormat::Docx => ".docx",
            DocumentFormat::Pdf => ".pdf",
            DocumentFormat::PlainText => ".txt",
        }
    }
}

/// A document could not be decoded. Recovered as empty text at the boundary.
#[derive(Debug, Error)]
#[error("could not extract text from '{filename}': {reason}")]
pub struct ExtractionDegraded {
    pub filename: String,
    pub reason: String,
}

impl ExtractionDegraded {
    fn new(filename: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Plain text bounded to the configured character budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Keeps the first `max_chars` characters and drops the tail.
    pub fn truncated(text: String, max_chars: usize) -> Self {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => {
                let mut text = text;
                text.truncate(byte_idx);
                Self(text)
            }
            None => Self(text),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for ExtractedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the full, untruncated text of a document.
pub fn try_extract(document: &Document) -> Result<String, ExtractionDegraded> {
    let format = DocumentFormat::detect(&document.filename);
    match format {
        DocumentFormat::Docx => with_temp_copy(document, format, docx::extract_text),
        DocumentFormat::Pdf => with_temp_copy(document, format, pdf::extract_text),
        DocumentFormat::PlainText => Ok(decode_utf8_lossy_ignoring(&document.bytes)),
    }
    .map_err(|reason| ExtractionDegraded::new(&document.filename, reason))
}

/// Extracts and truncates a document's text. Never fails; degraded documents yield "".
pub fn extract_text(document: &Document, max_chars: usize) -> ExtractedText {
    match try_extract(document) {
        Ok(text) => {
            let extracted = ExtractedText::truncated(text, max_chars);
            debug!(
                "Extracted {} chars from '{}'",
                extracted.char_count(),
                document.filename
            );
            extracted
        }
        Err(e) => {
            warn!("{e}; continuing with empty text");
            ExtractedText::default()
        }
    }
}

/// Display name for a candidate: the filename without its last extension.
pub fn candidate_name(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => filename.to_string(),
    }
}

/// Writes the upload to a temporary file and runs `extract` on its path.
/// The file is removed when the guard drops, whether or not extraction succeeded.
fn with_temp_copy<F>(document: &Document, format: DocumentFormat, extract: F) -> Result<String, String>
where
    F: FnOnce(&Path) -> Result<String, String>,
{
    let mut tmp = tempfile::Builder::new()
        .suffix(format.suffix())
        .tempfile()
        .map_err(|e| format!("failed to create temp file: {e}"))?;
    write_all(&mut tmp, &document.bytes)?;
    extract(tmp.path())
}

fn write_all(tmp: &mut NamedTempFile, bytes: &[u8]) -> Result<(), String> {
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| format!("failed to write temp file: {e}"))
}

/// Decodes UTF-8, dropping invalid byte sequences instead of replacing them.
fn decode_utf8_lossy_ignoring(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
