//! PDF text and metadata extraction.
//!
//! The pipeline only depends on [`TextExtractor`]; [`PdfExtractor`] is the default adapter. Text
//! comes from `pdf-extract`, while title, author, and page count are read from the document's
//! Info dictionary and page tree through `lopdf`. Missing or unreadable metadata is not an error.

use crate::processing::{DocumentMetadata, SourceDocument};
use async_trait::async_trait;
use lopdf::{Document, Object};
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors raised while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No bytes were supplied.
    #[error("document is empty")]
    EmptyInput,
    /// Bytes do not start with a PDF header.
    #[error("document is not a PDF")]
    NotPdf,
    /// Upload exceeds the configured size limit.
    #[error("document is {size} bytes, above the {limit} byte limit")]
    TooLarge {
        /// Size of the rejected document.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The PDF parser failed.
    #[error("PDF parsing failed: {0}")]
    Pdf(String),
    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Converts raw document bytes into text plus metadata.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the document contained in `bytes`.
    async fn extract(&self, bytes: Vec<u8>) -> Result<SourceDocument, ExtractionError>;
}

/// [`TextExtractor`] for PDF documents.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    max_bytes: usize,
}

impl PdfExtractor {
    /// Create an extractor that rejects documents larger than `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Extract synchronously. Callers on an async runtime should go through [`TextExtractor`].
    pub fn extract_blocking(&self, bytes: &[u8]) -> Result<SourceDocument, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        if bytes.len() > self.max_bytes {
            return Err(ExtractionError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotPdf);
        }

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|error| ExtractionError::Pdf(error.to_string()))?;

        let metadata = match Document::load_mem(bytes) {
            Ok(document) => read_metadata(&document),
            Err(error) => {
                tracing::warn!(error = %error, "Unable to read PDF metadata; continuing without it");
                DocumentMetadata::default()
            }
        };

        tracing::debug!(
            bytes = bytes.len(),
            chars = text.chars().count(),
            pages = ?metadata.page_count,
            "Extracted PDF text"
        );
        Ok(SourceDocument { text, metadata })
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, bytes: Vec<u8>) -> Result<SourceDocument, ExtractionError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&bytes))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))?
    }
}

/// Read title, author, and page count from a parsed document.
pub fn read_metadata(document: &Document) -> DocumentMetadata {
    let page_count = u32::try_from(document.get_pages().len()).ok();
    let info = document
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| match object.as_reference() {
            Ok(id) => document.get_object(id).ok(),
            Err(_) => Some(object),
        })
        .and_then(|object| object.as_dict().ok());

    let field = |key: &[u8]| {
        info.and_then(|dict| dict.get(key).ok())
            .and_then(decode_text)
            .filter(|value| !value.is_empty())
    };

    DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        page_count,
    }
}

/// Decode a PDF text string, honouring the UTF-16BE byte-order mark.
fn decode_text(object: &Object) -> Option<String> {
    let bytes = object.as_str().ok()?;
    let text = if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };
    Some(text.trim().to_string())
}
