//! Document text acquisition: turn a [`DocumentSource`] into resume text.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and keeps
//! thread-local state. Page text is read on Tokio's blocking pool so async
//! worker threads never stall on a large document.
//!
//! ## Guarantees
//!
//! * The media type is checked before any byte is parsed.
//! * Page order is preserved: items of a page are joined with a space, pages
//!   with a newline.
//! * Failure is all-or-nothing. A document that yields no text is an error,
//!   never an empty success.

use crate::error::ResumeInsightError;
use crate::pipeline::input::{DocumentSource, MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT};
use crate::pipeline::postprocess::{join_page_items, join_pages};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Media types accepted by [`extract_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

/// Normalise and match a media type. Parameters (`; charset=...`) and case
/// are ignored.
pub fn document_kind(media_type: &str) -> Option<DocumentKind> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        MEDIA_TYPE_PDF | "application/x-pdf" => Some(DocumentKind::Pdf),
        MEDIA_TYPE_TEXT => Some(DocumentKind::PlainText),
        _ => None,
    }
}

/// Validate resume text: trimmed, and non-empty.
pub fn validate_resume_text(text: &str) -> Result<String, ResumeInsightError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ResumeInsightError::EmptyResume);
    }
    Ok(trimmed.to_string())
}

/// Acquire resume text from any source.
pub async fn acquire_text(source: DocumentSource) -> Result<String, ResumeInsightError> {
    match source {
        DocumentSource::Text(text) => validate_resume_text(&text),
        DocumentSource::Document { bytes, media_type } => {
            let text = extract_text(bytes, &media_type).await?;
            validate_resume_text(&text)
        }
    }
}

/// Extract plain text from a binary document.
///
/// Idempotent: the same bytes and media type always yield the same text.
pub async fn extract_text(
    bytes: impl Into<Vec<u8>>,
    media_type: &str,
) -> Result<String, ResumeInsightError> {
    let kind = document_kind(media_type).ok_or_else(|| {
        ResumeInsightError::UnsupportedMediaType {
            media_type: media_type.to_string(),
        }
    })?;
    let bytes = bytes.into();

    match kind {
        DocumentKind::PlainText => {
            let text = String::from_utf8(bytes).map_err(|e| ResumeInsightError::ExtractionFailed {
                detail: format!("text document is not valid UTF-8: {e}"),
            })?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ResumeInsightError::ExtractionFailed {
                    detail: "text document is empty".into(),
                });
            }
            Ok(text.to_string())
        }
        DocumentKind::Pdf => {
            if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
                return Err(ResumeInsightError::ExtractionFailed {
                    detail: "document is not a valid PDF (missing %PDF header)".into(),
                });
            }
            tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&bytes))
                .await
                .map_err(|e| ResumeInsightError::Internal(format!("Extraction task panicked: {}", e)))?
        }
    }
}

/// Map a pdfium load failure; encrypted documents get their own variant.
fn load_error(e: &PdfiumError) -> ResumeInsightError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        ResumeInsightError::PasswordProtected
    } else {
        ResumeInsightError::ExtractionFailed { detail: err_str }
    }
}

/// Blocking implementation of PDF text extraction.
fn extract_pdf_text_blocking(bytes: &[u8]) -> Result<String, ResumeInsightError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| ResumeInsightError::PdfEngineUnavailable(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| load_error(&e))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut page_texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| ResumeInsightError::ExtractionFailed {
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        let items: Vec<String> = text.segments().iter().map(|segment| segment.text()).collect();
        let page_text = join_page_items(&items);
        debug!("Page {}: {} items, {} chars", idx + 1, items.len(), page_text.len());
        page_texts.push(page_text);
    }

    let text = join_pages(&page_texts);
    if text.is_empty() {
        return Err(ResumeInsightError::ExtractionFailed {
            detail: "document contains no extractable text (it may be a scanned image)".into(),
        });
    }
    Ok(text)
}
