//! Error types for the resume-insight library.
//!
//! Every failure a run can surface is a [`ResumeInsightError`]. Each variant
//! belongs to exactly one [`ErrorCategory`], the small caller-facing taxonomy
//! a host application switches on to decide what to tell the user:
//!
//! * `InputInvalid`: nothing was sent anywhere; fix the input.
//! * `ExtractionFailed`: the document could not be read; paste text instead.
//! * `ValidationFailed`: the model answered, but not in the declared shape.
//! * `QuotaExceeded` / `ModelUnavailable` / `EmptyResponse` / `Unknown`:
//!   provider failures, mapped by [`crate::classify`].
//!
//! A run either yields a fully validated result or one of these errors.
//! Partial results are never attached to an error.

use crate::contract::ValidationError;
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Cooldown suggested to the user after a quota failure.
pub const QUOTA_COOLDOWN: Duration = Duration::from_secs(60);

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Empty resume text or an unsupported document media type.
    InputInvalid,
    /// The document could not be turned into text.
    ExtractionFailed,
    /// A stage's raw model output did not match its contract.
    ValidationFailed,
    /// The provider signalled rate or quota exhaustion.
    QuotaExceeded,
    /// The requested model is missing or not permitted for these credentials.
    ModelUnavailable,
    /// The provider completed without producing any output.
    EmptyResponse,
    /// Anything else; the provider message is preserved verbatim.
    Unknown,
    /// The caller abandoned the run.
    Cancelled,
}

impl ErrorCategory {
    /// User-facing guidance for this category, if there is any beyond the
    /// error message itself.
    pub fn guidance(self) -> Option<&'static str> {
        match self {
            ErrorCategory::InputInvalid => {
                Some("Paste the full text of your resume or upload a PDF document.")
            }
            ErrorCategory::ExtractionFailed => Some(
                "The document could not be read. Copy and paste the resume text manually instead.",
            ),
            ErrorCategory::QuotaExceeded => {
                Some("Intelligence quota reached. Please wait about 60 seconds before trying again.")
            }
            ErrorCategory::ModelUnavailable => Some(
                "Model configuration issue. Please ensure your API key is active and has access to the configured model.",
            ),
            ErrorCategory::EmptyResponse => {
                Some("The model returned no content. Submitting again usually succeeds.")
            }
            ErrorCategory::ValidationFailed => Some(
                "The model returned an unexpected response shape. Submitting again usually succeeds.",
            ),
            ErrorCategory::Unknown | ErrorCategory::Cancelled => None,
        }
    }

    /// Short stable tag, e.g. for JSON output or metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InputInvalid => "input_invalid",
            ErrorCategory::ExtractionFailed => "extraction_failed",
            ErrorCategory::ValidationFailed => "validation_failed",
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::ModelUnavailable => "model_unavailable",
            ErrorCategory::EmptyResponse => "empty_response",
            ErrorCategory::Unknown => "unknown",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All fatal errors returned by the resume-insight library.
#[derive(Debug, Error)]
pub enum ResumeInsightError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Resume text was empty or whitespace-only.
    #[error("Resume text is empty.\nPaste the resume content or upload a document.")]
    EmptyResume,

    /// The document's media type is not one we can extract text from.
    #[error("Unsupported document type '{media_type}'. Upload a PDF or paste the text.")]
    UnsupportedMediaType { media_type: String },

    /// The input argument is not a file path, URL or `-`.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    // ── Acquisition errors ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The document could not be parsed into text.
    #[error("Text extraction failed: {detail}")]
    ExtractionFailed { detail: String },

    /// The PDF is encrypted; we never prompt for passwords.
    #[error("The document is password-protected. Remove the password or paste the text instead.")]
    PasswordProtected,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to load the PDF engine: {0}\n\n\
PDFium is normally downloaded automatically on first use.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfEngineUnavailable(String),

    // ── Stage errors ──────────────────────────────────────────────────────
    /// The model answered, but the answer did not satisfy the stage contract.
    #[error("{stage} stage returned an invalid response: {source}")]
    ValidationFailed {
        stage: Stage,
        #[source]
        source: ValidationError,
    },

    /// Rate limit or quota exhausted at the provider.
    #[error("Intelligence quota reached during {stage}. Please wait about 60 seconds before trying again.\nProvider said: {message}")]
    QuotaExceeded { stage: Stage, message: String },

    /// The configured model is not found or not permitted.
    #[error("Model unavailable during {stage}: {message}\nPlease ensure your API key is active and supports the configured model.")]
    ModelUnavailable { stage: Stage, message: String },

    /// The provider returned no content at all.
    #[error("{stage} stage completed without producing any output")]
    EmptyResponse { stage: Stage },

    /// Any other provider failure, message preserved verbatim.
    #[error("{message}")]
    Provider { stage: Stage, message: String },

    /// The provider call exceeded the configured per-call timeout.
    #[error("{stage} stage timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    /// The caller cancelled the run.
    #[error("Run cancelled before {stage} completed")]
    Cancelled { stage: Stage },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No provider could be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResumeInsightError {
    /// The caller-facing category of this error.
    pub fn category(&self) -> ErrorCategory {
        use ResumeInsightError::*;
        match self {
            EmptyResume | UnsupportedMediaType { .. } | InvalidInput { .. } => {
                ErrorCategory::InputInvalid
            }
            FileNotFound { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | ExtractionFailed { .. }
            | PasswordProtected
            | PdfEngineUnavailable(_) => ErrorCategory::ExtractionFailed,
            ValidationFailed { .. } => ErrorCategory::ValidationFailed,
            QuotaExceeded { .. } => ErrorCategory::QuotaExceeded,
            ModelUnavailable { .. } | ProviderNotConfigured { .. } => {
                ErrorCategory::ModelUnavailable
            }
            EmptyResponse { .. } => ErrorCategory::EmptyResponse,
            Cancelled { .. } => ErrorCategory::Cancelled,
            Provider { .. } | Timeout { .. } | InvalidConfig(_) | Internal(_) => {
                ErrorCategory::Unknown
            }
        }
    }

    /// Guidance text for the error's category.
    pub fn guidance(&self) -> Option<&'static str> {
        self.category().guidance()
    }

    /// The stage that failed, for stage-level errors.
    pub fn stage(&self) -> Option<Stage> {
        use ResumeInsightError::*;
        match self {
            ValidationFailed { stage, .. }
            | QuotaExceeded { stage, .. }
            | ModelUnavailable { stage, .. }
            | EmptyResponse { stage }
            | Provider { stage, .. }
            | Timeout { stage, .. }
            | Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Whether resubmitting the same input unchanged can reasonably succeed.
    ///
    /// The pipeline itself never retries; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::QuotaExceeded | ErrorCategory::EmptyResponse | ErrorCategory::ValidationFailed
        ) || matches!(self, ResumeInsightError::Timeout { .. })
    }

    /// Minimum wait before a retry is worth attempting.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.category() {
            ErrorCategory::QuotaExceeded => Some(QUOTA_COOLDOWN),
            _ => None,
        }
    }
}
