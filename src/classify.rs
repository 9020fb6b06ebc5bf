//! Provider error classification.
//!
//! Providers surface failures as free text ("429 Too Many Requests",
//! "RESOURCE_EXHAUSTED: quota exceeded", "models/gemini-x is not found").
//! [`classify`] maps that text onto an [`ErrorCategory`] by substring match,
//! with HTTP status codes matched as whole numbers.
//! It is advisory only: it never changes control flow, it just lets the
//! pipeline propagate a clearer error.

use crate::error::{ErrorCategory, ResumeInsightError};
use crate::pipeline::Stage;
use crate::provider::ProviderError;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_QUOTA_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b429\b").unwrap());
static RE_MODEL_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b40[34]\b").unwrap());

/// Markers of rate or quota exhaustion. Matched case-insensitively.
const QUOTA_MARKERS: &[&str] = &[
    "resource_exhausted",
    "quota",
    "rate limit",
    "rate_limit",
    "too many requests",
];

/// Markers of a missing or forbidden model. Matched case-insensitively.
const MODEL_MARKERS: &[&str] = &[
    "not found",
    "not_found",
    "permission denied",
    "permission_denied",
    "not permitted",
    "does not exist",
    "do not have access",
    "does not have access",
];

/// Map a provider failure to exactly one category.
///
/// Total: the result is always one of `QuotaExceeded`, `ModelUnavailable`,
/// `EmptyResponse` or `Unknown`. Quota markers win over model markers.
pub fn classify(error: &ProviderError) -> ErrorCategory {
    match error {
        ProviderError::EmptyResponse => ErrorCategory::EmptyResponse,
        ProviderError::Api(message) => classify_message(message),
    }
}

/// Classify a raw provider message.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if RE_QUOTA_STATUS.is_match(&lower) || QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::QuotaExceeded
    } else if RE_MODEL_STATUS.is_match(&lower) || MODEL_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::ModelUnavailable
    } else {
        ErrorCategory::Unknown
    }
}

/// Turn a provider failure at `stage` into the pipeline's error type.
pub fn into_stage_error(stage: Stage, error: ProviderError) -> ResumeInsightError {
    match (classify(&error), error) {
        (_, ProviderError::EmptyResponse) => ResumeInsightError::EmptyResponse { stage },
        (ErrorCategory::QuotaExceeded, ProviderError::Api(message)) => {
            ResumeInsightError::QuotaExceeded { stage, message }
        }
        (ErrorCategory::ModelUnavailable, ProviderError::Api(message)) => {
            ResumeInsightError::ModelUnavailable { stage, message }
        }
        (_, ProviderError::Api(message)) => ResumeInsightError::Provider { stage, message },
    }
}
