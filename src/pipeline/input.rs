//! Input resolution: normalise a user-supplied path, URL or `-` into a
//! [`DocumentSource`].
//!
//! Resolution only reads bytes and decides a media type. Whether those bytes
//! are acceptable is decided by [`crate::pipeline::extract`], which rejects
//! unsupported media types before any parsing.

use crate::error::ResumeInsightError;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_TEXT: &str = "text/plain";

/// A resume as handed to the pipeline, before text acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Text typed or pasted by the user.
    Text(String),
    /// A binary document with its declared media type.
    Document { bytes: Vec<u8>, media_type: String },
}

impl DocumentSource {
    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        DocumentSource::Document {
            bytes: bytes.into(),
            media_type: MEDIA_TYPE_PDF.to_string(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Guess a media type from a file name's extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MEDIA_TYPE_PDF),
        "txt" | "text" | "md" | "markdown" => Some(MEDIA_TYPE_TEXT),
        _ => None,
    }
}

/// Resolve the input string to a [`DocumentSource`].
///
/// * `-` reads stdin as text;
/// * `http://` / `https://` downloads the document;
/// * anything else is a local file.
///
/// `media_type` overrides whatever would be inferred.
pub async fn resolve_source(
    input: &str,
    media_type: Option<&str>,
    timeout_secs: u64,
) -> Result<DocumentSource, ResumeInsightError> {
    if input == "-" {
        return read_text(tokio::io::stdin()).await;
    }

    if is_url(input) {
        download_url(input, media_type, timeout_secs).await
    } else {
        resolve_local(input, media_type).await
    }
}

/// Read a text stream (stdin) to the end without blocking the runtime.
async fn read_text<R: AsyncRead + Unpin>(mut reader: R) -> Result<DocumentSource, ResumeInsightError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .await
        .map_err(|e| ResumeInsightError::InvalidInput {
            input: "-".to_string(),
            reason: format!("could not read stdin: {e}"),
        })?;
    Ok(DocumentSource::Text(text))
}

/// Read a local file and decide its media type.
async fn resolve_local(
    path_str: &str,
    media_type: Option<&str>,
) -> Result<DocumentSource, ResumeInsightError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ResumeInsightError::FileNotFound { path: path.clone() },
        _ => ResumeInsightError::ExtractionFailed {
            detail: format!("could not read '{}': {e}", path.display()),
        },
    })?;

    let media_type = media_type
        .map(str::to_string)
        .or_else(|| media_type_for_path(&path).map(str::to_string))
        .unwrap_or_else(|| MEDIA_TYPE_OCTET_STREAM.to_string());

    debug!("Resolved local document: {} ({})", path.display(), media_type);
    Ok(DocumentSource::Document { bytes, media_type })
}

/// Download a URL and take its media type from `Content-Type`.
async fn download_url(
    url: &str,
    media_type: Option<&str>,
    timeout_secs: u64,
) -> Result<DocumentSource, ResumeInsightError> {
    info!("Downloading resume from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ResumeInsightError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ResumeInsightError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ResumeInsightError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ResumeInsightError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ResumeInsightError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let media_type = download_media_type(media_type, header_type.as_deref(), url);

    info!("Downloaded {} bytes ({})", bytes.len(), media_type);
    Ok(DocumentSource::Document {
        bytes: bytes.to_vec(),
        media_type,
    })
}

const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Pick a downloaded document's media type: explicit override, then a
/// specific `Content-Type`, then the URL extension.
///
/// A generic `application/octet-stream` header says nothing about the
/// document and is treated as absent.
fn download_media_type(media_type: Option<&str>, header: Option<&str>, url: &str) -> String {
    let header = header.filter(|h| {
        let essence = h.split(';').next().unwrap_or("").trim();
        !essence.is_empty() && !essence.eq_ignore_ascii_case(MEDIA_TYPE_OCTET_STREAM)
    });
    media_type
        .or(header)
        .or_else(|| media_type_from_url(url))
        .unwrap_or(MEDIA_TYPE_OCTET_STREAM)
        .to_string()
}

fn media_type_from_url(url: &str) -> Option<&'static str> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?.to_string();
    media_type_for_path(Path::new(&last))
}
