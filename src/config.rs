//! Configuration types for a pipeline run.
//!
//! Everything a run needs besides the resume itself lives in
//! [`PipelineConfig`], built via [`PipelineConfigBuilder`]. Credentials are
//! not stored here; providers read them from the environment.

use crate::contract::UnknownFieldPolicy;
use crate::error::ResumeInsightError;
use crate::progress::PipelineProgressCallback;
use crate::provider::GenerationProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a pipeline run.
///
/// # Example
/// ```rust
/// use resume_insight::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .provider_name("gemini")
///     .model("gemini-2.0-flash")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn GenerationProvider>>,

    /// Provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses the provider's default.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Extraction should be faithful to the resume; a low temperature keeps
    /// field values close to the source text.
    pub temperature: f32,

    /// Maximum tokens per chained-stage response. Default: 4096.
    pub max_tokens: usize,

    /// Maximum tokens for the unified response. Default: 8192.
    ///
    /// The unified answer carries all four outputs including a full rewritten
    /// resume; 4096 tokens truncates long resumes mid-JSON.
    pub unified_max_tokens: usize,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL sources in seconds, applied by
    /// [`crate::resolve_input`] and [`crate::analyze_input`]. Default: 120.
    pub download_timeout_secs: u64,

    /// How validation treats response fields the contract does not declare.
    /// Default: [`UnknownFieldPolicy::Tolerate`].
    pub unknown_fields: UnknownFieldPolicy,

    /// Optional stage-level progress events.
    pub progress_callback: Option<Arc<dyn PipelineProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.2,
            max_tokens: 4096,
            unified_max_tokens: 8192,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            unknown_fields: UnknownFieldPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("unified_max_tokens", &self.unified_max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("unknown_fields", &self.unknown_fields)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn unified_max_tokens(mut self, n: usize) -> Self {
        self.config.unified_max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.config.unknown_fields = policy;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PipelineProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ResumeInsightError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.unified_max_tokens == 0 {
            return Err(ResumeInsightError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ResumeInsightError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(ResumeInsightError::InvalidConfig(
                "download_timeout_secs must be ≥ 1".into(),
            ));
        }
        if matches!(c.provider_name.as_deref(), Some("")) {
            return Err(ResumeInsightError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
