//! Generation provider seam.
//!
//! Stage invokers never talk to a model SDK directly. They hold an
//! `Arc<dyn GenerationProvider>` that was constructed by the caller and
//! passed in, so a run has no hidden global client and tests can substitute
//! a scripted provider.
//!
//! [`LlmGenerationProvider`] is the production implementation, backed by any
//! `edgequake_llm::LLMProvider` (OpenAI, Anthropic, Gemini, Ollama, ...).
//! [`resolve_provider`] builds one from [`PipelineConfig`].

use crate::config::PipelineConfig;
use crate::error::ResumeInsightError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// One outbound generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Persona, rendered output contract and JSON rules.
    pub system: String,
    /// The stage template with the input filled in.
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Raw provider output, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A failure raised by the provider itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider returned an error; the message is kept verbatim.
    #[error("{0}")]
    Api(String),
    /// The call completed without any output value.
    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// Anything that can turn a [`GenerationRequest`] into text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name for logs, e.g. "openai/gpt-4.1-nano".
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}

/// [`GenerationProvider`] backed by an edgequake-llm chat provider.
pub struct LlmGenerationProvider {
    inner: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmGenerationProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }
}

impl fmt::Debug for LlmGenerationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmGenerationProvider")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl GenerationProvider for LlmGenerationProvider {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let messages = vec![
            ChatMessage::system(&request.system),
            ChatMessage::user(&request.prompt),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .inner
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(Generation {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Default model for a named provider when none is configured.
pub fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" | "google" => "gemini-2.0-flash",
        "anthropic" | "claude" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.1",
        _ => "gpt-4.1-nano",
    }
}

fn create_named_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn GenerationProvider>, ResumeInsightError> {
    let inner = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ResumeInsightError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(LlmGenerationProvider::new(
        inner,
        format!("{provider_name}/{model}"),
    )))
}

/// Resolve the generation provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider + model** (`config.provider_name`): built with
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key (`OPENAI_API_KEY`, `GEMINI_API_KEY`, ...) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Full auto-detection** ([`ProviderFactory::from_env`]).
pub fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Arc<dyn GenerationProvider>, ResumeInsightError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_named_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_named_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ResumeInsightError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(LlmGenerationProvider::new(llm_provider, "auto")))
}
