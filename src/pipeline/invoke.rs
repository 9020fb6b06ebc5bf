//! Generic stage invoker.
//!
//! A [`StageInvoker`] binds one instruction template to an input and an
//! output contract. Invoking it validates the input, fills the template,
//! sends one request to the injected provider, and validates the answer
//! against the output contract before deserialising it.
//!
//! The provider call races a per-call timeout and the caller's
//! [`CancellationToken`]; whichever loses is dropped, so a cancelled or timed
//! out request leaves nothing running.

use crate::classify::into_stage_error;
use crate::contract::{
    describe, validate, validate_as, Contract, UnknownFieldPolicy, ValidationError,
};
use crate::error::ResumeInsightError;
use crate::output::StageStats;
use crate::pipeline::postprocess::parse_json_response;
use crate::pipeline::Stage;
use crate::prompts::{render_template, system_message};
use crate::provider::{GenerationProvider, GenerationRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-call generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout: Duration,
    pub unknown_fields: UnknownFieldPolicy,
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            unknown_fields: UnknownFieldPolicy::Tolerate,
        }
    }
}

/// A validated stage output and the cost of producing it.
#[derive(Debug, Clone)]
pub struct Invocation<O> {
    pub value: O,
    pub stats: StageStats,
}

/// Checks applied to a deserialised output after contract validation.
pub type OutputCheck<I, O> = fn(&I, &O) -> Result<(), ValidationError>;

/// One model-backed transformation `I -> O`.
pub struct StageInvoker<I, O> {
    stage: Stage,
    input_contract: &'static Contract,
    output_contract: &'static Contract,
    persona: &'static str,
    template: &'static str,
    provider: Arc<dyn GenerationProvider>,
    settings: InvocationSettings,
    check: Option<OutputCheck<I, O>>,
    _marker: PhantomData<fn(&I) -> O>,
}

impl<I, O> StageInvoker<I, O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    pub fn new(
        stage: Stage,
        input_contract: &'static Contract,
        output_contract: &'static Contract,
        persona: &'static str,
        template: &'static str,
        provider: Arc<dyn GenerationProvider>,
        settings: InvocationSettings,
    ) -> Self {
        Self {
            stage,
            input_contract,
            output_contract,
            persona,
            template,
            provider,
            settings,
            check: None,
            _marker: PhantomData,
        }
    }

    /// Add a stage-specific rule on top of the output contract.
    pub fn with_check(mut self, check: OutputCheck<I, O>) -> Self {
        self.check = Some(check);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> &InvocationSettings {
        &self.settings
    }

    /// Build the request that [`Self::invoke`] would send, without sending it.
    pub fn build_request(&self, input: &I) -> Result<GenerationRequest, ResumeInsightError> {
        let fields = serde_json::to_value(input).map_err(|e| {
            ResumeInsightError::Internal(format!("{} input could not be serialised: {e}", self.stage))
        })?;
        validate(self.input_contract, &fields, UnknownFieldPolicy::Reject).map_err(|source| {
            ResumeInsightError::Internal(format!("{} input violates its contract: {source}", self.stage))
        })?;

        Ok(GenerationRequest {
            system: system_message(self.persona, &describe(self.output_contract)),
            prompt: render_template(self.template, &fields),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        })
    }

    /// Run the stage once.
    ///
    /// Exactly one provider call is made. No retries.
    pub async fn invoke(
        &self,
        input: &I,
        cancel: &CancellationToken,
    ) -> Result<Invocation<O>, ResumeInsightError> {
        let stage = self.stage;
        if cancel.is_cancelled() {
            return Err(ResumeInsightError::Cancelled { stage });
        }

        let request = self.build_request(input)?;
        debug!(
            "{}: sending {} system chars, {} prompt chars to {}",
            stage,
            request.system.len(),
            request.prompt.len(),
            self.provider.name()
        );

        let start = Instant::now();
        let call = tokio::time::timeout(self.settings.timeout, self.provider.generate(&request));
        let generation = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("{}: cancelled after {}ms", stage, start.elapsed().as_millis());
                return Err(ResumeInsightError::Cancelled { stage });
            }
            outcome = call => match outcome {
                Err(_) => {
                    warn!("{}: timed out after {}s", stage, self.settings.timeout.as_secs());
                    return Err(ResumeInsightError::Timeout {
                        stage,
                        secs: self.settings.timeout.as_secs(),
                    });
                }
                Ok(Err(e)) => {
                    warn!("{}: provider error: {}", stage, e);
                    return Err(into_stage_error(stage, e));
                }
                Ok(Ok(generation)) => generation,
            },
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        if generation.content.trim().is_empty() {
            warn!("{}: empty response", stage);
            return Err(ResumeInsightError::EmptyResponse { stage });
        }

        let value = parse_json_response(&generation.content)
            .and_then(|raw| validate_as::<O>(self.output_contract, &raw, self.settings.unknown_fields))
            .and_then(|value| match self.check {
                Some(check) => check(input, &value).map(|_| value),
                None => Ok(value),
            })
            .map_err(|source| {
                warn!("{}: invalid response: {}", stage, source);
                ResumeInsightError::ValidationFailed { stage, source }
            })?;

        info!(
            "{}: done in {}ms ({} in / {} out tokens)",
            stage, duration_ms, generation.input_tokens, generation.output_tokens
        );

        Ok(Invocation {
            value,
            stats: StageStats {
                stage,
                input_tokens: generation.input_tokens,
                output_tokens: generation.output_tokens,
                duration_ms,
            },
        })
    }
}
