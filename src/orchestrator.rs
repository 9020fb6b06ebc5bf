//! Pipeline orchestration: run the stages in dependency order.
//!
//! ## Chained vs. unified
//!
//! A chained run makes three calls (extraction, feedback, recommendations),
//! each fed by a projection of the previous outputs. Every intermediate
//! record is validated before the next stage sees it. A unified run makes
//! one larger call that returns all outputs at once plus a rewritten resume,
//! trading per-stage validation for latency.
//!
//! Either way a run is all-or-nothing: the first failing stage aborts the run
//! and its error is returned unchanged. Nothing is synthesised from partial
//! results and nothing is retried here.

use crate::config::PipelineConfig;
use crate::error::ResumeInsightError;
use crate::output::{PipelineOutput, PipelineResult, RunStats, StageStats};
use crate::pipeline::extract::{acquire_text, validate_resume_text};
use crate::pipeline::input::{resolve_source, DocumentSource};
use crate::pipeline::invoke::{Invocation, InvocationSettings, StageInvoker};
use crate::pipeline::stages::{self, ExtractionInput};
use crate::pipeline::Stage;
use crate::provider::{resolve_provider, GenerationProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How a run is split into provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Extraction, then feedback, then recommendations.
    #[default]
    Chained,
    /// One call producing every output plus a rewritten resume.
    Unified,
}

impl RunMode {
    pub fn stages(self) -> &'static [Stage] {
        match self {
            RunMode::Chained => &[Stage::Extraction, Stage::Feedback, Stage::Recommendations],
            RunMode::Unified => &[Stage::Unified],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Chained => "chained",
            RunMode::Unified => "unified",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = ResumeInsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chained" => Ok(RunMode::Chained),
            "unified" => Ok(RunMode::Unified),
            other => Err(ResumeInsightError::InvalidConfig(format!(
                "unknown run mode '{other}' (expected 'chained' or 'unified')"
            ))),
        }
    }
}

/// A configured pipeline bound to one provider.
///
/// Cheap to clone and `Send + Sync`, so independent runs may share it.
#[derive(Clone)]
pub struct Pipeline {
    provider: Arc<dyn GenerationProvider>,
    config: PipelineConfig,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Build a pipeline, resolving the provider from `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ResumeInsightError> {
        let provider = resolve_provider(&config)?;
        Ok(Self::new(provider, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn settings(&self, mode: RunMode) -> InvocationSettings {
        let max_tokens = match mode {
            RunMode::Chained => self.config.max_tokens,
            RunMode::Unified => self.config.unified_max_tokens.max(self.config.max_tokens),
        };
        InvocationSettings {
            temperature: self.config.temperature,
            max_tokens,
            timeout: self.config.api_timeout(),
            unknown_fields: self.config.unknown_fields,
        }
    }

    /// Run the pipeline on resume text.
    pub async fn run(&self, resume_text: &str, mode: RunMode) -> Result<PipelineOutput, ResumeInsightError> {
        self.run_with_cancel(resume_text, mode, &CancellationToken::new()).await
    }

    /// Run the pipeline, aborting as soon as `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        resume_text: &str,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, ResumeInsightError> {
        let resume_text = validate_resume_text(resume_text)?;
        let start = Instant::now();
        let total = mode.stages().len();
        info!(
            "Starting {} run with {} ({} chars)",
            mode,
            self.provider.name(),
            resume_text.len()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(mode, total);
        }

        let mut run = StageRunner {
            pipeline: self,
            cancel,
            total,
            stats: Vec::with_capacity(total),
        };
        let settings = self.settings(mode);
        let input = ExtractionInput { resume_text };

        let result = match mode {
            RunMode::Chained => {
                let analysis = run
                    .step(&stages::extraction(Arc::clone(&self.provider), settings), &input)
                    .await?;
                let feedback = run
                    .step(
                        &stages::feedback(Arc::clone(&self.provider), settings),
                        &stages::feedback_input(&input.resume_text, &analysis),
                    )
                    .await?;
                let career = run
                    .step(
                        &stages::recommendations(Arc::clone(&self.provider), settings),
                        &stages::recommendations_input(&analysis, &feedback),
                    )
                    .await?;
                PipelineResult {
                    analysis,
                    feedback,
                    career,
                    revised_resume_markdown: String::new(),
                }
            }
            RunMode::Unified => {
                run.step(&stages::unified(Arc::clone(&self.provider), settings), &input)
                    .await?
            }
        };

        let stats = RunStats::new(mode, run.stats, start.elapsed().as_millis() as u64);
        info!(
            "{} run complete: {} stages, {}ms, {} in / {} out tokens",
            mode,
            stats.stages.len(),
            stats.total_duration_ms,
            stats.total_input_tokens,
            stats.total_output_tokens
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(&stats);
        }

        Ok(PipelineOutput { result, stats })
    }
}

/// Per-run bookkeeping: cancellation check, callbacks and stats.
struct StageRunner<'a> {
    pipeline: &'a Pipeline,
    cancel: &'a CancellationToken,
    total: usize,
    stats: Vec<StageStats>,
}

impl StageRunner<'_> {
    async fn step<I, O>(&mut self, invoker: &StageInvoker<I, O>, input: &I) -> Result<O, ResumeInsightError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let stage = invoker.stage();
        let callback = self.pipeline.config.progress_callback.as_ref();

        let outcome = if self.cancel.is_cancelled() {
            Err(ResumeInsightError::Cancelled { stage })
        } else {
            if let Some(cb) = callback {
                cb.on_stage_start(stage, self.stats.len(), self.total);
            }
            invoker.invoke(input, self.cancel).await
        };

        match outcome {
            Ok(Invocation { value, stats }) => {
                if let Some(cb) = callback {
                    cb.on_stage_complete(&stats);
                }
                self.stats.push(stats);
                Ok(value)
            }
            Err(e) => {
                warn!("Run aborted at {}: {}", stage, e);
                if let Some(cb) = callback {
                    cb.on_stage_error(stage, &e);
                }
                Err(e)
            }
        }
    }
}

// ── Free functions ───────────────────────────────────────────────────────────

/// Run the pipeline on resume text with the provider resolved from `config`.
///
/// Empty text is rejected before any provider is resolved or called.
pub async fn run_pipeline(
    resume_text: &str,
    mode: RunMode,
    config: &PipelineConfig,
) -> Result<PipelineOutput, ResumeInsightError> {
    validate_resume_text(resume_text)?;
    Pipeline::from_config(config.clone())?.run(resume_text, mode).await
}

/// Synchronous wrapper around [`run_pipeline`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_pipeline_sync(
    resume_text: &str,
    mode: RunMode,
    config: &PipelineConfig,
) -> Result<PipelineOutput, ResumeInsightError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ResumeInsightError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_pipeline(resume_text, mode, config))
}

/// Acquire text from a document source, then run the pipeline on it.
///
/// Acquisition failures surface before any provider is resolved.
pub async fn analyze_document(
    source: DocumentSource,
    mode: RunMode,
    config: &PipelineConfig,
) -> Result<PipelineOutput, ResumeInsightError> {
    let text = acquire_text(source).await?;
    run_pipeline(&text, mode, config).await
}

/// Resolve a path, URL or `-` using the configured download timeout.
pub async fn resolve_input(
    input: &str,
    media_type: Option<&str>,
    config: &PipelineConfig,
) -> Result<DocumentSource, ResumeInsightError> {
    resolve_source(input, media_type, config.download_timeout_secs).await
}

/// Resolve a path, URL or `-`, then analyse the document it names.
pub async fn analyze_input(
    input: &str,
    media_type: Option<&str>,
    mode: RunMode,
    config: &PipelineConfig,
) -> Result<PipelineOutput, ResumeInsightError> {
    let source = resolve_input(input, media_type, config).await?;
    analyze_document(source, mode, config).await
}
