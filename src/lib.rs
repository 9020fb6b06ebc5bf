//! # resume-insight
//!
//! Turn a resume (PDF or plain text) into validated, structured career
//! intelligence using a language model.
//!
//! ## Why contracts?
//!
//! Model output is free text that merely claims to be JSON. Every stage here
//! declares its output shape once as a [`Contract`]; the same declaration is
//! rendered into the instruction and then used to validate the answer. A run
//! therefore yields either fully validated records or a categorised error,
//! never a half-parsed object.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume (PDF / text)
//!  │
//!  ├─ 1. Acquire     PDF text via pdfium (spawn_blocking), or pasted text
//!  ├─ 2. Extraction  skills, experience, education, summary
//!  ├─ 3. Feedback    strengths, weaknesses, suggestions
//!  ├─ 4. Career      career paths and job role recommendations
//!  └─ 5. Output      PipelineResult + per-stage stats
//! ```
//!
//! Unified mode replaces steps 2–4 with a single call that also returns a
//! rewritten resume in Markdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_insight::{run_pipeline, PipelineConfig, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = PipelineConfig::default();
//!     let text = std::fs::read_to_string("resume.txt")?;
//!     let output = run_pipeline(&text, RunMode::Chained, &config).await?;
//!     for role in &output.result.career.job_role_recommendations {
//!         println!("{}", role.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `resume-insight` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium library in the binary |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-insight = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod config;
pub mod contract;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod schemas;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{classify, classify_message};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use contract::{
    describe, validate, validate_as, Contract, Field, FieldKind, UnknownFieldPolicy,
    ValidationError, ValidationErrorKind,
};
pub use error::{ErrorCategory, ResumeInsightError, QUOTA_COOLDOWN};
pub use orchestrator::{
    analyze_document, analyze_input, resolve_input, run_pipeline, run_pipeline_sync, Pipeline,
    RunMode,
};
pub use output::{
    AnalysisResult, CareerPath, CareerRecommendations, EducationEntry, ExperienceEntry,
    FeedbackItem, FeedbackReport, JobRoleRecommendation, PipelineOutput, PipelineResult, RunStats,
    StageStats,
};
pub use pipeline::extract::{acquire_text, extract_text};
pub use pipeline::input::{resolve_source, DocumentSource};
pub use pipeline::Stage;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use provider::{
    Generation, GenerationProvider, GenerationRequest, LlmGenerationProvider, ProviderError,
};
