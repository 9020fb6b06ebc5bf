//! The four concrete stage invokers and the projections between them.
//!
//! Projections are pure functions of earlier stage outputs. They preserve
//! cardinality and order: one experience entry yields exactly one
//! "<title> at <company>" line, in resume order.

use crate::contract::{ValidationError, ValidationErrorKind};
use crate::output::{AnalysisResult, CareerRecommendations, FeedbackItem, FeedbackReport, PipelineResult};
use crate::pipeline::invoke::{InvocationSettings, StageInvoker};
use crate::pipeline::Stage;
use crate::prompts::{
    ADVISOR_PERSONA, EXTRACTION_TEMPLATE, FEEDBACK_TEMPLATE, RECOMMENDATIONS_TEMPLATE,
    UNIFIED_PERSONA, UNIFIED_TEMPLATE,
};
use crate::provider::GenerationProvider;
use crate::schemas::{
    ANALYSIS, CAREER, FEEDBACK, FEEDBACK_INPUT, RECOMMENDATIONS_INPUT, RESUME_TEXT_INPUT, UNIFIED,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input of the extraction and unified stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionInput {
    pub resume_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    pub resume_text: String,
    pub extracted_keywords: Vec<String>,
    pub extracted_experience_summary: Vec<String>,
    pub extracted_education_summary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsInput {
    pub strengths: String,
    pub weaknesses: String,
    pub extracted_job_titles: Vec<String>,
    pub extracted_skills: Vec<String>,
    pub experience_summary: String,
}

pub type ExtractionInvoker = StageInvoker<ExtractionInput, AnalysisResult>;
pub type FeedbackInvoker = StageInvoker<FeedbackInput, FeedbackReport>;
pub type RecommendationsInvoker = StageInvoker<RecommendationsInput, CareerRecommendations>;
pub type UnifiedInvoker = StageInvoker<ExtractionInput, PipelineResult>;

pub fn extraction(provider: Arc<dyn GenerationProvider>, settings: InvocationSettings) -> ExtractionInvoker {
    StageInvoker::new(
        Stage::Extraction,
        &RESUME_TEXT_INPUT,
        &ANALYSIS,
        ADVISOR_PERSONA,
        EXTRACTION_TEMPLATE,
        provider,
        settings,
    )
}

pub fn feedback(provider: Arc<dyn GenerationProvider>, settings: InvocationSettings) -> FeedbackInvoker {
    StageInvoker::new(
        Stage::Feedback,
        &FEEDBACK_INPUT,
        &FEEDBACK,
        ADVISOR_PERSONA,
        FEEDBACK_TEMPLATE,
        provider,
        settings,
    )
}

pub fn recommendations(
    provider: Arc<dyn GenerationProvider>,
    settings: InvocationSettings,
) -> RecommendationsInvoker {
    StageInvoker::new(
        Stage::Recommendations,
        &RECOMMENDATIONS_INPUT,
        &CAREER,
        ADVISOR_PERSONA,
        RECOMMENDATIONS_TEMPLATE,
        provider,
        settings,
    )
}

pub fn unified(provider: Arc<dyn GenerationProvider>, settings: InvocationSettings) -> UnifiedInvoker {
    StageInvoker::new(
        Stage::Unified,
        &RESUME_TEXT_INPUT,
        &UNIFIED,
        UNIFIED_PERSONA,
        UNIFIED_TEMPLATE,
        provider,
        settings,
    )
    .with_check(check_revised_resume)
}

/// The rewritten resume must exist and must not just echo the input.
fn check_revised_resume(input: &ExtractionInput, output: &PipelineResult) -> Result<(), ValidationError> {
    let revised = output.revised_resume_markdown.trim();
    if revised.is_empty() {
        return Err(ValidationError::new(
            "revisedResumeMarkdown",
            ValidationErrorKind::Constraint("must not be empty".into()),
        ));
    }
    if normalized(revised) == normalized(&input.resume_text) {
        return Err(ValidationError::new(
            "revisedResumeMarkdown",
            ValidationErrorKind::Constraint("must not repeat the original resume verbatim".into()),
        ));
    }
    Ok(())
}

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Projections ──────────────────────────────────────────────────────────────

/// Project the extraction output into the feedback stage's input.
pub fn feedback_input(resume_text: &str, analysis: &AnalysisResult) -> FeedbackInput {
    FeedbackInput {
        resume_text: resume_text.to_string(),
        extracted_keywords: analysis.skills.clone(),
        extracted_experience_summary: analysis
            .experience
            .iter()
            .map(|e| format!("{} at {}", e.job_title, e.company))
            .collect(),
        extracted_education_summary: analysis
            .education
            .iter()
            .map(|e| format!("{} from {}", e.degree, e.institution))
            .collect(),
    }
}

/// Project extraction and feedback outputs into the recommendations input.
pub fn recommendations_input(analysis: &AnalysisResult, feedback: &FeedbackReport) -> RecommendationsInput {
    RecommendationsInput {
        strengths: titles(&feedback.strengths),
        weaknesses: titles(&feedback.weaknesses),
        extracted_job_titles: analysis.experience.iter().map(|e| e.job_title.clone()).collect(),
        extracted_skills: analysis.skills.clone(),
        experience_summary: analysis.overall_summary.clone(),
    }
}

fn titles(items: &[FeedbackItem]) -> String {
    items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>().join(", ")
}
