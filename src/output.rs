//! Records produced by a pipeline run.
//!
//! JSON field names are camelCase and match the contract field names in
//! [`crate::schemas`] one-to-one, so a validated response deserialises
//! straight into these types.

use crate::orchestrator::RunMode;
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};

/// Structured extraction of a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub overall_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub job_title: String,
    pub company: String,
    pub duration: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub field_of_study: String,
    pub institution: String,
    pub graduation_date: String,
}

/// Strengths, weaknesses and suggestions for a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    pub overall_summary: String,
    pub strengths: Vec<FeedbackItem>,
    pub weaknesses: Vec<FeedbackItem>,
    pub suggestions: Vec<FeedbackItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerRecommendations {
    pub career_paths: Vec<CareerPath>,
    pub job_role_recommendations: Vec<JobRoleRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPath {
    pub name: String,
    pub description: String,
    pub growth_opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRoleRecommendation {
    pub title: String,
    pub description: String,
    pub relevant_skills: Vec<String>,
    pub keywords: Vec<String>,
}

/// Terminal artifact of a run.
///
/// `revised_resume_markdown` is only produced in unified mode; a chained run
/// leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub analysis: AnalysisResult,
    pub feedback: FeedbackReport,
    pub career: CareerRecommendations,
    pub revised_resume_markdown: String,
}

/// Token usage and timing for one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStats {
    pub stage: Stage,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Statistics for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub mode: RunMode,
    pub stages: Vec<StageStats>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    pub(crate) fn new(mode: RunMode, stages: Vec<StageStats>, total_duration_ms: u64) -> Self {
        Self {
            mode,
            total_input_tokens: stages.iter().map(|s| s.input_tokens as u64).sum(),
            total_output_tokens: stages.iter().map(|s| s.output_tokens as u64).sum(),
            stages,
            total_duration_ms,
        }
    }
}

/// A validated result together with the statistics of the run that made it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub result: PipelineResult,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analysis_uses_camel_case_names() {
        let a = AnalysisResult {
            skills: vec!["Rust".into()],
            experience: vec![ExperienceEntry {
                job_title: "Engineer".into(),
                company: "Acme".into(),
                duration: "2020 - 2023".into(),
                summary: "Built things.".into(),
            }],
            education: vec![],
            overall_summary: "Solid.".into(),
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["experience"][0]["jobTitle"], "Engineer");
        assert_eq!(v["overallSummary"], "Solid.");
    }

    #[test]
    fn pipeline_result_reads_revised_markdown_key() {
        let v = json!({
            "analysis": {"skills": [], "experience": [], "education": [], "overallSummary": ""},
            "feedback": {"overallSummary": "", "strengths": [], "weaknesses": [], "suggestions": []},
            "career": {"careerPaths": [], "jobRoleRecommendations": []},
            "revisedResumeMarkdown": "# Jane"
        });
        let r: PipelineResult = serde_json::from_value(v).unwrap();
        assert_eq!(r.revised_resume_markdown, "# Jane");
    }

    #[test]
    fn run_stats_sums_tokens() {
        let stats = RunStats::new(
            RunMode::Chained,
            vec![
                StageStats {
                    stage: Stage::Extraction,
                    input_tokens: 100,
                    output_tokens: 40,
                    duration_ms: 10,
                },
                StageStats {
                    stage: Stage::Feedback,
                    input_tokens: 150,
                    output_tokens: 60,
                    duration_ms: 12,
                },
            ],
            30,
        );
        assert_eq!(stats.total_input_tokens, 250);
        assert_eq!(stats.total_output_tokens, 100);
    }
}
