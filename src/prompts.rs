//! Instruction templates for every pipeline stage.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: tuning a stage's instruction means editing
//!    exactly one constant.
//! 2. **Testability**: unit tests can render templates directly without a
//!    provider, so prompt regressions are caught cheaply.
//!
//! Templates use `{{name}}` placeholders named after the stage's input
//! contract fields. The output contract is not part of the template; it is
//! rendered by [`crate::contract::describe`] and appended to the system
//! message by the invoker.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Persona shared by the chained stages.
pub const ADVISOR_PERSONA: &str =
    "You are an expert career advisor specializing in resume analysis.";

/// Persona for the single-call deep analysis.
pub const UNIFIED_PERSONA: &str = "You are an elite career intelligence system.";

/// Appended after the rendered output contract on every stage.
pub const JSON_ONLY_RULES: &str = r#"Respond with a single JSON object that matches the structure above exactly.
- Use the field names exactly as written; every field is required.
- Use an empty list or an empty string when the resume has nothing for a field.
- Do not wrap the JSON in Markdown fences and do not add commentary."#;

pub const EXTRACTION_TEMPLATE: &str = r#"Meticulously review the resume text below and extract its contents into the requested structure.

Resume Text:
"""
{{resumeText}}
"""

Extract:
1. Skills: list every prominent skill as an individual string.
2. Experience: one entry per role, in the order the roles appear in the resume, with the exact job title, the company, the period of employment and a concise summary of responsibilities and achievements.
3. Education: one entry per degree or program, in the order they appear in the resume, with the degree, field of study, institution and graduation date or attendance period.
4. Overall Summary: a concise 3-5 sentence professional summary of the candidate's main qualifications and career goals."#;

pub const FEEDBACK_TEMPLATE: &str = r#"Provide a comprehensive, detailed and constructive feedback report on the resume below. Identify its strengths and weaknesses and give actionable suggestions for improvement.

Resume Text:
"""
{{resumeText}}
"""

Extracted Keywords:
{{extractedKeywords}}

Extracted Experience Summary:
{{extractedExperienceSummary}}

Extracted Education Summary:
{{extractedEducationSummary}}

Give every strength, weakness and suggestion a short title and a detailed description grounded in specific content from the resume. Provide at least 3 items in each category when the resume supports it; if it supports fewer, return only what you found. Be objective and professional."#;

pub const RECOMMENDATIONS_TEMPLATE: &str = r#"Provide personalized career path suggestions and job role recommendations based on the resume analysis report below.

Resume Analysis Report:
Strengths: {{strengths}}
Weaknesses: {{weaknesses}}
Extracted Job Titles:
{{extractedJobTitles}}
Extracted Skills:
{{extractedSkills}}
Experience Summary: {{experienceSummary}}

Generate:
1. 2-3 suitable career paths, each with a name, a description of why it suits the candidate, and growth opportunities.
2. 3-5 specific job role recommendations, each with a title, a brief description, the relevant skills taken from the candidate's own extracted skills, and keywords for job searching.

Keep the recommendations encouraging and clearly linked to the analysis."#;

pub const UNIFIED_TEMPLATE: &str = r#"Perform a comprehensive analysis of the resume text below.

Resume Text:
"""
{{resumeText}}
"""

Your response must include:
1. analysis: structural extraction of skills, experience (in resume order), education (in resume order) and a 3-5 sentence summary.
2. feedback: an executive audit with strengths, weaknesses and suggestions, each with a short title and a resume-grounded description.
3. career: 2-3 career paths and 3-5 job role recommendations whose relevant skills come from the candidate's own skills.
4. revisedResumeMarkdown: a complete, professionally rewritten resume in Markdown. Do not copy the original text verbatim.

Be precise and professional."#;

/// Rendered in place of an empty list so the instruction stays readable.
pub const EMPTY_LIST_MARKER: &str = "(none)";

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Fill `{{name}}` placeholders from the fields of a JSON object.
///
/// Strings are inserted verbatim; lists of strings become `- item` lines.
/// Placeholders with no matching field are left untouched. Substitution is a
/// single pass, so inserted text is never re-scanned for placeholders.
pub fn render_template(template: &str, fields: &Value) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match fields.get(&caps[1]) {
            Some(value) => render_value(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => EMPTY_LIST_MARKER.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => format!("- {s}"),
                other => format!("- {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Build the system message: persona, rendered output contract, JSON rules.
pub fn system_message(persona: &str, contract_description: &str) -> String {
    format!(
        "{persona}\n\nReturn your answer in this structure:\n{contract_description}\n{JSON_ONLY_RULES}"
    )
}
