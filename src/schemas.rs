//! Stage contracts.
//!
//! One static [`Contract`] per stage input and output. Field names and hints
//! are what the model sees, so hints are written as instructions ("The exact
//! job title"), not as documentation.

use crate::contract::{Contract, Field};
use once_cell::sync::Lazy;

pub static RESUME_TEXT_INPUT: Lazy<Contract> = Lazy::new(|| Contract {
    name: "ResumeInput",
    description: "The raw resume text.",
    fields: vec![Field::string(
        "resumeText",
        "The extracted text content of the resume.",
    )],
});

pub static ANALYSIS: Lazy<Contract> = Lazy::new(|| Contract {
    name: "AnalysisResult",
    description: "Structured extraction of skills, experience and education from the resume.",
    fields: vec![
        Field::string_list("skills", "A list of key skills extracted from the resume, one skill per string."),
        Field::record_list(
            "experience",
            "Work experience entries, in the order they appear in the resume.",
            vec![
                Field::string("jobTitle", "The exact job title, e.g. \"Software Engineer\"."),
                Field::string("company", "The company where the job was held."),
                Field::string("duration", "The period of employment, e.g. \"Jan 2020 - Dec 2022\"."),
                Field::string("summary", "A concise summary of responsibilities and achievements in this role."),
            ],
        ),
        Field::record_list(
            "education",
            "Education entries, in the order they appear in the resume.",
            vec![
                Field::string("degree", "The degree obtained, e.g. \"Bachelor of Science\"."),
                Field::string("fieldOfStudy", "The academic field, e.g. \"Computer Engineering\"."),
                Field::string("institution", "The name of the university or institution."),
                Field::string("graduationDate", "The graduation date or attendance period, e.g. \"May 2023\"."),
            ],
        ),
        Field::string(
            "overallSummary",
            "A 3-5 sentence professional summary of the candidate's main qualifications and career goals.",
        ),
    ],
});

pub static FEEDBACK_INPUT: Lazy<Contract> = Lazy::new(|| Contract {
    name: "FeedbackInput",
    description: "Resume text plus fields projected from the extraction stage.",
    fields: vec![
        Field::string("resumeText", "The full text content of the resume."),
        Field::string_list("extractedKeywords", "Key skills and terms extracted from the resume."),
        Field::string_list("extractedExperienceSummary", "Work experience entries as \"<title> at <company>\"."),
        Field::string_list("extractedEducationSummary", "Education entries as \"<degree> from <institution>\"."),
    ],
});

fn feedback_items(name: &'static str, hint: &'static str, title: &'static str, description: &'static str) -> Field {
    Field::record_list(
        name,
        hint,
        vec![Field::string("title", title), Field::string("description", description)],
    )
}

pub static FEEDBACK: Lazy<Contract> = Lazy::new(|| Contract {
    name: "FeedbackReport",
    description: "A constructive feedback report on the resume.",
    fields: vec![
        Field::string(
            "overallSummary",
            "A concise overall summary of the resume's general effectiveness and impact.",
        ),
        feedback_items(
            "strengths",
            "Strengths identified in the resume.",
            "A brief title for the strength, e.g. \"Strong Action Verbs\".",
            "A detailed explanation of the strength, citing specific examples from the resume.",
        ),
        feedback_items(
            "weaknesses",
            "Weaknesses identified in the resume.",
            "A brief title for the weakness, e.g. \"Lack of Quantifiable Achievements\".",
            "A detailed explanation of the weakness, citing specific examples and why it hinders the resume.",
        ),
        feedback_items(
            "suggestions",
            "Concrete suggestions for improving the resume.",
            "A brief title for the suggestion, e.g. \"Add Metrics\".",
            "A concrete, actionable suggestion explaining how to implement it.",
        ),
    ],
});

pub static RECOMMENDATIONS_INPUT: Lazy<Contract> = Lazy::new(|| Contract {
    name: "RecommendationsInput",
    description: "Resume analysis report distilled from the extraction and feedback stages.",
    fields: vec![
        Field::string("strengths", "Identified strengths, comma separated."),
        Field::string("weaknesses", "Identified weaknesses, comma separated."),
        Field::string_list("extractedJobTitles", "Job titles extracted from the resume."),
        Field::string_list("extractedSkills", "Skills extracted from the resume."),
        Field::string("experienceSummary", "A summary of the candidate's work experience and achievements."),
    ],
});

pub static CAREER: Lazy<Contract> = Lazy::new(|| Contract {
    name: "CareerRecommendations",
    description: "Personalised career paths and job role recommendations.",
    fields: vec![
        Field::record_list(
            "careerPaths",
            "2-3 suitable career paths.",
            vec![
                Field::string("name", "The name of the career path."),
                Field::string("description", "Why this path suits the candidate."),
                Field::string_list("growthOpportunities", "Potential growth opportunities within this path."),
            ],
        ),
        Field::record_list(
            "jobRoleRecommendations",
            "3-5 specific job roles.",
            vec![
                Field::string("title", "The recommended job title."),
                Field::string("description", "A brief description of the role."),
                Field::string_list("relevantSkills", "Skills from the candidate's own skill list that are relevant to this role."),
                Field::string_list("keywords", "Keywords to use when searching for this role."),
            ],
        ),
    ],
});

pub static UNIFIED: Lazy<Contract> = Lazy::new(|| Contract {
    name: "DeepAnalysis",
    description: "Extraction, feedback, career recommendations and a rewritten resume in one object.",
    fields: vec![
        Field::nested("analysis", Lazy::force(&ANALYSIS)),
        Field::nested("feedback", Lazy::force(&FEEDBACK)),
        Field::nested("career", Lazy::force(&CAREER)),
        Field::string(
            "revisedResumeMarkdown",
            "A complete, professionally rewritten version of the resume in Markdown format.",
        ),
    ],
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{describe, validate_as, UnknownFieldPolicy};
    use crate::output::{AnalysisResult, CareerRecommendations, FeedbackReport, PipelineResult};
    use serde_json::json;

    fn analysis_json() -> serde_json::Value {
        json!({
            "skills": ["Rust", "SQL"],
            "experience": [
                {"jobTitle": "Senior Engineer", "company": "Acme", "duration": "2020 - 2024", "summary": "Led the platform team."},
                {"jobTitle": "Engineer", "company": "Initech", "duration": "2017 - 2020", "summary": "Built billing."}
            ],
            "education": [
                {"degree": "B.Sc.", "fieldOfStudy": "Computer Science", "institution": "MIT", "graduationDate": "2017"}
            ],
            "overallSummary": "Experienced backend engineer."
        })
    }

    #[test]
    fn typed_records_satisfy_their_contracts() {
        let analysis: AnalysisResult =
            validate_as(&ANALYSIS, &analysis_json(), UnknownFieldPolicy::Reject).unwrap();
        assert_eq!(analysis.experience[1].company, "Initech");

        let feedback = serde_json::to_value(FeedbackReport::default()).unwrap();
        validate_as::<FeedbackReport>(&FEEDBACK, &feedback, UnknownFieldPolicy::Reject).unwrap();

        let career = serde_json::to_value(CareerRecommendations::default()).unwrap();
        validate_as::<CareerRecommendations>(&CAREER, &career, UnknownFieldPolicy::Reject).unwrap();
    }

    #[test]
    fn unified_contract_nests_stage_contracts() {
        let result = PipelineResult {
            revised_resume_markdown: "# Resume".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&result).unwrap();
        validate_as::<PipelineResult>(&UNIFIED, &v, UnknownFieldPolicy::Reject).unwrap();

        let text = describe(&UNIFIED);
        assert!(text.contains("- analysis (object)"));
        assert!(text.contains("    - graduationDate (string)"));
        assert!(text.contains("- revisedResumeMarkdown (string)"));
    }

    #[test]
    fn unified_rejects_missing_nested_field() {
        let mut v = serde_json::to_value(PipelineResult::default()).unwrap();
        v["analysis"] = analysis_json();
        v["analysis"]["education"][0]
            .as_object_mut()
            .unwrap()
            .remove("institution");
        let err = validate_as::<PipelineResult>(&UNIFIED, &v, UnknownFieldPolicy::Tolerate)
            .unwrap_err();
        assert_eq!(err.path, "analysis.education[0].institution");
    }

    #[test]
    fn duration_hint_carries_example() {
        assert!(describe(&ANALYSIS)
            .contains("- duration (string): The period of employment, e.g. \"Jan 2020 - Dec 2022\"."));
    }
}
