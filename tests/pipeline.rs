//! Integration tests for resume-insight.
//!
//! Every test drives the public API with a scripted in-process provider, so
//! none of them need an API key or network access. The PDF tests build their
//! own documents with pdfium and skip when no pdfium library can be bound.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use resume_insight::{
    analyze_document, analyze_input, classify, extract_text, run_pipeline, DocumentSource, ErrorCategory,
    Generation, GenerationProvider, GenerationRequest, Pipeline, PipelineConfig,
    PipelineProgressCallback, ProviderError, ResumeInsightError, RunMode, RunStats, Stage,
    StageStats,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness; `RUST_LOG=debug` shows per-stage detail.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Replays canned replies in order and records every request it receives.
struct StubProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Duration,
}

impl StubProvider {
    fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<String, ProviderError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].prompt.clone()
    }
}

#[async_trait]
impl GenerationProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyResponse))?;
        Ok(Generation {
            input_tokens: 100,
            output_tokens: 50,
            content,
        })
    }
}

const RESUME: &str = "Jane Doe\n\
Staff Engineer, Acme Corp, 2021 - present. Led the platform team.\n\
Software Engineer, Initech, 2016 - 2021. Built the billing system.\n\
M.Sc. Computer Science, ETH Zurich, 2016\n\
B.Sc. Computer Science, EPFL, 2014\n\
Skills: Rust, Kubernetes, PostgreSQL";

fn analysis_reply() -> String {
    serde_json::json!({
        "skills": ["Rust", "Kubernetes", "PostgreSQL"],
        "experience": [
            {"jobTitle": "Staff Engineer", "company": "Acme Corp", "duration": "2021 - present", "summary": "Led the platform team."},
            {"jobTitle": "Software Engineer", "company": "Initech", "duration": "2016 - 2021", "summary": "Built the billing system."}
        ],
        "education": [
            {"degree": "M.Sc.", "fieldOfStudy": "Computer Science", "institution": "ETH Zurich", "graduationDate": "2016"},
            {"degree": "B.Sc.", "fieldOfStudy": "Computer Science", "institution": "EPFL", "graduationDate": "2014"}
        ],
        "overallSummary": "Platform engineer with a decade of backend experience."
    })
    .to_string()
}

fn feedback_reply() -> String {
    serde_json::json!({
        "overallSummary": "A clear, well structured resume.",
        "strengths": [
            {"title": "Leadership", "description": "Led the platform team at Acme."},
            {"title": "Progression", "description": "Steady growth from engineer to staff."}
        ],
        "weaknesses": [
            {"title": "No Metrics", "description": "Achievements are not quantified."}
        ],
        "suggestions": [
            {"title": "Add Numbers", "description": "Quantify the billing system's scale."}
        ]
    })
    .to_string()
}

fn career_reply() -> String {
    serde_json::json!({
        "careerPaths": [
            {"name": "Engineering Management", "description": "Builds on team leadership.", "growthOpportunities": ["Director of Engineering"]}
        ],
        "jobRoleRecommendations": [
            {"title": "Principal Engineer", "description": "Owns platform architecture.", "relevantSkills": ["Rust", "Kubernetes"], "keywords": ["platform", "infrastructure"]}
        ]
    })
    .to_string()
}

fn unified_reply(revised: &str) -> String {
    serde_json::json!({
        "analysis": serde_json::from_str::<serde_json::Value>(&analysis_reply()).unwrap(),
        "feedback": serde_json::from_str::<serde_json::Value>(&feedback_reply()).unwrap(),
        "career": serde_json::from_str::<serde_json::Value>(&career_reply()).unwrap(),
        "revisedResumeMarkdown": revised
    })
    .to_string()
}

fn chained_replies() -> Vec<Result<String, ProviderError>> {
    vec![Ok(analysis_reply()), Ok(feedback_reply()), Ok(career_reply())]
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_input_is_rejected_without_any_call() {
    // No provider is configured at all: resolution must never be reached.
    let err = run_pipeline("", RunMode::Chained, &PipelineConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InputInvalid);

    let stub = StubProvider::new(chained_replies());
    let err = Pipeline::new(stub.clone(), PipelineConfig::default())
        .run("   \n\t", RunMode::Unified)
        .await
        .unwrap_err();
    assert!(matches!(err, ResumeInsightError::EmptyResume));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn quota_error_in_first_stage_aborts_chained_run() {
    init_tracing();
    let stub = StubProvider::new(vec![
        Err(ProviderError::Api(
            "[GoogleGenerativeAI Error]: 429 RESOURCE_EXHAUSTED".into(),
        )),
        Ok(feedback_reply()),
        Ok(career_reply()),
    ]);
    let err = Pipeline::new(stub.clone(), PipelineConfig::default())
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::QuotaExceeded);
    assert_eq!(err.stage(), Some(Stage::Extraction));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
    assert_eq!(stub.calls(), 1, "stages 2 and 3 must never be invoked");
}

#[tokio::test]
async fn empty_upstream_lists_do_not_fail_feedback() {
    let empty_analysis = serde_json::json!({
        "skills": [],
        "experience": [],
        "education": [],
        "overallSummary": "Very little information."
    })
    .to_string();
    let empty_feedback = serde_json::json!({
        "overallSummary": "Too short to assess.",
        "strengths": [],
        "weaknesses": [],
        "suggestions": []
    })
    .to_string();
    let stub = StubProvider::new(vec![Ok(empty_analysis), Ok(empty_feedback), Ok(career_reply())]);

    let out = Pipeline::new(stub.clone(), PipelineConfig::default())
        .run("Jane Doe", RunMode::Chained)
        .await
        .unwrap();

    assert!(out.result.feedback.strengths.is_empty());
    assert!(stub.prompt(1).contains("Extracted Keywords:\n(none)"));
    assert!(stub.prompt(2).contains("Strengths: \nWeaknesses: \n"));
}

#[tokio::test]
async fn unified_run_returns_rewritten_resume() {
    let stub = StubProvider::new(vec![Ok(unified_reply(
        "# Jane Doe\n\n**Staff Engineer** at Acme Corp",
    ))]);
    let out = Pipeline::new(stub.clone(), PipelineConfig::default())
        .run(RESUME, RunMode::Unified)
        .await
        .unwrap();

    assert!(!out.result.revised_resume_markdown.is_empty());
    assert_ne!(out.result.revised_resume_markdown, RESUME);
    assert_eq!(out.result.analysis.skills.len(), 3);
    assert_eq!(out.stats.mode, RunMode::Unified);
    assert_eq!(out.stats.stages.len(), 1);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn unified_echo_of_input_is_validation_failure() {
    let stub = StubProvider::new(vec![Ok(unified_reply(RESUME))]);
    let err = Pipeline::new(stub, PipelineConfig::default())
        .run(RESUME, RunMode::Unified)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ValidationFailed);
    assert!(err.is_retryable());
}

// ── Chained mode ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chained_run_preserves_order_and_cardinality() {
    init_tracing();
    let stub = StubProvider::new(chained_replies());
    let out = assert_ok!(
        Pipeline::new(stub.clone(), PipelineConfig::default())
            .run(RESUME, RunMode::Chained)
            .await
    );

    let titles: Vec<_> = out
        .result
        .analysis
        .experience
        .iter()
        .map(|e| e.job_title.as_str())
        .collect();
    assert_eq!(titles, ["Staff Engineer", "Software Engineer"]);
    let schools: Vec<_> = out
        .result
        .analysis
        .education
        .iter()
        .map(|e| e.institution.as_str())
        .collect();
    assert_eq!(schools, ["ETH Zurich", "EPFL"]);

    let feedback_prompt = stub.prompt(1);
    let staff = feedback_prompt.find("- Staff Engineer at Acme Corp").unwrap();
    let swe = feedback_prompt.find("- Software Engineer at Initech").unwrap();
    assert!(staff < swe);
    assert!(feedback_prompt.contains("- M.Sc. from ETH Zurich\n- B.Sc. from EPFL"));

    let career_prompt = stub.prompt(2);
    assert!(career_prompt.contains("Strengths: Leadership, Progression"));
    assert!(career_prompt.contains("Weaknesses: No Metrics"));

    assert!(out.result.revised_resume_markdown.is_empty());
    assert_eq!(out.stats.total_input_tokens, 300);
    assert_eq!(out.stats.total_output_tokens, 150);
}

#[tokio::test]
async fn identical_runs_with_deterministic_provider_agree() {
    let first = Pipeline::new(StubProvider::new(chained_replies()), PipelineConfig::default())
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap();
    let second = Pipeline::new(StubProvider::new(chained_replies()), PipelineConfig::default())
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap();
    assert_eq!(first.result, second.result);
}

#[tokio::test]
async fn invalid_middle_stage_aborts_without_partial_result() {
    let stub = StubProvider::new(vec![
        Ok(analysis_reply()),
        Ok(r#"{"overallSummary": "ok", "strengths": "not a list", "weaknesses": [], "suggestions": []}"#.into()),
        Ok(career_reply()),
    ]);
    let err = Pipeline::new(stub.clone(), PipelineConfig::default())
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap_err();
    match err {
        ResumeInsightError::ValidationFailed { stage, source } => {
            assert_eq!(stage, Stage::Feedback);
            assert_eq!(source.path, "strengths");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stub.calls(), 2);
}

// ── Cancellation, timeouts, progress ─────────────────────────────────────────

#[tokio::test]
async fn cancellation_mid_run_stops_remaining_stages() {
    let stub = StubProvider::with_delay(chained_replies(), Duration::from_millis(200));
    let pipeline = Pipeline::new(stub.clone(), PipelineConfig::default());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = pipeline
        .run_with_cancel(RESUME, RunMode::Chained, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Cancelled);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn slow_provider_hits_per_call_timeout() {
    let stub = StubProvider::with_delay(chained_replies(), Duration::from_secs(5));
    let config = PipelineConfig::builder().api_timeout_secs(1).build().unwrap();
    let err = Pipeline::new(stub, config)
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResumeInsightError::Timeout {
            stage: Stage::Extraction,
            secs: 1
        }
    ));
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PipelineProgressCallback for Recorder {
    fn on_run_start(&self, mode: RunMode, total_stages: usize) {
        self.events.lock().unwrap().push(format!("run:{mode}:{total_stages}"));
    }
    fn on_stage_start(&self, stage: Stage, index: usize, _total: usize) {
        self.events.lock().unwrap().push(format!("start:{stage}:{index}"));
    }
    fn on_stage_complete(&self, stats: &StageStats) {
        self.events.lock().unwrap().push(format!("done:{}", stats.stage));
    }
    fn on_stage_error(&self, stage: Stage, error: &ResumeInsightError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error:{stage}:{}", error.category()));
    }
    fn on_run_complete(&self, stats: &RunStats) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete:{}", stats.stages.len()));
    }
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    Pipeline::new(StubProvider::new(chained_replies()), config)
        .run(RESUME, RunMode::Chained)
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "run:chained:3",
            "start:extraction:0",
            "done:extraction",
            "start:feedback:1",
            "done:feedback",
            "start:recommendations:2",
            "done:recommendations",
            "complete:3",
        ]
    );
}

#[tokio::test]
async fn progress_reports_the_failing_stage() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let stub = StubProvider::new(vec![Err(ProviderError::Api(
        "404 models/gpt-x does not exist".into(),
    ))]);
    let _ = Pipeline::new(stub, config).run(RESUME, RunMode::Unified).await;

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events.last().map(String::as_str),
        Some("error:unified:model_unavailable")
    );
}

/// Cancels the run's token as soon as its first reply is delivered.
struct CancelAfterReply {
    inner: Arc<StubProvider>,
    cancel: CancellationToken,
}

#[async_trait]
impl GenerationProvider for CancelAfterReply {
    fn name(&self) -> &str {
        "cancel-after-reply"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let reply = self.inner.generate(request).await;
        self.cancel.cancel();
        reply
    }
}

#[tokio::test]
async fn progress_reports_cancellation_between_stages() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let stub = StubProvider::new(chained_replies());
    let cancel = CancellationToken::new();
    let provider = Arc::new(CancelAfterReply {
        inner: stub.clone(),
        cancel: cancel.clone(),
    });

    let err = assert_err!(
        Pipeline::new(provider, config)
            .run_with_cancel(RESUME, RunMode::Chained, &cancel)
            .await
    );
    assert!(matches!(err, ResumeInsightError::Cancelled { stage: Stage::Feedback }));
    assert_eq!(stub.calls(), 1);

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "run:chained:3",
            "start:extraction:0",
            "done:extraction",
            "error:feedback:cancelled",
        ]
    );
}

#[test]
fn pipeline_is_send_sync_and_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Pipeline>();
    assert_send_sync::<PipelineConfig>();
}

// ── Classifier ───────────────────────────────────────────────────────────────

#[test]
fn classifier_is_total() {
    let samples = [
        ProviderError::EmptyResponse,
        ProviderError::Api(String::new()),
        ProviderError::Api("429 Too Many Requests".into()),
        ProviderError::Api("Permission denied on model".into()),
        ProviderError::Api("connection reset by peer".into()),
        ProviderError::Api("ünïcödé 💥".into()),
    ];
    for e in &samples {
        assert!(matches!(
            classify(e),
            ErrorCategory::QuotaExceeded
                | ErrorCategory::ModelUnavailable
                | ErrorCategory::EmptyResponse
                | ErrorCategory::Unknown
        ));
    }
}

// ── Document acquisition ─────────────────────────────────────────────────────

/// Build a PDF with one text line per page, or `None` when pdfium is unavailable.
fn build_pdf(pages: &[&str]) -> Option<Vec<u8>> {
    use pdfium_render::prelude::*;

    let pdfium = match pdfium_auto::bind_pdfium_silent() {
        Ok(p) => p,
        Err(e) => {
            println!("SKIP: pdfium unavailable ({e})");
            return None;
        }
    };
    let mut document = pdfium.create_new_pdf().unwrap();
    let font = document.fonts_mut().helvetica();
    for text in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .unwrap();
        if text.is_empty() {
            continue;
        }
        page.objects_mut()
            .create_text_object(
                PdfPoints::new(72.0),
                PdfPoints::new(720.0),
                text,
                font,
                PdfPoints::new(12.0),
            )
            .unwrap();
    }
    Some(document.save_to_bytes().unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn two_page_pdf_extracts_in_page_order() {
    let Some(bytes) = build_pdf(&["Senior   Engineer", "5 years experience"]) else {
        return;
    };
    let text = extract_text(bytes.clone(), "application/pdf").await.unwrap();
    assert_eq!(text, "Senior Engineer\n5 years experience");

    let again = extract_text(bytes, "application/pdf").await.unwrap();
    assert_eq!(text, again, "extraction must be idempotent");
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_pdf_is_extraction_failure() {
    let Some(bytes) = build_pdf(&[""]) else {
        return;
    };
    let err = extract_text(bytes, "application/pdf").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ExtractionFailed);
}

#[tokio::test(flavor = "multi_thread")]
async fn password_protected_pdf_is_extraction_failure() {
    if let Err(e) = pdfium_auto::bind_pdfium_silent() {
        println!("SKIP: pdfium unavailable ({e})");
        return;
    }
    let bytes = include_bytes!("fixtures/protected.pdf").to_vec();
    let err = extract_text(bytes, "application/pdf").await.unwrap_err();
    assert!(matches!(err, ResumeInsightError::PasswordProtected), "got {err:?}");
    assert_eq!(err.category(), ErrorCategory::ExtractionFailed);
}

#[tokio::test]
async fn blank_text_document_is_extraction_failure() {
    let err = extract_text(b"   \n\n\t".to_vec(), "text/plain").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ExtractionFailed);

    let stub = StubProvider::new(chained_replies());
    let config = PipelineConfig::builder().provider(stub.clone()).build().unwrap();
    let err = assert_err!(
        analyze_document(
            DocumentSource::Document {
                bytes: b"  \n".to_vec(),
                media_type: "text/plain".into(),
            },
            RunMode::Chained,
            &config,
        )
        .await
    );
    assert_eq!(err.category(), ErrorCategory::ExtractionFailed);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn configured_download_timeout_reaches_the_client() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let stub = StubProvider::new(chained_replies());
    let config = PipelineConfig::builder()
        .provider(stub.clone())
        .download_timeout_secs(1)
        .build()
        .unwrap();
    let url = format!("http://{addr}/resume.pdf");
    let err = assert_err!(analyze_input(&url, None, RunMode::Chained, &config).await);
    assert!(matches!(err, ResumeInsightError::DownloadTimeout { secs: 1, .. }), "got {err:?}");
    assert_eq!(stub.calls(), 0);
    server.abort();
}

#[tokio::test]
async fn truncated_pdf_is_extraction_failure() {
    let err = extract_text(b"%PDF-1.7\n%garbage".to_vec(), "application/pdf")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ExtractionFailed);
}

#[tokio::test]
async fn analyze_document_runs_on_plain_text_documents() {
    let stub = StubProvider::new(chained_replies());
    let config = PipelineConfig::builder().provider(stub.clone()).build().unwrap();
    let out = analyze_document(
        DocumentSource::Document {
            bytes: RESUME.as_bytes().to_vec(),
            media_type: "text/plain; charset=utf-8".into(),
        },
        RunMode::Chained,
        &config,
    )
    .await
    .unwrap();
    assert_eq!(out.result.career.job_role_recommendations[0].title, "Principal Engineer");
    assert!(stub.prompt(0).contains("Led the platform team."));
}

#[tokio::test]
async fn unsupported_media_type_never_reaches_the_provider() {
    let stub = StubProvider::new(chained_replies());
    let config = PipelineConfig::builder().provider(stub.clone()).build().unwrap();
    let err = assert_err!(
        analyze_document(
            DocumentSource::Document {
                bytes: b"%PDF-1.7".to_vec(),
                media_type:
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                        .into(),
            },
            RunMode::Unified,
            &config,
        )
        .await
    );
    assert_eq!(err.category(), ErrorCategory::InputInvalid);
    assert_eq!(stub.calls(), 0);
}
