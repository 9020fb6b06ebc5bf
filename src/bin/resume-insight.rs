//! CLI binary for resume-insight.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, retries retryable failures, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_insight::pipeline::extract::{document_kind, DocumentKind};
use resume_insight::{
    acquire_text, resolve_input, DocumentSource, Pipeline, PipelineConfig, PipelineOutput,
    PipelineProgressCallback, PipelineResult, ResumeInsightError, RunMode, RunStats, Stage,
    StageStats, UnknownFieldPolicy,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner for the stage in flight and a log
/// line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, mode: RunMode, total_stages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting {mode} analysis ({total_stages} stages)…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage, index: usize, total_stages: usize) {
        self.bar.set_prefix(format!("[{}/{}]", index + 1, total_stages));
        self.bar.set_message(format!("{stage}…"));
        self.bar.reset_elapsed();
    }

    fn on_stage_complete(&self, stats: &StageStats) {
        self.bar.println(format!(
            "  {} {:<16} {}  {}",
            green("✓"),
            stats.stage.to_string(),
            dim(&format!("{:>6} tokens out", stats.output_tokens)),
            dim(&format!("{:.1}s", stats.duration_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &ResumeInsightError) {
        self.bar.println(format!(
            "  {} {:<16} {}",
            red("✗"),
            stage.to_string(),
            red(error.category().as_str())
        ));
    }

    fn on_run_complete(&self, stats: &RunStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} analysis complete  {}",
            green("✔"),
            dim(&format!(
                "{} tokens in  /  {} tokens out  ({}ms)",
                stats.total_input_tokens, stats.total_output_tokens, stats.total_duration_ms
            ))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Chained analysis of a PDF resume (stdout)
  resume-insight resume.pdf

  # Single-call deep analysis with a rewritten resume
  resume-insight --mode unified resume.pdf -o report.md

  # Pasted text from stdin
  pbpaste | resume-insight -

  # Structured JSON (PipelineOutput) for another program
  resume-insight --json resume.txt > analysis.json

  # Only show the extracted text (no API key needed)
  resume-insight --extract-only resume.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
"#;

/// Analyse a resume: structured extraction, feedback and career recommendations.
#[derive(Parser, Debug)]
#[command(
    name = "resume-insight",
    version,
    about = "Analyse a resume with an LLM: extraction, feedback and career recommendations",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file (.pdf, .txt, .md), HTTP/HTTPS URL, or `-` for stdin.
    input: String,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "RESUME_INSIGHT_OUTPUT")]
    output: Option<PathBuf>,

    /// chained: three validated calls. unified: one call plus a rewritten resume.
    #[arg(long, env = "RESUME_INSIGHT_MODE", value_enum, default_value_t = RunMode::Chained)]
    mode: RunMode,

    /// Override the detected media type (e.g. application/pdf, text/plain).
    #[arg(long)]
    media_type: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gemini-2.0-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUME_INSIGHT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per chained stage.
    #[arg(long, env = "RESUME_INSIGHT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "RESUME_INSIGHT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RESUME_INSIGHT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Resubmit the whole run this many times on retryable failures.
    #[arg(long, env = "RESUME_INSIGHT_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Reject responses that contain fields the contract does not declare.
    #[arg(long)]
    strict: bool,

    /// Output structured JSON (PipelineOutput) instead of a Markdown report.
    #[arg(long, env = "RESUME_INSIGHT_JSON")]
    json: bool,

    /// Print the acquired resume text and exit; no LLM call is made.
    #[arg(long)]
    extract_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME_INSIGHT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUME_INSIGHT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the per-stage feedback, so INFO logs are muted
    // while it is shown.
    let show_progress = !cli.quiet && !cli.json && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Acquire resume text ──────────────────────────────────────────────
    let source = resolve_input(&cli.input, cli.media_type.as_deref(), &config)
        .await
        .with_context(|| format!("Failed to read '{}'", cli.input))?;

    if is_pdf(&source) {
        ensure_pdf_engine(cli.quiet)?;
    }

    let text = match acquire_text(source).await {
        Ok(text) => text,
        Err(e) => return Err(report_failure(e)),
    };

    if cli.extract_only {
        return write_output(cli.output.as_deref(), &text);
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let pipeline = Pipeline::from_config(config).map_err(report_failure)?;

    // ── Run with caller-side retries ─────────────────────────────────────
    let output = run_with_retries(&pipeline, &text, cli.mode, cli.max_retries, cli.quiet)
        .await
        .map_err(report_failure)?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")?
    } else {
        render_report(&output.result)
    };
    write_output(cli.output.as_deref(), &rendered)?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "Analysed in {}ms  ({} tokens in / {} tokens out)",
            output.stats.total_duration_ms,
            output.stats.total_input_tokens,
            output.stats.total_output_tokens
        );
    }

    Ok(())
}

fn is_pdf(source: &DocumentSource) -> bool {
    matches!(
        source,
        DocumentSource::Document { media_type, .. } if document_kind(media_type) == Some(DocumentKind::Pdf)
    )
}

/// Make sure a pdfium library is available before extraction starts.
///
/// On first use without `bundled`, the library (~30 MB) is downloaded once
/// and cached; later runs only check the cache path.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    #[cfg(feature = "bundled")]
    {
        let _ = quiet;
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if quiet {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        } else {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .unknown_fields(if cli.strict {
            UnknownFieldPolicy::Reject
        } else {
            UnknownFieldPolicy::Tolerate
        });

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if !cli.quiet && !cli.json {
        builder = builder.progress_callback(CliProgressCallback::new());
    }

    builder.build().context("Invalid configuration")
}

/// Resubmit the whole run on retryable failures.
///
/// Waits the error's own cooldown when it has one, otherwise backs off
/// exponentially from one second.
async fn run_with_retries(
    pipeline: &Pipeline,
    text: &str,
    mode: RunMode,
    max_retries: u32,
    quiet: bool,
) -> Result<PipelineOutput, ResumeInsightError> {
    let mut attempt = 0;
    loop {
        match pipeline.run(text, mode).await {
            Ok(output) => return Ok(output),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let wait = e
                    .retry_after()
                    .unwrap_or_else(|| Duration::from_secs(1u64 << attempt.min(5)));
                attempt += 1;
                warn!("Attempt {} failed ({}); retrying in {:?}", attempt, e.category(), wait);
                if !quiet {
                    eprintln!(
                        "{} {}  retrying in {}s ({}/{})",
                        cyan("⚠"),
                        e.category(),
                        wait.as_secs(),
                        attempt,
                        max_retries
                    );
                }
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Print category guidance and turn the error into an `anyhow` report.
fn report_failure(e: ResumeInsightError) -> anyhow::Error {
    if let Some(guidance) = e.guidance() {
        eprintln!("{} {}", red("✘"), bold(guidance));
    }
    anyhow::Error::new(e).context("Analysis failed")
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            if !content.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

/// Render a result as a Markdown report.
fn render_report(result: &PipelineResult) -> String {
    let mut out = String::new();
    let a = &result.analysis;

    out.push_str("# Resume Analysis\n\n");
    out.push_str(&format!("{}\n\n", a.overall_summary));

    out.push_str("## Skills\n\n");
    out.push_str(&bullets(a.skills.iter().map(String::as_str)));

    out.push_str("## Experience\n\n");
    for e in &a.experience {
        out.push_str(&format!("- **{}**, {} ({})  \n  {}\n", e.job_title, e.company, e.duration, e.summary));
    }
    out.push('\n');

    out.push_str("## Education\n\n");
    for e in &a.education {
        out.push_str(&format!(
            "- {} in {}, {} ({})\n",
            e.degree, e.field_of_study, e.institution, e.graduation_date
        ));
    }
    out.push('\n');

    let f = &result.feedback;
    out.push_str("# Feedback\n\n");
    out.push_str(&format!("{}\n\n", f.overall_summary));
    for (heading, items) in [
        ("Strengths", &f.strengths),
        ("Weaknesses", &f.weaknesses),
        ("Suggestions", &f.suggestions),
    ] {
        out.push_str(&format!("## {heading}\n\n"));
        for item in items {
            out.push_str(&format!("- **{}**: {}\n", item.title, item.description));
        }
        out.push('\n');
    }

    let c = &result.career;
    out.push_str("# Career Recommendations\n\n## Career Paths\n\n");
    for p in &c.career_paths {
        out.push_str(&format!("### {}\n\n{}\n\n", p.name, p.description));
        out.push_str(&bullets(p.growth_opportunities.iter().map(String::as_str)));
    }
    out.push_str("## Job Roles\n\n");
    for r in &c.job_role_recommendations {
        out.push_str(&format!("### {}\n\n{}\n\n", r.title, r.description));
        out.push_str(&format!("Relevant skills: {}  \n", r.relevant_skills.join(", ")));
        out.push_str(&format!("Search keywords: {}\n\n", r.keywords.join(", ")));
    }

    if !result.revised_resume_markdown.is_empty() {
        out.push_str("---\n\n# Revised Resume\n\n");
        out.push_str(&result.revised_resume_markdown);
        out.push('\n');
    }

    out
}

fn bullets<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let mut out: String = items.map(|s| format!("- {s}\n")).collect();
    out.push('\n');
    out
}
