//! Progress-callback trait for stage-level pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to be told
//! when each stage starts, finishes or fails. A chained run is three round
//! trips of several seconds each, so hosts usually want to show which one is
//! in flight.
//!
//! # Example
//!
//! ```rust
//! use resume_insight::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl PipelineProgressCallback for Log {
//!     fn on_stage_start(&self, stage: Stage, index: usize, total: usize) {
//!         eprintln!("[{}/{}] {}", index + 1, total, stage);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ResumeInsightError;
use crate::orchestrator::RunMode;
use crate::output::{RunStats, StageStats};
use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the orchestrator as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Independent runs may share one callback, so
/// implementations must be `Send + Sync`.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once, after input validation and before the first stage.
    fn on_run_start(&self, mode: RunMode, total_stages: usize) {
        let _ = (mode, total_stages);
    }

    /// Called just before a stage's request is sent.
    ///
    /// `index` is 0-based.
    fn on_stage_start(&self, stage: Stage, index: usize, total_stages: usize) {
        let _ = (stage, index, total_stages);
    }

    /// Called when a stage's response has been validated.
    fn on_stage_complete(&self, stats: &StageStats) {
        let _ = stats;
    }

    /// Called when a stage fails; the run aborts right after.
    fn on_stage_error(&self, stage: Stage, error: &ResumeInsightError) {
        let _ = (stage, error);
    }

    /// Called once when every stage succeeded.
    fn on_run_complete(&self, stats: &RunStats) {
        let _ = stats;
    }
}

/// A no-op callback, for explicitly opting out.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Type alias for the `Arc`-wrapped callback stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl PipelineProgressCallback for Counter {
        fn on_stage_start(&self, _stage: Stage, _index: usize, _total: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_stage_complete(&self, _stats: &StageStats) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_noops() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(RunMode::Unified, 1);
        cb.on_stage_error(Stage::Unified, &ResumeInsightError::EmptyResume);
    }

    #[test]
    fn overridden_methods_are_called() {
        let c = Counter {
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        };
        c.on_stage_start(Stage::Extraction, 0, 3);
        c.on_stage_complete(&StageStats {
            stage: Stage::Extraction,
            input_tokens: 1,
            output_tokens: 1,
            duration_ms: 1,
        });
        assert_eq!(c.started.load(Ordering::SeqCst), 1);
        assert_eq!(c.completed.load(Ordering::SeqCst), 1);
    }
}
