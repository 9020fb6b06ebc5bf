//! Pipeline stages for resume analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the orchestrator only wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ invoke(stage) ──▶ postprocess ──▶ validate
//! (path/URL)  (pdfium)    (provider)       (JSON cleanup)   (contract)
//! ```
//!
//! 1. [`input`] resolves a path, URL or stdin into a [`input::DocumentSource`].
//! 2. [`extract`] turns a source into plain resume text. PDF pages are read
//!    on the blocking pool because pdfium is not async-safe.
//! 3. [`invoke`] is the generic stage invoker: render the template, call the
//!    provider with timeout and cancellation, validate the answer.
//! 4. [`postprocess`] holds the deterministic cleanup of model output and page text.
//! 5. [`stages`] builds the four concrete invokers and the projections between them.

pub mod extract;
pub mod input;
pub mod invoke;
pub mod postprocess;
pub mod stages;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One model-backed transformation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extraction,
    Feedback,
    Recommendations,
    Unified,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Feedback => "feedback",
            Stage::Recommendations => "recommendations",
            Stage::Unified => "unified",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
