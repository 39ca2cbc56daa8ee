//! Progress-callback trait for extraction stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to be told
//! which stage the pipeline is in. The CLI uses it to drive a spinner; a
//! service could forward the events to a job-status record.
//!
//! # Example
//!
//! ```rust
//! use edgequake_invoice2json::{ExtractionConfig, ExtractionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl ExtractionProgressCallback for PrintStages {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("→ {}", stage.label());
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::sniff::ExtractionMode;
use std::sync::Arc;

/// Pipeline stages, in the order they run. `Rendering` only occurs in
/// vision mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadingText,
    Rendering,
    QueryingModel,
    Normalizing,
}

impl Stage {
    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::ReadingText => "Reading text layer",
            Stage::Rendering => "Rendering pages",
            Stage::QueryingModel => "Waiting for model",
            Stage::Normalizing => "Normalising fields",
        }
    }
}

/// Called by the extraction pipeline as it moves between stages.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the mode has been chosen.
    ///
    /// # Arguments
    /// * `mode`       — text, sparse text, or vision
    /// * `page_count` — pages in the document
    fn on_mode_selected(&self, mode: ExtractionMode, page_count: usize) {
        let _ = (mode, page_count);
    }

    /// Called after normalisation.
    ///
    /// # Arguments
    /// * `filled` — fields with a non-empty value
    /// * `total`  — fields in the schema
    fn on_complete(&self, filled: usize, total: usize) {
        let _ = (filled, total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
