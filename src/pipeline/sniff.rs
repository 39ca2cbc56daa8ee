//! Document sniffing: does the PDF have a usable text layer?
//!
//! Scanned invoices usually come out of text extraction with a handful of
//! characters per page (a stamp, a page number). Born-digital invoices
//! carry hundreds. The average character count per page is a cheap,
//! deterministic proxy that needs nothing beyond the text we already pulled.

use serde::Serialize;

/// Default characters-per-page threshold above which the text layer is
/// trusted.
pub const DEFAULT_TEXT_DENSITY_THRESHOLD: usize = 300;

/// Measurements taken from the per-page text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDensity {
    pub page_count: usize,
    pub total_chars: usize,
    /// `total_chars / max(1, page_count)`.
    pub avg_chars_per_page: f64,
}

impl TextDensity {
    /// Measure page texts. Characters are Unicode scalar values, not bytes.
    pub fn measure<S: AsRef<str>>(pages: &[S]) -> Self {
        let total_chars: usize = pages.iter().map(|p| p.as_ref().chars().count()).sum();
        let page_count = pages.len();
        Self {
            page_count,
            total_chars,
            avg_chars_per_page: total_chars as f64 / page_count.max(1) as f64,
        }
    }

    /// `true` when the average strictly exceeds `threshold`.
    pub fn text_ok(&self, threshold: usize) -> bool {
        self.avg_chars_per_page > threshold as f64
    }
}

/// What the model is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// The text layer is dense enough.
    Text,
    /// The text layer is sparse but vision is disabled; send it anyway.
    SparseText,
    /// Rasterised page images.
    Vision,
}

impl ExtractionMode {
    pub fn uses_images(self) -> bool {
        matches!(self, ExtractionMode::Vision)
    }
}

/// Pick the extraction mode for a document.
pub fn choose_mode(density: &TextDensity, threshold: usize, allow_vision: bool) -> ExtractionMode {
    if density.text_ok(threshold) {
        ExtractionMode::Text
    } else if allow_vision {
        ExtractionMode::Vision
    } else {
        ExtractionMode::SparseText
    }
}
