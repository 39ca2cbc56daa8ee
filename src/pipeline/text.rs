//! Text-layer extraction via pdfium.
//!
//! Runs in `spawn_blocking`: pdfium is a C++ library with thread-local
//! state and must not be driven from Tokio worker threads.

use crate::error::ExtractError;
use crate::pipeline::pdfium::{bind_pdfium, open_document};
use std::path::Path;
use tracing::{debug, info};

/// Separator placed between pages in [`DocumentText::full_text`].
pub const PAGE_JOIN: &str = "\n\n";

/// The text layer of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentText {
    /// All pages joined with [`PAGE_JOIN`].
    pub full_text: String,
    /// One entry per page, in page order (empty for image-only pages).
    pub pages: Vec<String>,
}

impl DocumentText {
    /// Assemble from per-page texts.
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self {
            full_text: pages.join(PAGE_JOIN),
            pages,
        }
    }
}

/// Extract the text of every page.
pub async fn extract_text(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentText, ExtractError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_text_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| ExtractError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn extract_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentText, ExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ExtractError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();
        debug!("Page {}: {} chars of text", idx + 1, text.chars().count());
        pages.push(text);
    }

    info!("Extracted text from {} pages", pages.len());
    Ok(DocumentText::from_pages(pages))
}
