//! # edgequake-invoice2json
//!
//! Extract a fixed, canonical JSON record from pharmacy/health invoice PDFs
//! using an LLM.
//!
//! ## Why this crate?
//!
//! Invoices from different pharmacies share the same facts (order, patient,
//! prescriber, payment, shipping, medication, clinical notes) in wildly
//! different layouts. Instead of writing a template per vendor, this crate
//! hands the document to an LLM with a fixed field list and then forces
//! whatever comes back into one deterministic shape: every section, every
//! field, empty strings where nothing was found, ISO dates, bare numbers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the local path and %PDF header
//!  ├─ 2. Text       per-page text layer via pdfium (spawn_blocking)
//!  ├─ 3. Sniff      > 300 chars/page → text mode, else vision mode
//!  ├─ 4. Render     vision only: pages → 220 DPI PNG → base64
//!  ├─ 5. LLM        one call to gpt-4o-mini / Vertex Gemini / …
//!  ├─ 6. Recover    strip ``` fences, parse JSON, fall back to {}
//!  └─ 7. Normalise  all 7 sections × 99 fields, dates + numbers cleaned
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_invoice2json::{extract_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY from the environment
//!     let config = ExtractionConfig::default();
//!     let output = extract_to_file("invoice.pdf", "invoice_payload.json", &config).await?;
//!     eprintln!("{:?} mode, {}/{} fields filled",
//!         output.mode,
//!         output.stats.filled_fields,
//!         output.stats.total_fields);
//!     Ok(())
//! }
//! ```
//!
//! Already have a model reply? [`interpret_response`] runs only the
//! recovery and normalisation stages, with no I/O:
//!
//! ```rust
//! use edgequake_invoice2json::{interpret_response, CANONICAL_SCHEMA};
//!
//! let (record, _) = interpret_response(r#"{"medication_prescription_data": {"tax_amount": "$1,020.00"}}"#, &CANONICAL_SCHEMA);
//! assert_eq!(record.get("medication_prescription_data", "tax_amount").and_then(|v| v.as_str()), Some("1020.00"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-invoice2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ProviderKind};
pub use error::ExtractError;
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, interpret_response, write_result,
};
pub use output::{
    ExtractionOutput, ExtractionResult, ExtractionStats, FieldValue, Record, SectionRecord,
    ShapedRecord,
};
pub use pipeline::normalize::{ensure_all_fields, normalize, postprocess_all};
pub use pipeline::recover::ParseOutcome;
pub use pipeline::sniff::ExtractionMode;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use schema::{FieldKind, FieldSpec, Schema, SectionSpec, CANONICAL_SCHEMA};
