//! Pipeline stages for invoice-to-JSON extraction.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ sniff ──┬──▶ llm ──▶ recover ──▶ normalize
//! (path)  (pdfium)  (density) │  (1 call)  (fences)   (shape/clean)
//!                             └─ render ──▶ encode ──┘
//!                                (vision mode only)
//! ```
//!
//! 1. [`input`]     — validate the local path and `%PDF` magic bytes
//! 2. [`text`]      — pull the text layer of every page via [`pdfium`]
//! 3. [`sniff`]     — measure text density and pick text or vision mode
//! 4. [`render`] + [`encode`] — rasterise pages to PNG attachments
//! 5. [`llm`]       — the single model call; the only stage with network I/O
//! 6. [`recover`]   — strip code fences and parse, falling back to `{}`
//! 7. [`normalize`] — fill the canonical shape and clean field values

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod pdfium;
pub mod recover;
pub mod render;
pub mod sniff;
pub mod text;
