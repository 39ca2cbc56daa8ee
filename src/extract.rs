//! Extraction entry points: one invoice PDF in, one canonical record out.
//!
//! The pipeline is strictly sequential and makes exactly one model call per
//! document. See [`crate::pipeline`] for the individual stages.

use crate::config::{ExtractionConfig, ProviderKind};
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionResult, ExtractionStats};
use crate::pipeline::llm::{self, ModelInput};
use crate::pipeline::recover::{parse_model_output, ParseOutcome};
use crate::pipeline::sniff::{choose_mode, ExtractionMode, TextDensity};
use crate::pipeline::{encode, input, normalize, render, text};
use crate::progress::Stage;
use crate::prompts::truncate_chars;
use crate::schema::Schema;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Environment variable the Vertex AI provider reads its region from.
pub const VERTEX_REGION_ENV: &str = "GOOGLE_CLOUD_REGION";

/// Extract the canonical invoice record from a local PDF.
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Encrypted or corrupt PDF, pdfium not available
/// - Provider not configured or the model call failed
///
/// A model reply that is not valid JSON, or that omits fields, is not an
/// error: the result is still fully shaped, with empty strings where data
/// is missing. Check `output.stats.parse_outcome`.
pub async fn extract(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_input(pdf_path)?;
    info!("Starting extraction: {}", pdf_path.display());

    // Fail on provider setup before doing any PDF work.
    let provider = resolve_provider(config)?;

    // ── Step 1: Text layer ───────────────────────────────────────────────
    notify_stage(config, Stage::ReadingText);
    let doc_text = text::extract_text(&pdf_path, config.password.as_deref()).await?;

    // ── Step 2: Sniff ────────────────────────────────────────────────────
    let density = TextDensity::measure(&doc_text.pages);
    let mode = choose_mode(&density, config.text_density_threshold, config.allow_vision);
    info!(
        "{} pages, {:.1} chars/page → {:?} mode",
        density.page_count, density.avg_chars_per_page, mode
    );
    if mode == ExtractionMode::SparseText {
        warn!(
            "Sparse text layer ({:.1} chars/page) and vision disabled; extraction will likely be poor",
            density.avg_chars_per_page
        );
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_mode_selected(mode, density.page_count);
    }

    // ── Step 3: Build model input ────────────────────────────────────────
    let mut text_truncated = false;
    let mut images_sent = 0;
    let model_input = if mode.uses_images() {
        notify_stage(config, Stage::Rendering);
        let rendered = render::render_pages(&pdf_path, config).await?;
        let images = encode::encode_pages(&rendered)?;
        images_sent = images.len();
        ModelInput::Images(images)
    } else {
        let (body, truncated) = truncate_chars(&doc_text.full_text, config.max_text_chars);
        if truncated {
            warn!(
                "Document text truncated to {} characters",
                config.max_text_chars
            );
        }
        text_truncated = truncated;
        ModelInput::Text(body.to_string())
    };

    // ── Step 4: Model call ───────────────────────────────────────────────
    notify_stage(config, Stage::QueryingModel);
    let messages = llm::build_messages(model_input, config);
    let reply = llm::invoke(&provider, &messages, config).await?;
    debug!("Model reply: {} chars", reply.content.len());

    // ── Step 5: Recover + normalise ──────────────────────────────────────
    notify_stage(config, Stage::Normalizing);
    let (result, parse_outcome) = interpret_response(&reply.content, &config.schema);

    let filled = result.filled_count();
    let total = result.field_count();
    let stats = ExtractionStats {
        page_count: density.page_count,
        avg_chars_per_page: density.avg_chars_per_page,
        text_truncated,
        images_sent,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        parse_outcome,
        filled_fields: filled,
        total_fields: total,
        llm_duration_ms: reply.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete: {}/{} fields filled, {}ms total",
        filled, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_complete(filled, total);
    }

    Ok(ExtractionOutput {
        result,
        mode,
        stats,
    })
}

/// Turn a raw model reply into a fully-shaped, cleaned record.
///
/// No I/O and never fails: unparseable replies yield an all-empty record.
pub fn interpret_response(raw: &str, schema: &Schema) -> (ExtractionResult, ParseOutcome) {
    let recovered = parse_model_output(raw);
    let result = normalize::normalize(&recovered.value, schema);
    (result, recovered.outcome)
}

/// Write a record as pretty-printed JSON (2-space indent, schema order).
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn write_result(
    output_path: impl AsRef<Path>,
    result: &ExtractionResult,
) -> Result<(), ExtractError> {
    let path = output_path.as_ref();
    let write_err = |e: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = result.to_json_pretty().map_err(|e| write_err(e.into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Extract a PDF and write the record directly to a file.
pub async fn extract_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let output = extract(pdf_path, config).await?;
    write_result(output_path, &output.result)?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn extract_sync(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(pdf_path, config))
}

/// Extract from PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] which is removed on
/// return.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    tmp.flush()
        .map_err(|e| ExtractError::Internal(format!("tempfile flush: {e}")))?;
    extract(tmp.path(), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn notify_stage(config: &ExtractionConfig, stage: Stage) {
    debug!("Stage: {}", stage.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}

/// Resolve the LLM provider.
///
/// 1. **Pre-built provider** (`config.provider`) is used as-is.
/// 2. Otherwise the factory builds the configured [`ProviderKind`] with
///    `config.model`, reading credentials from the environment
///    (`OPENAI_API_KEY`, or `GOOGLE_CLOUD_PROJECT` plus application-default
///    credentials for Vertex, never `GEMINI_API_KEY`). Vertex also gets
///    `config.location` as its region.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if config.provider_kind == ProviderKind::Vertex {
        debug!("Vertex region: {}", config.location);
        std::env::set_var(VERTEX_REGION_ENV, &config.location);
    }

    let factory_name = config.provider_kind.factory_name();
    let model = config.provider_kind.factory_model(&config.model);
    ProviderFactory::create_llm_provider(factory_name, &model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: config.provider_kind.to_string(),
            hint: provider_hint(config.provider_kind, &e.to_string()),
        }
    })
}

fn provider_hint(kind: ProviderKind, detail: &str) -> String {
    let setup = match kind {
        ProviderKind::OpenAi => "Set OPENAI_API_KEY.",
        ProviderKind::Vertex => {
            "Set GOOGLE_CLOUD_PROJECT and authenticate with `gcloud auth application-default login`."
        }
    };
    format!("{}\nError: {}", setup, detail)
}
