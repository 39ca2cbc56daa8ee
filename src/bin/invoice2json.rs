//! CLI binary for edgequake-invoice2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and writes the JSON record.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_invoice2json::{
    extract_to_file, ExtractionConfig, ExtractionMode, ExtractionProgressCallback, ParseOutcome,
    ProgressCallback, ProviderKind, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner showing the current pipeline stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_mode_selected(&self, mode: ExtractionMode, page_count: usize) {
        let line = match mode {
            ExtractionMode::Text => format!("text layer, {page_count} pages"),
            ExtractionMode::Vision => format!("scanned, sending {page_count} page images"),
            ExtractionMode::SparseText => {
                yellow(&format!("sparse text, {page_count} pages (vision disabled)"))
            }
        };
        self.bar.println(format!("{} {}", cyan("◆"), line));
    }

    fn on_complete(&self, filled: usize, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} fields filled",
            green("✔"),
            filled,
            total
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Text-layer or scanned invoice, OpenAI
  invoice2json --pdf invoice.pdf

  # Vertex AI in another region, custom output path
  invoice2json --pdf invoice.pdf --provider vertex --model gemini-1.5-pro \
      --location europe-west4 --out out/invoice.json

  # Never send page images; use whatever text the PDF has
  invoice2json --pdf scan.pdf --no-vision

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (provider openai)
  GOOGLE_CLOUD_PROJECT    GCP project (provider vertex, with application-default credentials)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; otherwise the system library is used
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Extract structured data from pharmacy invoice PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2json",
    version,
    about = "Extract structured JSON from pharmacy invoice PDFs using LLMs",
    long_about = "Read a pharmacy/health invoice PDF, send its text (or page images when the \
text layer is too sparse) to an LLM, and write a JSON record with a fixed set of sections \
and fields. Missing fields are empty strings; dates are YYYY-MM-DD where recognisable.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Invoice PDF to read.
    #[arg(long, env = "INVOICE2JSON_PDF")]
    pdf: PathBuf,

    /// LLM provider: openai or vertex.
    #[arg(long, env = "INVOICE2JSON_PROVIDER", default_value = "openai")]
    provider: String,

    /// Model ID (e.g. gpt-4o-mini, gpt-4o, gemini-1.5-pro).
    #[arg(long, env = "INVOICE2JSON_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Vertex AI region.
    #[arg(long, env = "INVOICE2JSON_LOCATION", default_value = "us-central1")]
    location: String,

    /// Never send page images, even for scanned PDFs.
    #[arg(long, env = "INVOICE2JSON_NO_VISION")]
    no_vision: bool,

    /// Output JSON path.
    #[arg(long, env = "INVOICE2JSON_OUT", default_value = "invoice_payload.json")]
    out: PathBuf,

    /// Average characters per page above which the text layer is used.
    #[arg(long, env = "INVOICE2JSON_TEXT_THRESHOLD", default_value_t = 300)]
    text_threshold: usize,

    /// Maximum characters of document text sent to the model.
    #[arg(long, env = "INVOICE2JSON_MAX_TEXT_CHARS", default_value_t = 150_000)]
    max_text_chars: usize,

    /// Rendering DPI for vision mode (72–400).
    #[arg(long, env = "INVOICE2JSON_DPI", default_value_t = 220,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "INVOICE2JSON_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "INVOICE2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "INVOICE2JSON_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "INVOICE2JSON_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "INVOICE2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the final line.
    #[arg(short, long, env = "INVOICE2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_to_file(&cli.pdf, &cli.out, &config)
        .await
        .context("Extraction failed")?;

    if !cli.quiet {
        if output.stats.parse_outcome == ParseOutcome::Unparseable {
            eprintln!(
                "{} model reply was not JSON; wrote an empty record",
                yellow("⚠")
            );
        }
        eprintln!(
            "   {} mode  {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&format!("{:?}", output.mode).to_lowercase()),
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    println!("Wrote {}", cli.out.display());
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let provider_kind: ProviderKind = cli.provider.parse().context("Invalid --provider")?;

    let mut builder = ExtractionConfig::builder()
        .provider_kind(provider_kind)
        .model(cli.model.clone())
        .location(cli.location.clone())
        .allow_vision(!cli.no_vision)
        .text_density_threshold(cli.text_threshold)
        .max_text_chars(cli.max_text_chars)
        .vision_dpi(cli.dpi)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::parse_from(["invoice2json", "--pdf", "invoice.pdf"]);
        assert_eq!(cli.provider, "openai");
        assert_eq!(cli.model, "gpt-4o-mini");
        assert_eq!(cli.location, "us-central1");
        assert_eq!(cli.out, PathBuf::from("invoice_payload.json"));
        assert_eq!(cli.dpi, 220);
        assert!(!cli.no_vision);
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let cli = Cli::parse_from(["invoice2json", "--pdf", "x.pdf", "--provider", "anthropic"]);
        let err = build_config(&cli, None).await.unwrap_err();
        assert!(format!("{err:#}").contains("openai, vertex"));
    }

    #[tokio::test]
    async fn no_vision_flag_disables_images() {
        let cli = Cli::parse_from(["invoice2json", "--pdf", "x.pdf", "--no-vision"]);
        let config = build_config(&cli, None).await.unwrap();
        assert!(!config.allow_vision);
    }
}
