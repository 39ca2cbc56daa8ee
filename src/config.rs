//! Configuration types for invoice extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The defaults reproduce the reference
//! behaviour: OpenAI `gpt-4o-mini`, temperature 0, text mode above 300
//! characters per page, vision mode at 220 DPI otherwise.

use crate::error::ExtractError;
use crate::pipeline::sniff::DEFAULT_TEXT_DENSITY_THRESHOLD;
use crate::progress::ProgressCallback;
use crate::schema::{Schema, CANONICAL_SCHEMA};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default model when none is given.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default Vertex AI region.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Default character budget for the document text sent in text mode.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 150_000;

/// Default rasterisation DPI in vision mode.
pub const DEFAULT_VISION_DPI: u32 = 220;

/// The two supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions (`OPENAI_API_KEY`).
    #[default]
    OpenAi,
    /// Google Vertex AI (Gemini models), region-scoped.
    Vertex,
}

impl ProviderKind {
    /// Accepted spellings, for error messages.
    pub const EXPECTED: &'static str = "openai, vertex";

    /// The name this provider is known by on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Vertex => "vertex",
        }
    }

    /// The name `edgequake_llm::ProviderFactory` knows this provider by.
    pub fn factory_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Vertex => "vertexai",
        }
    }

    /// The model ID handed to the factory.
    ///
    /// The factory maps `vertexai` to its Gemini provider, which prefers the
    /// AI Studio endpoint (`GEMINI_API_KEY`) for a bare model ID. The
    /// `vertexai:` prefix pins it to the Vertex AI endpoint.
    pub fn factory_model(self, model: &str) -> String {
        match self {
            ProviderKind::OpenAi => model.to_string(),
            ProviderKind::Vertex if model.starts_with(VERTEX_MODEL_PREFIX) => model.to_string(),
            ProviderKind::Vertex => format!("{VERTEX_MODEL_PREFIX}{model}"),
        }
    }
}

/// Model-ID prefix selecting the Vertex AI endpoint in the factory.
const VERTEX_MODEL_PREFIX: &str = "vertexai:";

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "vertex" => Ok(ProviderKind::Vertex),
            _ => Err(ExtractError::UnknownProvider {
                name: s.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Configuration for one invoice extraction.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_invoice2json::{ExtractionConfig, ProviderKind};
///
/// let config = ExtractionConfig::builder()
///     .provider_kind(ProviderKind::Vertex)
///     .model("gemini-1.5-pro")
///     .location("europe-west4")
///     .allow_vision(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Which provider to create when `provider` is `None`. Default: OpenAI.
    pub provider_kind: ProviderKind,

    /// Model identifier. Default: `gpt-4o-mini`.
    pub model: String,

    /// Vertex AI region. Ignored by OpenAI. Default: `us-central1`.
    pub location: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_kind`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Render pages and use vision when the text layer is sparse. Default: true.
    ///
    /// When false, sparse documents are still sent in text mode with
    /// whatever text was extracted.
    pub allow_vision: bool,

    /// Average characters per page above which the text layer is used. Default: 300.
    pub text_density_threshold: usize,

    /// Maximum characters of document text sent in text mode. Default: 150 000.
    pub max_text_chars: usize,

    /// Rendering DPI in vision mode. Range: 72–400. Default: 220.
    pub vision_dpi: u32,

    /// Cap on either rendered image dimension, in pixels. Default: 2600.
    ///
    /// A letter page at 220 DPI is 1870 × 2420 px, which fits; oversized
    /// pages are scaled down to keep request bodies bounded.
    pub max_rendered_pixels: u32,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// The full canonical record with every field filled is well under
    /// 3 000 tokens.
    pub max_tokens: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses the built-in invoice prompt.
    pub system_prompt: Option<String>,

    /// Target schema. Default: [`CANONICAL_SCHEMA`].
    pub schema: Schema,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider_kind: ProviderKind::default(),
            model: DEFAULT_MODEL.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            provider: None,
            allow_vision: true,
            text_density_threshold: DEFAULT_TEXT_DENSITY_THRESHOLD,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            vision_dpi: DEFAULT_VISION_DPI,
            max_rendered_pixels: 2600,
            temperature: 0.0,
            max_tokens: 4096,
            password: None,
            system_prompt: None,
            schema: CANONICAL_SCHEMA,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("provider_kind", &self.provider_kind)
            .field("model", &self.model)
            .field("location", &self.location)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("allow_vision", &self.allow_vision)
            .field("text_density_threshold", &self.text_density_threshold)
            .field("max_text_chars", &self.max_text_chars)
            .field("vision_dpi", &self.vision_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("custom_system_prompt", &self.system_prompt.is_some())
            .field("sections", &self.schema.sections().len())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn provider_kind(mut self, kind: ProviderKind) -> Self {
        self.config.provider_kind = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = location.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn allow_vision(mut self, v: bool) -> Self {
        self.config.allow_vision = v;
        self
    }

    pub fn text_density_threshold(mut self, chars: usize) -> Self {
        self.config.text_density_threshold = chars;
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn vision_dpi(mut self, dpi: u32) -> Self {
        self.config.vision_dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(72..=400).contains(&c.vision_dpi) {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.vision_dpi
            )));
        }
        if c.max_text_chars == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_text_chars must be ≥ 1".into(),
            ));
        }
        if c.max_rendered_pixels < 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "max_rendered_pixels must be ≥ 100, got {}",
                c.max_rendered_pixels
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = ExtractionConfig::default();
        assert_eq!(c.provider_kind, ProviderKind::OpenAi);
        assert_eq!(c.model, "gpt-4o-mini");
        assert_eq!(c.location, "us-central1");
        assert!(c.allow_vision);
        assert_eq!(c.text_density_threshold, 300);
        assert_eq!(c.max_text_chars, 150_000);
        assert_eq!(c.vision_dpi, 220);
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn provider_kind_parses_known_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" Vertex ".parse::<ProviderKind>().unwrap(), ProviderKind::Vertex);
        assert_eq!(ProviderKind::Vertex.factory_name(), "vertexai");
    }

    #[test]
    fn vertex_models_are_pinned_to_the_vertex_endpoint() {
        assert_eq!(ProviderKind::OpenAi.factory_model("gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(
            ProviderKind::Vertex.factory_model("gemini-1.5-pro"),
            "vertexai:gemini-1.5-pro"
        );
        assert_eq!(
            ProviderKind::Vertex.factory_model("vertexai:gemini-1.5-pro"),
            "vertexai:gemini-1.5-pro"
        );
    }

    #[test]
    fn provider_kind_rejects_unknown_names() {
        let err = "anthropic".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ExtractError::UnknownProvider { ref name, .. } if name == "anthropic"));
    }

    #[test]
    fn builder_rejects_bad_dpi() {
        let err = ExtractionConfig::builder().vision_dpi(600).build().unwrap_err();
        assert!(err.to_string().contains("DPI"));
    }

    #[test]
    fn builder_rejects_zero_text_budget() {
        assert!(ExtractionConfig::builder().max_text_chars(0).build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ExtractionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
