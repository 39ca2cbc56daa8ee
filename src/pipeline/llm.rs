//! Model interaction: build the request for the chosen mode and call the
//! provider once.
//!
//! Prompt wording lives in [`crate::prompts`]; this module only assembles
//! messages and maps provider failures. There is no retry loop: a failed
//! call fails the extraction with [`ExtractError::LlmApiError`].

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::prompts::{text_mode_message, user_instruction, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// What the user turn carries.
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// Extracted document text, already truncated.
    Text(String),
    /// One high-detail PNG per page.
    Images(Vec<ImageData>),
}

/// Raw reply from a single model call.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Build the two-message request: system prompt, then the user turn.
///
/// Text mode sends the schema instruction followed by the document text.
/// Vision mode sends the schema instruction as the text part and the page
/// images as attachments, in page order.
pub fn build_messages(input: ModelInput, config: &ExtractionConfig) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let user = match input {
        ModelInput::Text(text) => ChatMessage::user(text_mode_message(&config.schema, &text)),
        ModelInput::Images(images) => {
            ChatMessage::user_with_images(user_instruction(&config.schema), images)
        }
    };

    vec![ChatMessage::system(system_prompt), user]
}

/// Send the request and return the raw content.
pub async fn invoke(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    config: &ExtractionConfig,
) -> Result<ModelReply, ExtractError> {
    let start = Instant::now();
    let options = build_options(config);

    let response = provider
        .chat(messages, Some(&options))
        .await
        .map_err(|e| {
            warn!("Model call failed: {}", e);
            ExtractError::LlmApiError {
                message: e.to_string(),
            }
        })?;

    let duration = start.elapsed();
    debug!(
        "{} input tokens, {} output tokens, {:?}",
        response.prompt_tokens, response.completion_tokens, duration
    );

    Ok(ModelReply {
        content: response.content,
        input_tokens: response.prompt_tokens,
        output_tokens: response.completion_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
