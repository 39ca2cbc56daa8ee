//! Prompts for LLM-based invoice extraction.
//!
//! Every prompt string lives here so prompt changes touch one file and can
//! be inspected by unit tests without a model. Callers can override the
//! system prompt via [`crate::config::ExtractionConfig::system_prompt`].

use crate::schema::Schema;

/// Default system prompt for invoice extraction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert invoice parser for pharmacy/health invoices.\n\
Return ONLY a JSON object that exactly matches the provided canonical schema keys.\n\
If a field is not present in the document, set it to an empty string \"\".\n\
Rules:\n\
- Dates as YYYY-MM-DD when possible.\n\
- Numbers as plain numerals (no currency symbols or commas).\n\
- Do not invent or infer beyond the document.\n";

const SCHEMA_PREAMBLE: &str =
    "Canonical schema (section -> keys). Produce JSON with exactly these sections and keys:\n";

const SCHEMA_CLOSING: &str =
    "\n\nExtract values from the attached document (or accompanying text).";

const DOCUMENT_TEXT_HEADER: &str = "\n\nDocument text:\n";

/// The user instruction: the schema's section → field-name listing as
/// 2-space-indented JSON, framed by fixed sentences. Values are never sent.
pub fn user_instruction(schema: &Schema) -> String {
    // Serialising a map of &str → [&str] cannot fail.
    let listing = serde_json::to_string_pretty(&schema.listing()).unwrap_or_default();
    format!("{SCHEMA_PREAMBLE}{listing}{SCHEMA_CLOSING}")
}

/// The user message for text mode: instruction followed by the document
/// text, already truncated by the caller.
pub fn text_mode_message(schema: &Schema, document_text: &str) -> String {
    format!(
        "{}{DOCUMENT_TEXT_HEADER}{document_text}",
        user_instruction(schema)
    )
}

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the (possibly borrowed) text and whether it was shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CANONICAL_SCHEMA;

    #[test]
    fn system_prompt_states_the_rules() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Return ONLY a JSON object"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("YYYY-MM-DD"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("empty string \"\""));
    }

    #[test]
    fn instruction_embeds_indented_listing() {
        let s = user_instruction(&CANONICAL_SCHEMA);
        assert!(s.starts_with(SCHEMA_PREAMBLE));
        assert!(s.contains("{\n  \"order_metadata\": [\n    \"order_id\",\n    \"order_date\","));
        assert!(s.contains("\"patient_encounters\"\n  ]\n}"));
        assert!(s.ends_with(SCHEMA_CLOSING));
    }

    #[test]
    fn text_message_appends_document() {
        let s = text_mode_message(&CANONICAL_SCHEMA, "INVOICE #42");
        assert!(s.ends_with("\n\nDocument text:\nINVOICE #42"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
        assert_eq!(truncate_chars("héllo", 5), ("héllo", false));
        assert_eq!(truncate_chars("", 3), ("", false));
    }
}
