//! Raw-output recovery: turn the model's reply text into a JSON value.
//!
//! Models are told to return a bare JSON object, and most do. The common
//! deviation is wrapping it in a ```` ```json ```` fence. Recovery is one
//! direct parse, then one parse after stripping the fence, then an empty
//! object. There is no third attempt and no re-query of the model: an
//! unparseable reply becomes an all-empty result downstream.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// How the raw reply was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    /// Valid JSON as returned.
    Direct,
    /// Valid JSON once a surrounding code fence was removed.
    FenceStripped,
    /// Not JSON even after fence stripping; replaced by `{}`.
    Unparseable,
}

/// A recovered JSON value and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub outcome: ParseOutcome,
}

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*|\s*```$").expect("valid fence regex"));

/// Remove a leading ```` ``` ````/```` ```json ```` marker and a trailing
/// ```` ``` ```` from the trimmed text.
pub fn strip_code_fence(raw: &str) -> String {
    RE_FENCE.replace_all(raw.trim(), "").into_owned()
}

/// Parse a model reply. Never fails.
pub fn parse_model_output(raw: &str) -> Recovered {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Recovered {
            value,
            outcome: ParseOutcome::Direct,
        };
    }

    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => {
            debug!("Model output parsed after stripping code fence");
            Recovered {
                value,
                outcome: ParseOutcome::FenceStripped,
            }
        }
        Err(e) => {
            warn!(
                "Model output is not JSON ({}); continuing with empty result. {} bytes received",
                e,
                raw.len()
            );
            Recovered {
                value: Value::Object(Map::new()),
                outcome: ParseOutcome::Unparseable,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_json() {
        let r = parse_model_output(r#"{"order_metadata": {"order_id": "42"}}"#);
        assert_eq!(r.outcome, ParseOutcome::Direct);
        assert_eq!(r.value["order_metadata"]["order_id"], json!("42"));
    }

    #[test]
    fn json_fence_is_stripped() {
        let raw = "```json\n{\"order_metadata\": {\"order_id\": \"42\"}}\n```";
        let r = parse_model_output(raw);
        assert_eq!(r.outcome, ParseOutcome::FenceStripped);
        assert_eq!(r.value["order_metadata"]["order_id"], json!("42"));
    }

    #[test]
    fn bare_fence_is_stripped() {
        let raw = "  ```\n{\"clinical\": {}}\n```  \n";
        let r = parse_model_output(raw);
        assert_eq!(r.outcome, ParseOutcome::FenceStripped);
        assert_eq!(r.value, json!({"clinical": {}}));
    }

    #[test]
    fn garbage_becomes_empty_object() {
        let r = parse_model_output("not json at all");
        assert_eq!(r.outcome, ParseOutcome::Unparseable);
        assert_eq!(r.value, json!({}));
    }

    #[test]
    fn prose_around_fence_is_unparseable() {
        let r = parse_model_output("Here you go:\n```json\n{}\n```");
        assert_eq!(r.outcome, ParseOutcome::Unparseable);
    }

    #[test]
    fn non_object_json_is_kept_as_is() {
        // Shape enforcement downstream treats a non-object root as empty.
        let r = parse_model_output("[1, 2, 3]");
        assert_eq!(r.outcome, ParseOutcome::Direct);
        assert!(r.value.is_array());
    }

    #[test]
    fn strip_leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
