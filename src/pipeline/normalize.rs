//! Response normalisation: coerce any JSON value into the canonical shape,
//! then clean each field according to its [`FieldKind`].
//!
//! Both stages are total. They take whatever the model produced (an object
//! with missing sections, extra keys, nulls, numbers where strings were
//! expected, or not an object at all) and always return a fully-shaped
//! record. The return types carry no error variant on purpose: there is no
//! input for which normalisation fails.
//!
//! ## Stage order
//!
//! 1. [`ensure_all_fields`]: schema-driven lookup; absent or null → `""`.
//! 2. [`postprocess_all`]: per-field cleanup (trim, numeric stripping,
//!    date reformatting).
//!
//! Applying [`normalize`] to its own output (via
//! [`ExtractionResult::to_value`]) yields the same result.

use crate::output::{ExtractionResult, FieldValue, Record, ShapedRecord};
use crate::schema::{FieldKind, FieldSpec, Schema};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Accepted input date layouts, tried in order. The first that parses wins,
/// so `03/04/2024` is read month-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%d %b %Y",
];

/// Years below this came from fewer than four digits (`3/15/24`) and are
/// not trusted.
const MIN_YEAR: i32 = 1000;

/// Shape enforcement: a value for every schema field, nothing else.
///
/// Sections that are absent or not objects count as empty; fields that are
/// absent or `null` become `""`. Keys the schema does not name are dropped.
pub fn ensure_all_fields(parsed: &Value, schema: &Schema) -> ShapedRecord {
    Record::from_schema(schema, |section, spec| {
        parsed
            .get(section)
            .and_then(Value::as_object)
            .and_then(|fields| fields.get(spec.name))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    })
}

/// Field-level cleanup of a shaped record.
pub fn postprocess_all(shaped: ShapedRecord) -> ExtractionResult {
    shaped.map(clean_field)
}

/// Shape enforcement followed by field cleanup.
pub fn normalize(parsed: &Value, schema: &Schema) -> ExtractionResult {
    postprocess_all(ensure_all_fields(parsed, schema))
}

/// Clean a single raw value for `spec`.
pub fn clean_field(spec: &FieldSpec, raw: Value) -> FieldValue {
    let s = match raw {
        Value::Null => return FieldValue::Text(String::new()),
        Value::Number(n) => return FieldValue::Number(n),
        Value::Bool(b) => return FieldValue::Bool(b),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };

    let s = match spec.kind {
        FieldKind::Text => s,
        FieldKind::Numeric => strip_numeric(&s),
        FieldKind::Date => normalize_date(&s),
    };
    FieldValue::Text(s)
}

/// Drop currency symbols and thousands separators: `"$1,250.50"` → `"1250.50"`.
pub fn strip_numeric(s: &str) -> String {
    s.replace(['$', ','], "").trim().to_string()
}

/// Reformat a date as `YYYY-MM-DD`, or return the trimmed input unchanged.
pub fn normalize_date(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return String::new();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(s, fmt)
                .ok()
                .filter(|d| d.year() >= MIN_YEAR)
        })
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| s.to_string())
}
