//! Output types: the shaped extraction record and per-run statistics.
//!
//! [`Record`] is generic over the value type so the two normaliser stages
//! share one shape: [`ShapedRecord`] holds the model's raw JSON values right
//! after shape enforcement, [`ExtractionResult`] holds the cleaned values.
//! Both can only be built from a [`Schema`], so their section and field
//! sets are always exactly the schema's.

use crate::pipeline::recover::ParseOutcome;
use crate::pipeline::sniff::ExtractionMode;
use crate::schema::{FieldSpec, Schema};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Number, Value};

/// A cleaned field value.
///
/// Serialises untagged: `Text` as a JSON string, `Number` and `Bool` as the
/// matching JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// A number the model already returned as a JSON number; kept verbatim.
    Number(Number),
    /// A JSON boolean; kept verbatim.
    Bool(bool),
}

impl FieldValue {
    /// The text value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) | FieldValue::Bool(_) => None,
        }
    }

    /// `true` for an empty string. Numbers and booleans are never empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl From<FieldValue> for Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Text(s) => Value::String(s),
            FieldValue::Number(n) => Value::Number(n),
            FieldValue::Bool(b) => Value::Bool(b),
        }
    }
}

/// The values of one schema section, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord<V> {
    name: &'static str,
    fields: Vec<(&'static FieldSpec, V)>,
}

impl<V> SectionRecord<V> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value of a field by name.
    pub fn get(&self, field: &str) -> Option<&V> {
        self.fields
            .iter()
            .find(|(spec, _)| spec.name == field)
            .map(|(_, v)| v)
    }

    /// `(field spec, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, &V)> {
        self.fields.iter().map(|(spec, v)| (*spec, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A value for every field of every section of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<V> {
    sections: Vec<SectionRecord<V>>,
}

/// Shape-enforced but not yet cleaned: raw JSON values from the model.
pub type ShapedRecord = Record<Value>;

/// The final, normalised extraction result.
pub type ExtractionResult = Record<FieldValue>;

impl<V> Record<V> {
    /// Build a record by asking `value_for` for every field of `schema`.
    ///
    /// This is the only constructor, which is what guarantees the shape.
    pub fn from_schema<F>(schema: &Schema, mut value_for: F) -> Self
    where
        F: FnMut(&'static str, &'static FieldSpec) -> V,
    {
        let sections = schema
            .sections()
            .iter()
            .map(|section| SectionRecord {
                name: section.name,
                fields: section
                    .fields
                    .iter()
                    .map(|spec| (spec, value_for(section.name, spec)))
                    .collect(),
            })
            .collect();
        Self { sections }
    }

    /// Transform every value, keeping the shape.
    pub fn map<U, F>(self, mut f: F) -> Record<U>
    where
        F: FnMut(&'static FieldSpec, V) -> U,
    {
        Record {
            sections: self
                .sections
                .into_iter()
                .map(|section| SectionRecord {
                    name: section.name,
                    fields: section
                        .fields
                        .into_iter()
                        .map(|(spec, v)| (spec, f(spec, v)))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn sections(&self) -> &[SectionRecord<V>] {
        &self.sections
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&SectionRecord<V>> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Look up a single value.
    pub fn get(&self, section: &str, field: &str) -> Option<&V> {
        self.section(section).and_then(|s| s.get(field))
    }

    /// Total number of fields.
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.len()).sum()
    }
}

impl ExtractionResult {
    /// Number of fields holding a non-empty value.
    pub fn filled_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter(|(_, v)| !v.is_empty())
            .count()
    }

    /// Convert to a plain JSON value (e.g. to feed it back through the
    /// normaliser). Key order follows `serde_json`'s map, not the schema.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Pretty JSON with 2-space indentation, in schema order.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<V: Serialize> Serialize for SectionRecord<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (spec, v) in &self.fields {
            map.serialize_entry(spec.name, v)?;
        }
        map.end()
    }
}

impl<V: Serialize> Serialize for Record<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(section.name, section)?;
        }
        map.end()
    }
}

/// Statistics for a single extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub page_count: usize,
    /// Average extracted characters per page (the sniffer's input).
    pub avg_chars_per_page: f64,
    /// Whether the document text was cut to `max_text_chars`.
    pub text_truncated: bool,
    /// Page images attached to the request (vision mode only).
    pub images_sent: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// How the raw model response was turned into JSON.
    pub parse_outcome: ParseOutcome,
    /// Fields with a non-empty value after normalisation.
    pub filled_fields: usize,
    pub total_fields: usize,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by one call to [`crate::extract::extract`].
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// The canonical-shaped invoice record.
    pub result: ExtractionResult,
    /// Which input the model was given.
    pub mode: ExtractionMode,
    pub stats: ExtractionStats,
}
