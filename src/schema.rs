//! The canonical invoice schema: a constant table of sections and fields.
//!
//! Every extraction result has exactly this shape. The table is `'static`
//! data compiled into the binary, so there is nothing to load, parse or
//! validate at runtime; [`CANONICAL_SCHEMA`] is simply a view over it.
//!
//! Each field carries a [`FieldKind`] that tells the normaliser how to clean
//! the value the model returned:
//!
//! | Kind | Normalisation |
//! |------|---------------|
//! | [`FieldKind::Text`]    | trim only |
//! | [`FieldKind::Numeric`] | trim, drop `$` and `,` |
//! | [`FieldKind::Date`]    | trim, reparse into `YYYY-MM-DD` when possible |

use serde::ser::{Serialize, SerializeMap, Serializer};

/// How a field's value is normalised after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Amounts, identifiers and phone-like numbers: currency symbols and
    /// thousands separators are stripped.
    Numeric,
    /// Calendar dates: reformatted as `YYYY-MM-DD`.
    Date,
}

/// One field of a schema section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// A named, ordered group of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SectionSpec {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }
}

/// A complete extraction schema.
///
/// `Schema` is `Copy`: it only borrows the static table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    sections: &'static [SectionSpec],
}

impl Schema {
    /// Wrap a static section table.
    pub const fn new(sections: &'static [SectionSpec]) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &'static [SectionSpec] {
        self.sections
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&'static SectionSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Total number of fields across all sections.
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// A serialisable `section -> [field names]` view used in prompts.
    pub fn listing(&self) -> SchemaListing {
        SchemaListing(*self)
    }
}

impl Default for Schema {
    fn default() -> Self {
        CANONICAL_SCHEMA
    }
}

/// Serialises a schema as `{"section": ["field", ...], ...}` in schema order.
#[derive(Debug, Clone, Copy)]
pub struct SchemaListing(Schema);

impl Serialize for SchemaListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sections = self.0.sections();
        let mut map = serializer.serialize_map(Some(sections.len()))?;
        for section in sections {
            let names: Vec<&str> = section.field_names().collect();
            map.serialize_entry(section.name, &names)?;
        }
        map.end()
    }
}

// ── Canonical table ──────────────────────────────────────────────────────

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Text }
}

const fn num(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Numeric }
}

const fn date(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Date }
}

const ORDER_METADATA: &[FieldSpec] = &[
    num("order_id"),
    date("order_date"),
    num("foreign_order_id"),
    text("document_type"),
    text("priority"),
    text("status"),
    text("activity"),
    date("due_on"),
    text("manager"),
    text("location"),
    text("practice_id"),
    text("source_system"),
    text("creation_user"),
    text("last_modified_user"),
];

const PATIENT_INFORMATION: &[FieldSpec] = &[
    text("patient_id"),
    text("patient_first_name"),
    text("patient_last_name"),
    date("patient_dob"),
    text("patient_age"),
    text("patient_gender"),
    text("patient_pregnancy"),
    text("patient_species"),
    text("patient_ethnicity"),
    text("patient_weight_kg"),
    text("patient_height_cm"),
    num("patient_phone"),
    text("patient_email"),
    text("patient_address_line1"),
    text("patient_address_line2"),
    text("patient_city"),
    text("patient_state"),
    num("patient_zip"),
    text("patient_country"),
    text("patient_insurance_provider"),
    text("patient_insurance_id"),
    text("patient_group_number"),
];

const PRESCRIBER_INFORMATION: &[FieldSpec] = &[
    text("prescriber_id"),
    text("prescriber_first_name"),
    text("prescriber_last_name"),
    num("prescriber_npi"),
    num("prescriber_phone"),
    text("prescriber_fax"),
    text("prescriber_email"),
    text("prescriber_clinic_name"),
    text("prescriber_address_line1"),
    text("prescriber_address_line2"),
    text("prescriber_city"),
    text("prescriber_state"),
    num("prescriber_zip"),
    text("prescriber_license"),
    date("prescriber_license_expiration_date"),
    num("prescriber_dea"),
    date("prescriber_dea_expiration_date"),
    text("prescriber_controlled_license"),
    date("prescriber_controlled_license_expiration"),
    text("prescriber_discipline"),
];

const PAYMENT: &[FieldSpec] = &[
    text("payor"),
    text("payor_lastname"),
    text("payor_firstname"),
    text("payor_address"),
    text("payor_address_line1"),
    text("payor_address_line2"),
    text("payor_city"),
    text("payor_state"),
    num("payor_zip"),
];

const SHIPPING_DELIVERY: &[FieldSpec] = &[
    text("shipping_method"),
    date("ship_date"),
    date("delivery_date"),
    text("tracking_number"),
    text("courier"),
    text("shipping_address_line1"),
    text("shipping_address_line2"),
    text("shipping_city"),
    text("shipping_state"),
    num("shipping_zip"),
    text("shipping_contact_name"),
    num("shipping_contact_phone"),
];

const MEDICATION_PRESCRIPTION_DATA: &[FieldSpec] = &[
    text("rx_number"),
    date("fill_date"),
    text("drug_name"),
    text("strength"),
    text("form"),
    text("ndc_code"),
    text("sig"),
    num("days_supply"),
    text("quantity_dispensed"),
    text("refills_remaining"),
    text("lot_number"),
    date("expiration_date"),
    num("unit_price"),
    text("ingredient_cost"),
    num("dispensing_fee"),
    num("tax_amount"),
    num("line_total"),
    text("pharmacy_notes"),
];

const CLINICAL: &[FieldSpec] = &[
    text("patient_allergies"),
    text("patient_diseases"),
    text("patient_medication_history"),
    text("patient_encounters"),
];

const CANONICAL_SECTIONS: &[SectionSpec] = &[
    SectionSpec { name: "order_metadata", fields: ORDER_METADATA },
    SectionSpec { name: "patient_information", fields: PATIENT_INFORMATION },
    SectionSpec { name: "prescriber_information", fields: PRESCRIBER_INFORMATION },
    SectionSpec { name: "payment", fields: PAYMENT },
    SectionSpec { name: "shipping_delivery", fields: SHIPPING_DELIVERY },
    SectionSpec { name: "medication_prescription_data", fields: MEDICATION_PRESCRIPTION_DATA },
    SectionSpec { name: "clinical", fields: CLINICAL },
];

/// The pharmacy invoice schema every extraction result conforms to.
pub const CANONICAL_SCHEMA: Schema = Schema::new(CANONICAL_SECTIONS);
