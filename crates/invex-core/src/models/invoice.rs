//! Invoice extraction data models.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Canonical field names produced by the detector registry.
pub mod field_names {
    // Vendor
    pub const VENDOR_NAME: &str = "vendor_name";
    pub const VENDOR_ADDRESS: &str = "vendor_address";
    pub const VENDOR_TAX_ID: &str = "vendor_tax_id";
    pub const VENDOR_PHONE: &str = "vendor_phone";
    pub const VENDOR_EMAIL: &str = "vendor_email";
    pub const VENDOR_WEBSITE: &str = "vendor_website";

    // Customer
    pub const CUSTOMER_NAME: &str = "customer_name";
    pub const CUSTOMER_ADDRESS: &str = "customer_address";
    pub const SHIP_TO: &str = "ship_to";
    pub const CUSTOMER_ID: &str = "customer_id";

    // Invoice
    pub const INVOICE_NUMBER: &str = "invoice_number";
    pub const PO_NUMBER: &str = "po_number";

    // Dates
    pub const INVOICE_DATE: &str = "invoice_date";
    pub const DUE_DATE: &str = "due_date";
    pub const SHIP_DATE: &str = "ship_date";

    // Terms
    pub const PAYMENT_TERMS: &str = "payment_terms";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const CURRENCY: &str = "currency";

    // Totals
    pub const SUBTOTAL: &str = "subtotal";
    pub const TAX_AMOUNT: &str = "tax_amount";
    pub const TAX_RATE: &str = "tax_rate";
    pub const DISCOUNT: &str = "discount";
    pub const SHIPPING: &str = "shipping";
    pub const TOTAL: &str = "total";
    pub const AMOUNT_PAID: &str = "amount_paid";
    pub const BALANCE_DUE: &str = "balance_due";

    // Bank / payment
    pub const BANK_NAME: &str = "bank_name";
    pub const ACCOUNT_NUMBER: &str = "account_number";
    pub const ROUTING_NUMBER: &str = "routing_number";
    pub const IBAN: &str = "iban";
    pub const SWIFT_CODE: &str = "swift_code";

    pub const NOTES: &str = "notes";

    /// Fields whose absence is reported back to the caller.
    pub const REQUIRED: [&str; 4] = [INVOICE_NUMBER, INVOICE_DATE, TOTAL, VENDOR_NAME];

    /// Monetary fields, parsed as decimals.
    pub const MONETARY: [&str; 7] = [
        SUBTOTAL,
        TAX_AMOUNT,
        DISCOUNT,
        SHIPPING,
        TOTAL,
        AMOUNT_PAID,
        BALANCE_DUE,
    ];

    /// Check whether a field is required.
    pub fn is_required(field: &str) -> bool {
        REQUIRED.contains(&field)
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Monetary amount.
    Amount(#[serde(with = "rust_decimal::serde::float")] Decimal),
    /// Percentage (e.g. `8.25` for 8.25%).
    Percent(#[serde(with = "rust_decimal::serde::float")] Decimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Free text or identifier.
    Text(String),
}

impl FieldValue {
    /// Numeric value for amounts and percentages.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Amount(d) | FieldValue::Percent(d) => Some(*d),
            _ => None,
        }
    }

    /// Text value, if this is a text field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date value, if this is a date field.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Amount(d) => write!(f, "{:.2}", d),
            FieldValue::Percent(d) => write!(f, "{}%", d.normalize()),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// How a value was tied to its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    /// Found next to the field's exact label ("Invoice Number:").
    Exact,
    /// Found next to an abbreviated or loose label ("Inv #").
    Partial,
    /// Inferred from where it sits in the document.
    Positional,
}

/// Location of a match in normalized text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TextPosition {
    /// Line index in the normalized text.
    pub line: usize,
    /// Byte offset within the line.
    pub column: usize,
}

impl TextPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A candidate value for one field, produced by one detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCandidate {
    /// Field this candidate belongs to.
    pub field_name: String,
    /// Source text that was matched.
    pub raw_match: String,
    /// Normalized value.
    pub normalized_value: FieldValue,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Id of the detector that produced it.
    pub detector_id: String,
    /// Declared specificity of the detector.
    pub weight: f32,
    /// Match quality.
    pub quality: MatchQuality,
    /// Structural plausibility of the value (0.0 - 1.0).
    pub structural: f32,
    /// Where the match starts.
    pub position: TextPosition,
}

/// The winning candidate of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedField {
    /// Normalized value. Callers may overwrite it when editing a result.
    pub normalized_value: FieldValue,
    /// Source text that was matched.
    pub raw_match: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Id of the detector that produced it.
    pub detector_id: String,
    /// Match quality.
    pub quality: MatchQuality,
    /// Where the match starts.
    pub position: TextPosition,
}

impl From<FieldCandidate> for ExtractedField {
    fn from(candidate: FieldCandidate) -> Self {
        Self {
            normalized_value: candidate.normalized_value,
            raw_match: candidate.raw_match,
            confidence: candidate.confidence,
            detector_id: candidate.detector_id,
            quality: candidate.quality,
            position: candidate.position,
        }
    }
}

/// A single row of the line-item table.
///
/// Numeric columns that could not be read are `None` rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub quantity: Option<Decimal>,

    /// Price per unit.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub unit_price: Option<Decimal>,

    /// Amount for the whole row.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub line_total: Option<Decimal>,

    /// Per-line tax, when the table carries one.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tax: Option<Decimal>,
}

impl LineItem {
    /// `quantity × unit_price` when both columns are known.
    pub fn computed_total(&self) -> Option<Decimal> {
        match (self.quantity, self.unit_price) {
            (Some(q), Some(p)) => q.checked_mul(p),
            _ => None,
        }
    }
}

/// Which arithmetic identity was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    /// `subtotal + tax - discount + shipping = total`.
    SubtotalTaxTotal,
    /// `sum(line_total) = total`.
    LineItemSum,
}

/// Outcome of the arithmetic checks.
///
/// `calculations_correct` is tri-state: `None` means there was not enough
/// data to attempt a check, which is distinct from a failed check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub calculations_correct: Option<bool>,

    /// Absolute difference between the computed and the stated total.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discrepancy: Option<Decimal>,

    /// Tolerance the discrepancy was compared against.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub tolerance_used: Option<Decimal>,

    pub method: Option<ValidationMethod>,

    /// Whether the line totals add up to the stated subtotal.
    pub line_items_match_subtotal: Option<bool>,

    /// Indices of line items where `quantity × unit_price ≠ line_total`.
    pub inconsistent_line_items: Vec<usize>,
}

impl ValidationResult {
    /// Result for documents without enough data to check.
    pub fn not_attempted() -> Self {
        Self::default()
    }

    /// Check whether any arithmetic check ran.
    pub fn is_attempted(&self) -> bool {
        self.calculations_correct.is_some()
    }
}

/// Coarse data-quality flags for a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub has_line_items: bool,
    pub has_vendor_info: bool,
    pub has_financial_summary: bool,
    pub calculations_valid: Option<bool>,
}

/// The terminal artifact of one engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Chosen value per field. Fields that were not found are absent.
    pub fields: BTreeMap<String, ExtractedField>,

    /// Line items in table order.
    pub line_items: Vec<LineItem>,

    /// Confidence per extracted field.
    pub field_confidence: BTreeMap<String, f32>,

    /// Document confidence, derived from `field_confidence` and `math_validation`.
    pub overall_confidence: f32,

    /// Required fields that were not found.
    pub missing_required_fields: Vec<String>,

    /// Arithmetic validation outcome.
    pub math_validation: ValidationResult,

    /// Whether the fingerprint was seen before.
    pub duplicate_detected: bool,

    /// Non-fatal problems met while processing.
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Normalized value of a field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).map(|f| &f.normalized_value)
    }

    /// Decimal value of a monetary or percentage field.
    pub fn amount(&self, field: &str) -> Option<Decimal> {
        self.get(field).and_then(FieldValue::as_decimal)
    }

    /// Text value of a field, rendering non-text values.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(|v| v.to_string())
    }

    /// Coarse data-quality flags.
    pub fn data_quality(&self) -> DataQuality {
        DataQuality {
            has_line_items: !self.line_items.is_empty(),
            has_vendor_info: self.fields.contains_key(field_names::VENDOR_NAME),
            has_financial_summary: self.fields.contains_key(field_names::TOTAL),
            calculations_valid: self.math_validation.calculations_correct,
        }
    }
}

/// Field values plus the `line_items` array, as one JSON object.
struct ExtractedData<'a> {
    fields: &'a BTreeMap<String, ExtractedField>,
    line_items: &'a [LineItem],
}

impl Serialize for ExtractedData<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, field) in self.fields {
            map.serialize_entry(name, &field.normalized_value)?;
        }
        map.serialize_entry("line_items", self.line_items)?;
        map.end()
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExtractionResult", 7)?;
        state.serialize_field(
            "extracted_data",
            &ExtractedData {
                fields: &self.fields,
                line_items: &self.line_items,
            },
        )?;
        state.serialize_field("field_confidence", &self.field_confidence)?;
        state.serialize_field("overall_confidence", &self.overall_confidence)?;
        state.serialize_field("missing_required_fields", &self.missing_required_fields)?;
        state.serialize_field("math_validation", &self.math_validation)?;
        state.serialize_field("duplicate_detected", &self.duplicate_detected)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::str::FromStr;

    fn field(value: FieldValue) -> ExtractedField {
        ExtractedField {
            normalized_value: value,
            raw_match: String::new(),
            confidence: 0.9,
            detector_id: "test".to_string(),
            quality: MatchQuality::Exact,
            position: TextPosition::new(0, 0),
        }
    }

    #[test]
    fn test_field_value_display() {
        let amount = FieldValue::Amount(Decimal::from_str("1242.5").unwrap());
        assert_eq!(amount.to_string(), "1242.50");

        let rate = FieldValue::Percent(Decimal::from_str("8.250").unwrap());
        assert_eq!(rate.to_string(), "8.25%");

        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 12, 15).unwrap());
        assert_eq!(date.to_string(), "2024-12-15");
    }

    #[test]
    fn test_computed_total() {
        let item = LineItem {
            description: "Widget".to_string(),
            quantity: Some(Decimal::from(3)),
            unit_price: Some(Decimal::from_str("50.00").unwrap()),
            line_total: None,
            tax: None,
        };
        assert_eq!(item.computed_total(), Some(Decimal::from_str("150.00").unwrap()));

        let partial = LineItem {
            quantity: None,
            ..item
        };
        assert_eq!(partial.computed_total(), None);
    }

    #[test]
    fn test_result_serialization_shape() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "invoice_number".to_string(),
            field(FieldValue::Text("INV-1".to_string())),
        );
        fields.insert(
            "total".to_string(),
            field(FieldValue::Amount(Decimal::from_str("100.00").unwrap())),
        );

        let result = ExtractionResult {
            fields,
            line_items: vec![LineItem {
                description: "Widget".to_string(),
                quantity: Some(Decimal::from(2)),
                unit_price: None,
                line_total: Some(Decimal::from_str("100.00").unwrap()),
                tax: None,
            }],
            field_confidence: BTreeMap::from([
                ("invoice_number".to_string(), 0.9),
                ("total".to_string(), 0.9),
            ]),
            overall_confidence: 0.5,
            missing_required_fields: vec!["invoice_date".to_string(), "vendor_name".to_string()],
            math_validation: ValidationResult::not_attempted(),
            duplicate_detected: false,
            warnings: Vec::new(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value["extracted_data"],
            json!({
                "invoice_number": "INV-1",
                "total": 100.0,
                "line_items": [{
                    "description": "Widget",
                    "quantity": 2.0,
                    "unit_price": null,
                    "line_total": 100.0
                }]
            })
        );
        assert_eq!(value["math_validation"]["calculations_correct"], json!(null));
        assert_eq!(value["duplicate_detected"], json!(false));
        assert_eq!(
            value["missing_required_fields"],
            json!(["invoice_date", "vendor_name"])
        );
    }

    #[test]
    fn test_data_quality() {
        let result = ExtractionResult {
            fields: BTreeMap::from([(
                "vendor_name".to_string(),
                field(FieldValue::Text("Acme Corp".to_string())),
            )]),
            line_items: Vec::new(),
            field_confidence: BTreeMap::new(),
            overall_confidence: 0.0,
            missing_required_fields: Vec::new(),
            math_validation: ValidationResult::not_attempted(),
            duplicate_detected: false,
            warnings: Vec::new(),
        };

        let quality = result.data_quality();
        assert!(quality.has_vendor_info);
        assert!(!quality.has_line_items);
        assert!(!quality.has_financial_summary);
        assert_eq!(quality.calculations_valid, None);
    }
}
