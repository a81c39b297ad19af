//! Rule-based field detectors.
//!
//! A detector looks at normalized text and proposes candidate values for one
//! field. Detectors are pure: they see only the text and their own settings,
//! never each other's output.

pub mod amounts;
pub mod dates;
pub mod iban;
pub mod parties;
pub mod patterns;
pub mod terms;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::DetectorError;
use crate::models::config::DateOrder;
use crate::models::invoice::{FieldValue, MatchQuality, TextPosition};
use crate::normalize::NormalizedText;

use amounts::{amount_structure, currency_code, try_parse_amount};
use iban::{compact_iban, is_swift_code, validate_iban, validate_routing_number};
use terms::{PaymentMethod, normalize_terms};

/// A value proposed by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch {
    /// Normalized value.
    pub value: FieldValue,
    /// How the value was located.
    pub quality: MatchQuality,
    /// Plausibility of the value's shape (0.0 - 1.0).
    pub structural: f32,
    /// Source text that produced this match.
    pub raw: String,
    /// Where the match starts.
    pub position: TextPosition,
}

impl ExtractionMatch {
    /// Create a new match with full structural plausibility.
    pub fn new(value: FieldValue, quality: MatchQuality, raw: impl Into<String>) -> Self {
        Self {
            value,
            quality,
            structural: 1.0,
            raw: raw.into(),
            position: TextPosition::default(),
        }
    }

    /// Set the structural plausibility score.
    pub fn with_structural(mut self, structural: f32) -> Self {
        self.structural = structural.clamp(0.0, 1.0);
        self
    }

    /// Set the position in the normalized text.
    pub fn with_position(mut self, position: TextPosition) -> Self {
        self.position = position;
        self
    }
}

/// A field detector.
pub trait Detector: Send + Sync {
    /// Stable identifier, used for configuration overrides and tie-breaking.
    fn id(&self) -> &str;

    /// Name of the field this detector targets.
    fn field(&self) -> &'static str;

    /// Default specificity weight (0.0 - 1.0).
    fn weight(&self) -> f32;

    /// Find every candidate for the field, in document order.
    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError>;
}

/// How a matched string is turned into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Amount,
    /// Amount stored as its absolute value (discounts, payments).
    Deduction,
    Percent,
    Date(DateOrder),
    Identifier,
    TaxId,
    Name,
    Text,
    Email,
    Phone,
    Url,
    Currency,
    Terms,
    PaymentMethod,
    AccountNumber,
    RoutingNumber,
    /// IBAN; when `require_valid` is set, failing the checksum drops the match.
    Iban { require_valid: bool },
    Swift,
}

impl ValueKind {
    /// Normalize `value` (captured inside `matched`) into a field value and
    /// its structural score. `Ok(None)` means the text is not a value of
    /// this kind.
    pub fn normalize(
        &self,
        field: &str,
        matched: &str,
        value: &str,
    ) -> Result<Option<(FieldValue, f32)>, DetectorError> {
        let value = value.trim();

        let normalized = match self {
            ValueKind::Amount => try_parse_amount(field, value)?
                .map(|amount| (FieldValue::Amount(amount), amount_structure(matched, value))),
            ValueKind::Deduction => try_parse_amount(field, value)?
                .map(|amount| (FieldValue::Amount(amount.abs()), amount_structure(matched, value))),
            ValueKind::Percent => value
                .parse::<Decimal>()
                .ok()
                .filter(|rate| *rate >= Decimal::ZERO && *rate <= Decimal::ONE_HUNDRED)
                .map(|rate| (FieldValue::Percent(rate), 1.0)),
            ValueKind::Date(order) => match dates::parse_date(value, *order) {
                Some(date) => Some((FieldValue::Date(date), 1.0)),
                None => Some((FieldValue::Text(value.to_string()), 0.25)),
            },
            ValueKind::Identifier => {
                let id = value.trim_end_matches(['.', ',', ';', ':', '-', '/']);
                let has_digit = id.chars().any(|c| c.is_ascii_digit());
                (has_digit && id.len() <= 40).then(|| {
                    let structural = if id.len() >= 3 { 1.0 } else { 0.75 };
                    (FieldValue::Text(id.to_uppercase()), structural)
                })
            }
            ValueKind::TaxId => {
                let id = collapse_spaces(value).to_uppercase();
                let digits = id.chars().filter(char::is_ascii_digit).count();
                (digits >= 6).then(|| (FieldValue::Text(id), if digits >= 9 { 1.0 } else { 0.75 }))
            }
            ValueKind::Name => {
                let name = value.trim_end_matches([',', ';', ':', '-']).trim();
                let letters = name.chars().filter(|c| c.is_alphabetic()).count();
                (letters >= 2 && name.chars().count() <= 100).then(|| {
                    let structural = if name.starts_with(char::is_uppercase) { 1.0 } else { 0.75 };
                    (FieldValue::Text(name.to_string()), structural)
                })
            }
            ValueKind::Text => {
                (!value.is_empty()).then(|| (FieldValue::Text(value.to_string()), 1.0))
            }
            ValueKind::Email => value
                .contains('@')
                .then(|| (FieldValue::Text(value.to_lowercase()), 1.0)),
            ValueKind::Phone => {
                let digits = value.chars().filter(char::is_ascii_digit).count();
                (7..=15).contains(&digits).then(|| {
                    let structural = if digits >= 10 { 1.0 } else { 0.75 };
                    (FieldValue::Text(value.to_string()), structural)
                })
            }
            ValueKind::Url => {
                let url = value.trim_end_matches(['.', ',', ';', ')']);
                Some((FieldValue::Text(url.to_lowercase()), 1.0))
            }
            ValueKind::Currency => currency_code(value).map(|code| {
                let structural = if value.len() == 3 { 1.0 } else { 0.75 };
                (FieldValue::Text(code), structural)
            }),
            ValueKind::Terms => normalize_terms(value).map(|terms| (FieldValue::Text(terms), 1.0)),
            ValueKind::PaymentMethod => PaymentMethod::parse(value)
                .map(|method| (FieldValue::Text(method.to_string()), 1.0)),
            ValueKind::AccountNumber => {
                let account = collapse_spaces(value);
                Some((FieldValue::Text(account), 1.0))
            }
            ValueKind::RoutingNumber => {
                let digits: String = value.chars().filter(char::is_ascii_digit).collect();
                let structural = if validate_routing_number(&digits) { 1.0 } else { 0.6 };
                Some((FieldValue::Text(digits), structural))
            }
            ValueKind::Iban { require_valid } => {
                let iban = compact_iban(value);
                match (validate_iban(&iban), require_valid) {
                    (true, _) => Some((FieldValue::Text(iban), 1.0)),
                    (false, true) => None,
                    (false, false) => Some((FieldValue::Text(iban), 0.5)),
                }
            }
            ValueKind::Swift => {
                let code = value.to_ascii_uppercase();
                is_swift_code(&code).then(|| (FieldValue::Text(code), 1.0))
            }
        };

        Ok(normalized)
    }
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Detector driven by a single line-level regex with a `value` group.
pub struct PatternDetector {
    id: &'static str,
    field: &'static str,
    weight: f32,
    quality: MatchQuality,
    pattern: &'static Regex,
    reject_prefix: Option<&'static Regex>,
    kind: ValueKind,
}

impl PatternDetector {
    /// Create an exact-label detector with weight 1.0.
    pub fn new(
        id: &'static str,
        field: &'static str,
        pattern: &'static Regex,
        kind: ValueKind,
    ) -> Self {
        Self {
            id,
            field,
            weight: 1.0,
            quality: MatchQuality::Exact,
            pattern,
            reject_prefix: None,
            kind,
        }
    }

    /// Set the default weight.
    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the match quality.
    pub fn quality(mut self, quality: MatchQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Skip matches whose preceding text on the line matches `prefix`.
    pub fn reject_prefix(mut self, prefix: &'static Regex) -> Self {
        self.reject_prefix = Some(prefix);
        self
    }
}

impl Detector for PatternDetector {
    fn id(&self) -> &str {
        self.id
    }

    fn field(&self) -> &'static str {
        self.field
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let mut results = Vec::new();

        for (index, line) in text.content_lines() {
            for caps in self.pattern.captures_iter(line) {
                let (Some(whole), Some(value)) = (caps.get(0), caps.name("value")) else {
                    continue;
                };
                if self
                    .reject_prefix
                    .is_some_and(|prefix| prefix.is_match(&line[..whole.start()]))
                {
                    continue;
                }

                if let Some((normalized, structural)) =
                    self.kind.normalize(self.field, whole.as_str(), value.as_str())?
                {
                    results.push(
                        ExtractionMatch::new(normalized, self.quality, whole.as_str())
                            .with_structural(structural)
                            .with_position(TextPosition::new(index, value.start())),
                    );
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::field_names;
    use crate::normalize::normalize;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_pattern_detector_finds_all_lines() {
        let text = normalize("Total: $10.00\nnoise\nTOTAL 12.50").unwrap();
        let detector = PatternDetector::new(
            "total.labeled",
            field_names::TOTAL,
            &patterns::TOTAL,
            ValueKind::Amount,
        );

        let found = detector.detect(&text).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, FieldValue::Amount(Decimal::from_str("10.00").unwrap()));
        assert_eq!(found[0].structural, 1.0);
        assert_eq!(found[0].position, TextPosition::new(0, 7));
        assert_eq!(found[1].position.line, 2);
        assert_eq!(found[1].structural, 0.75);
    }

    #[test]
    fn test_reject_prefix() {
        let text = normalize("Sub Total: 100.00\nTotal: 108.00").unwrap();
        let detector = PatternDetector::new(
            "total.labeled",
            field_names::TOTAL,
            &patterns::TOTAL,
            ValueKind::Amount,
        )
        .reject_prefix(&patterns::NON_GRAND_TOTAL_PREFIX);

        let found = detector.detect(&text).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, FieldValue::Amount(Decimal::from_str("108.00").unwrap()));
    }

    #[test]
    fn test_overflow_propagates() {
        let text = normalize(&format!("Total: {}", "9".repeat(40))).unwrap();
        let detector = PatternDetector::new(
            "total.labeled",
            field_names::TOTAL,
            &patterns::TOTAL,
            ValueKind::Amount,
        );
        assert!(matches!(detector.detect(&text), Err(DetectorError::Overflow { .. })));
    }

    #[test]
    fn test_value_kinds() {
        let kind = ValueKind::Date(DateOrder::MonthFirst);
        assert_eq!(
            kind.normalize("invoice_date", "", "12/15/2024").unwrap(),
            Some((FieldValue::Date(NaiveDate::from_ymd_opt(2024, 12, 15).unwrap()), 1.0))
        );
        assert_eq!(
            kind.normalize("invoice_date", "", "13/45/2024").unwrap(),
            Some((FieldValue::Text("13/45/2024".to_string()), 0.25))
        );
        assert_eq!(
            ValueKind::Identifier.normalize("invoice_number", "", "inv-001.").unwrap(),
            Some((FieldValue::Text("INV-001".to_string()), 1.0))
        );
        assert_eq!(ValueKind::Identifier.normalize("invoice_number", "", "Date").unwrap(), None);
        assert_eq!(
            ValueKind::Deduction.normalize("discount", "-$5.00", "-$5.00").unwrap(),
            Some((FieldValue::Amount(Decimal::from_str("5.00").unwrap()), 1.0))
        );
        assert_eq!(
            ValueKind::Iban { require_valid: true }
                .normalize("iban", "", "GB00WEST12345698765432")
                .unwrap(),
            None
        );
    }
}
