//! Amount parsing and the largest-amount total fallback.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::patterns::CURRENCY_AMOUNT;
use super::{Detector, ExtractionMatch};
use crate::error::DetectorError;
use crate::models::invoice::{FieldValue, MatchQuality, TextPosition, field_names};
use crate::normalize::NormalizedText;

/// Parse an amount in US (`1,234.56`) or European (`1.234,56`, `1 234,56`)
/// notation, with an optional currency symbol or code.
///
/// Parentheses and a leading minus both mean a negative amount.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    match digits_only(s) {
        Some(normalized) => Decimal::from_str(&normalized).ok(),
        None => None,
    }
}

/// Like [`parse_amount`], but a digit string that does not fit [`Decimal`]
/// is reported instead of silently dropped.
pub(crate) fn try_parse_amount(field: &str, s: &str) -> Result<Option<Decimal>, DetectorError> {
    let Some(normalized) = digits_only(s) else {
        return Ok(None);
    };

    Decimal::from_str(&normalized)
        .map(Some)
        .map_err(|_| DetectorError::Overflow {
            field: field.to_string(),
            value: s.to_string(),
        })
}

/// Reduce an amount string to `-?digits(.digits)?`.
fn digits_only(s: &str) -> Option<String> {
    let negative = s.contains('-') || (s.contains('(') && s.contains(')'));

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let comma = cleaned.rfind(',');
    let dot = cleaned.rfind('.');
    let decimal_sep = match (comma, dot) {
        // Whichever separator comes last is the decimal one
        (Some(c), Some(d)) => Some(if c > d { ',' } else { '.' }),
        (Some(_), None) => decimal_separator_candidate(&cleaned, ','),
        (None, Some(_)) => decimal_separator_candidate(&cleaned, '.'),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(cleaned.len() + 1);
    if negative {
        normalized.push('-');
    }
    let split_at = decimal_sep.and_then(|sep| cleaned.rfind(sep));
    for (i, c) in cleaned.char_indices() {
        if c.is_ascii_digit() {
            normalized.push(c);
        } else if Some(i) == split_at {
            normalized.push('.');
        }
    }

    Some(normalized)
}

/// Decide whether a lone separator kind marks decimals or thousands.
fn decimal_separator_candidate(s: &str, sep: char) -> Option<char> {
    let count = s.matches(sep).count();
    let tail = s.rsplit(sep).next().unwrap_or("");
    match (count, tail.len()) {
        (1, 1..=2) => Some(sep),
        // "1,234" reads as thousands, "1.234" as a decimal
        (1, 3) if sep == '.' => Some(sep),
        (1, 3) => None,
        (1, _) => Some(sep),
        _ => None,
    }
}

/// Structural score of a monetary match: 0.5, plus 0.25 for an adjacent
/// currency marker, plus 0.25 for two decimal places.
pub fn amount_structure(matched: &str, value: &str) -> f32 {
    let mut score = 0.5;
    if has_currency_marker(matched) {
        score += 0.25;
    }
    let trimmed = value.trim_end_matches(')');
    let mut rev = trimmed.chars().rev();
    if matches!(
        (rev.next(), rev.next(), rev.next()),
        (Some(a), Some(b), Some('.' | ','))
            if a.is_ascii_digit() && b.is_ascii_digit()
    ) {
        score += 0.25;
    }
    score
}

fn has_currency_marker(s: &str) -> bool {
    s.contains(['$', '€', '£'])
        || ["USD", "EUR", "GBP", "CAD", "AUD"]
            .iter()
            .any(|code| s.to_ascii_uppercase().contains(code))
}

/// Map a currency symbol or code to its ISO 4217 code.
pub fn currency_code(s: &str) -> Option<String> {
    let code = match s.trim() {
        "$" => "USD".to_string(),
        "€" => "EUR".to_string(),
        "£" => "GBP".to_string(),
        other if other.len() == 3 && other.chars().all(|c| c.is_ascii_alphabetic()) => {
            other.to_ascii_uppercase()
        }
        _ => return None,
    };
    Some(code)
}

/// Total fallback: the largest currency-marked amount in the document.
pub struct LargestAmountDetector {
    weight: f32,
}

impl LargestAmountDetector {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl Detector for LargestAmountDetector {
    fn id(&self) -> &str {
        "total.largest_amount"
    }

    fn field(&self) -> &'static str {
        field_names::TOTAL
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn detect(&self, text: &NormalizedText) -> Result<Vec<ExtractionMatch>, DetectorError> {
        let mut best: Option<(Decimal, ExtractionMatch)> = None;

        for (index, line) in text.content_lines() {
            for caps in CURRENCY_AMOUNT.captures_iter(line) {
                let Some(m) = caps.name("value") else {
                    continue;
                };
                let Some(amount) = try_parse_amount(self.field(), m.as_str())? else {
                    continue;
                };
                if best.as_ref().is_some_and(|(max, _)| *max >= amount) {
                    continue;
                }
                let found = ExtractionMatch::new(
                    FieldValue::Amount(amount),
                    MatchQuality::Positional,
                    m.as_str(),
                )
                .with_structural(amount_structure(m.as_str(), m.as_str()))
                .with_position(TextPosition::new(index, m.start()));
                best = Some((amount, found));
            }
        }

        Ok(best.into_iter().map(|(_, found)| found).collect())
    }
}
