//! Arithmetic cross-checks between totals and line items.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::models::config::ValidationConfig;
use crate::models::invoice::{
    ExtractedField, LineItem, ValidationMethod, ValidationResult, field_names,
};

/// Checks that extracted totals add up.
///
/// Never fails: missing inputs yield a not-attempted result, and an
/// arithmetic overflow is treated the same way.
#[derive(Debug, Clone)]
pub struct MathValidator {
    relative: Decimal,
    absolute: Decimal,
}

impl MathValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            relative: to_decimal(config.relative_tolerance),
            absolute: to_decimal(config.absolute_tolerance),
        }
    }

    /// Allowed discrepancy for an amount: `max(relative × |amount|, absolute)`.
    pub fn tolerance(&self, amount: Decimal) -> Decimal {
        self.relative
            .checked_mul(amount.abs())
            .unwrap_or(Decimal::MAX)
            .max(self.absolute)
    }

    pub fn validate(
        &self,
        fields: &BTreeMap<String, ExtractedField>,
        line_items: &[LineItem],
    ) -> ValidationResult {
        let amount = |name: &str| fields.get(name).and_then(|f| f.normalized_value.as_decimal());

        let subtotal = amount(field_names::SUBTOTAL);
        let tax = amount(field_names::TAX_AMOUNT);
        let total = amount(field_names::TOTAL);
        let line_sum = sum_line_totals(line_items);

        let mut result = match (subtotal, tax, total, line_sum) {
            (Some(subtotal), Some(tax), Some(total), _) => {
                let discount = amount(field_names::DISCOUNT).unwrap_or_default();
                let shipping = amount(field_names::SHIPPING).unwrap_or_default();
                let computed = subtotal
                    .checked_add(tax)
                    .and_then(|v| v.checked_sub(discount))
                    .and_then(|v| v.checked_add(shipping));
                self.compare(computed, total, ValidationMethod::SubtotalTaxTotal)
            }
            (_, _, Some(total), Some(sum)) => {
                self.compare(Some(sum), total, ValidationMethod::LineItemSum)
            }
            _ => ValidationResult::not_attempted(),
        };

        if let (Some(subtotal), Some(sum)) = (subtotal, line_sum) {
            result.line_items_match_subtotal = sum
                .checked_sub(subtotal)
                .map(|d| d.abs() <= self.tolerance(subtotal));
        }

        result.inconsistent_line_items = line_items
            .iter()
            .enumerate()
            .filter(|(_, item)| match (item.computed_total(), item.line_total) {
                (Some(computed), Some(stated)) => computed
                    .checked_sub(stated)
                    .is_none_or(|d| d.abs() > self.tolerance(stated)),
                _ => false,
            })
            .map(|(i, _)| i)
            .collect();

        debug!(
            "Math validation: correct={:?} method={:?} discrepancy={:?}",
            result.calculations_correct, result.method, result.discrepancy
        );
        result
    }

    fn compare(
        &self,
        computed: Option<Decimal>,
        total: Decimal,
        method: ValidationMethod,
    ) -> ValidationResult {
        let Some(discrepancy) = computed.and_then(|c| c.checked_sub(total)).map(|d| d.abs()) else {
            return ValidationResult::not_attempted();
        };
        let tolerance = self.tolerance(total);

        ValidationResult {
            calculations_correct: Some(discrepancy <= tolerance),
            discrepancy: Some(discrepancy),
            tolerance_used: Some(tolerance),
            method: Some(method),
            ..ValidationResult::default()
        }
    }
}

impl Default for MathValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

/// Sum of the known line totals; `None` when no item has one.
fn sum_line_totals(items: &[LineItem]) -> Option<Decimal> {
    let mut totals = items.iter().filter_map(|item| item.line_total).peekable();
    totals.peek()?;
    totals.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{FieldValue, MatchQuality, TextPosition};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fields(values: &[(&str, &str)]) -> BTreeMap<String, ExtractedField> {
        values
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    ExtractedField {
                        normalized_value: FieldValue::Amount(dec(value)),
                        raw_match: value.to_string(),
                        confidence: 1.0,
                        detector_id: "test".to_string(),
                        quality: MatchQuality::Exact,
                        position: TextPosition::default(),
                    },
                )
            })
            .collect()
    }

    fn item(q: &str, p: &str, t: &str) -> LineItem {
        LineItem {
            description: "x".to_string(),
            quantity: Some(dec(q)),
            unit_price: Some(dec(p)),
            line_total: Some(dec(t)),
            tax: None,
        }
    }

    #[test]
    fn test_exact_sum_passes() {
        let f = fields(&[
            ("subtotal", "100.00"),
            ("tax_amount", "8.00"),
            ("discount", "10.00"),
            ("shipping", "5.00"),
            ("total", "103.00"),
        ]);
        let result = MathValidator::default().validate(&f, &[]);

        assert_eq!(result.calculations_correct, Some(true));
        assert_eq!(result.discrepancy, Some(Decimal::ZERO));
        assert_eq!(result.method, Some(ValidationMethod::SubtotalTaxTotal));
    }

    #[test]
    fn test_mismatch_fails_with_discrepancy() {
        let f = fields(&[("subtotal", "100.00"), ("tax_amount", "8.00"), ("total", "120.00")]);
        let result = MathValidator::default().validate(&f, &[]);

        assert_eq!(result.calculations_correct, Some(false));
        assert_eq!(result.discrepancy, Some(dec("12.00")));
        assert_eq!(result.tolerance_used, Some(dec("1.2")));
    }

    #[test]
    fn test_discrepancy_at_tolerance_passes() {
        // 1% of 100.00 is exactly 1.00
        let f = fields(&[("subtotal", "90.00"), ("tax_amount", "9.00"), ("total", "100.00")]);
        let result = MathValidator::default().validate(&f, &[]);

        assert_eq!(result.discrepancy, Some(dec("1.00")));
        assert_eq!(result.calculations_correct, Some(true));

        let f = fields(&[("subtotal", "90.00"), ("tax_amount", "8.99"), ("total", "100.00")]);
        assert_eq!(MathValidator::default().validate(&f, &[]).calculations_correct, Some(false));
    }

    #[test]
    fn test_absolute_floor() {
        let validator = MathValidator::default();
        assert_eq!(validator.tolerance(dec("0.50")), dec("0.01"));
        assert_eq!(validator.tolerance(dec("-300")), dec("3"));
    }

    #[test]
    fn test_line_item_sum() {
        let f = fields(&[("total", "1242.50")]);
        let result = MathValidator::default().validate(&f, &[item("3", "50.00", "150.00")]);

        assert_eq!(result.method, Some(ValidationMethod::LineItemSum));
        assert_eq!(result.calculations_correct, Some(false));
        assert_eq!(result.discrepancy, Some(dec("1092.50")));
    }

    #[test]
    fn test_not_attempted() {
        let f = fields(&[("total", "100.00"), ("tax_amount", "8.00")]);
        let result = MathValidator::default().validate(&f, &[]);
        assert_eq!(result, ValidationResult::not_attempted());
        assert!(!result.is_attempted());

        let no_totals = LineItem {
            description: "Consulting".to_string(),
            ..LineItem::default()
        };
        let result = MathValidator::default().validate(&f, &[no_totals]);
        assert_eq!(result.calculations_correct, None);
    }

    #[test]
    fn test_line_item_consistency() {
        let f = fields(&[("subtotal", "160.00"), ("tax_amount", "0"), ("total", "160.00")]);
        let items = [item("3", "50.00", "150.00"), item("2", "5.00", "12.00")];
        let result = MathValidator::default().validate(&f, &items);

        assert_eq!(result.inconsistent_line_items, vec![1]);
        assert_eq!(result.line_items_match_subtotal, Some(false));
        assert_eq!(result.calculations_correct, Some(true));
    }
}
