//! The ordered set of field detectors.

use tracing::debug;

use super::rules::amounts::LargestAmountDetector;
use super::rules::parties::{
    CompanySuffixDetector, HeaderAddressDetector, HeadingNameDetector, SectionDetector, SectionPart,
};
use super::rules::patterns as p;
use super::rules::{Detector, PatternDetector, ValueKind};
use crate::models::config::{DateOrder, ExtractionConfig};
use crate::models::invoice::MatchQuality::{Partial, Positional};
use crate::models::invoice::field_names as f;

/// A detector together with its effective weight.
pub struct RegisteredDetector {
    pub detector: Box<dyn Detector>,
    pub weight: f32,
}

/// Detectors in registration order.
///
/// Registration order is the final tie-breaker between candidates, so the
/// more specific detector of a field is registered first.
pub struct DetectorRegistry {
    detectors: Vec<RegisteredDetector>,
}

impl DetectorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Register a detector with its default weight.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        let weight = detector.weight();
        self.detectors.push(RegisteredDetector { detector, weight });
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, detector: impl Detector + 'static) -> Self {
        self.register(Box::new(detector));
        self
    }

    /// The built-in detectors, with the overrides from `config` applied.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let mut registry = Self::builtin(config.date_order);
        registry.apply_overrides(config);
        registry
    }

    /// Drop disabled detectors and replace weights by id.
    pub fn apply_overrides(&mut self, config: &ExtractionConfig) {
        self.detectors.retain(|entry| {
            let keep = !config
                .disabled_detectors
                .iter()
                .any(|id| id == entry.detector.id());
            if !keep {
                debug!("Detector {} disabled", entry.detector.id());
            }
            keep
        });

        for entry in &mut self.detectors {
            if let Some(weight) = config.detector_weights.get(entry.detector.id()) {
                entry.weight = weight.clamp(0.0, 1.0);
            }
        }
    }

    /// Registered detectors, in order.
    pub fn detectors(&self) -> &[RegisteredDetector] {
        &self.detectors
    }

    /// Ids of all registered detectors, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.detectors.iter().map(|e| e.detector.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    fn builtin(date_order: DateOrder) -> Self {
        let date = ValueKind::Date(date_order);

        Self::new()
            // Invoice identifiers
            .with(PatternDetector::new(
                "invoice_number.labeled",
                f::INVOICE_NUMBER,
                &p::INVOICE_NUMBER,
                ValueKind::Identifier,
            ))
            .with(
                PatternDetector::new(
                    "invoice_number.short",
                    f::INVOICE_NUMBER,
                    &p::INVOICE_NUMBER_SHORT,
                    ValueKind::Identifier,
                )
                .weight(0.8)
                .quality(Partial),
            )
            .with(
                PatternDetector::new(
                    "invoice_number.hash",
                    f::INVOICE_NUMBER,
                    &p::HASH_NUMBER,
                    ValueKind::Identifier,
                )
                .weight(0.5)
                .quality(Partial)
                .reject_prefix(&p::NON_INVOICE_HASH_PREFIX),
            )
            .with(PatternDetector::new(
                "po_number.labeled",
                f::PO_NUMBER,
                &p::PO_NUMBER,
                ValueKind::Identifier,
            ))
            .with(
                PatternDetector::new(
                    "customer_id.labeled",
                    f::CUSTOMER_ID,
                    &p::CUSTOMER_ID,
                    ValueKind::Identifier,
                )
                .weight(0.9),
            )
            // Dates
            .with(PatternDetector::new(
                "invoice_date.labeled",
                f::INVOICE_DATE,
                &p::INVOICE_DATE,
                date,
            ))
            .with(
                PatternDetector::new(
                    "invoice_date.generic",
                    f::INVOICE_DATE,
                    &p::DATE_GENERIC,
                    date,
                )
                .weight(0.8)
                .quality(Partial)
                .reject_prefix(&p::NON_INVOICE_DATE_PREFIX),
            )
            .with(
                PatternDetector::new(
                    "invoice_date.first_date",
                    f::INVOICE_DATE,
                    &p::DATE_VALUE,
                    date,
                )
                .weight(0.4)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "due_date.labeled",
                f::DUE_DATE,
                &p::DUE_DATE,
                date,
            ))
            .with(PatternDetector::new(
                "ship_date.labeled",
                f::SHIP_DATE,
                &p::SHIP_DATE,
                date,
            ))
            // Totals
            .with(PatternDetector::new(
                "subtotal.labeled",
                f::SUBTOTAL,
                &p::SUBTOTAL,
                ValueKind::Amount,
            ))
            .with(
                PatternDetector::new(
                    "subtotal.net",
                    f::SUBTOTAL,
                    &p::NET_AMOUNT,
                    ValueKind::Amount,
                )
                .weight(0.7)
                .quality(Partial),
            )
            .with(PatternDetector::new(
                "tax_amount.labeled",
                f::TAX_AMOUNT,
                &p::TAX_AMOUNT,
                ValueKind::Amount,
            ))
            .with(PatternDetector::new(
                "tax_rate.labeled",
                f::TAX_RATE,
                &p::TAX_RATE,
                ValueKind::Percent,
            ))
            .with(PatternDetector::new(
                "discount.labeled",
                f::DISCOUNT,
                &p::DISCOUNT,
                ValueKind::Deduction,
            ))
            .with(
                PatternDetector::new(
                    "discount.less",
                    f::DISCOUNT,
                    &p::LESS,
                    ValueKind::Deduction,
                )
                .weight(0.6)
                .quality(Partial),
            )
            .with(PatternDetector::new(
                "shipping.labeled",
                f::SHIPPING,
                &p::SHIPPING,
                ValueKind::Amount,
            ))
            .with(
                PatternDetector::new(
                    "shipping.handling",
                    f::SHIPPING,
                    &p::HANDLING,
                    ValueKind::Amount,
                )
                .weight(0.6)
                .quality(Partial),
            )
            .with(PatternDetector::new(
                "total.grand",
                f::TOTAL,
                &p::GRAND_TOTAL,
                ValueKind::Amount,
            ))
            .with(
                PatternDetector::new(
                    "total.labeled",
                    f::TOTAL,
                    &p::TOTAL,
                    ValueKind::Amount,
                )
                .weight(0.9)
                .reject_prefix(&p::NON_GRAND_TOTAL_PREFIX),
            )
            .with(
                PatternDetector::new(
                    "total.amount_due",
                    f::TOTAL,
                    &p::AMOUNT_DUE,
                    ValueKind::Amount,
                )
                .weight(0.8)
                .quality(Partial),
            )
            .with(LargestAmountDetector::new(0.5))
            .with(
                PatternDetector::new(
                    "amount_paid.labeled",
                    f::AMOUNT_PAID,
                    &p::AMOUNT_PAID,
                    ValueKind::Deduction,
                )
                .weight(0.9),
            )
            .with(PatternDetector::new(
                "balance_due.labeled",
                f::BALANCE_DUE,
                &p::BALANCE_DUE,
                ValueKind::Amount,
            ))
            // Currency and terms
            .with(PatternDetector::new(
                "currency.labeled",
                f::CURRENCY,
                &p::CURRENCY_LABEL,
                ValueKind::Currency,
            ))
            .with(
                PatternDetector::new(
                    "currency.symbol",
                    f::CURRENCY,
                    &p::CURRENCY_MARK,
                    ValueKind::Currency,
                )
                .weight(0.5)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "payment_terms.labeled",
                f::PAYMENT_TERMS,
                &p::PAYMENT_TERMS,
                ValueKind::Terms,
            ))
            .with(
                PatternDetector::new(
                    "payment_terms.terms",
                    f::PAYMENT_TERMS,
                    &p::TERMS_LABEL,
                    ValueKind::Terms,
                )
                .weight(0.9),
            )
            .with(
                PatternDetector::new(
                    "payment_terms.phrase",
                    f::PAYMENT_TERMS,
                    &p::TERMS_PHRASE,
                    ValueKind::Terms,
                )
                .weight(0.6)
                .quality(Partial),
            )
            .with(PatternDetector::new(
                "payment_method.labeled",
                f::PAYMENT_METHOD,
                &p::PAYMENT_METHOD,
                ValueKind::PaymentMethod,
            ))
            .with(
                PatternDetector::new(
                    "payment_method.accepted",
                    f::PAYMENT_METHOD,
                    &p::ACCEPTED_PAYMENT,
                    ValueKind::PaymentMethod,
                )
                .weight(0.6)
                .quality(Partial),
            )
            // Vendor
            .with(SectionDetector::vendor(SectionPart::Name))
            .with(CompanySuffixDetector::new(0.8))
            .with(HeadingNameDetector::new(0.5))
            .with(SectionDetector::vendor(SectionPart::Address))
            .with(
                PatternDetector::new(
                    "vendor_address.labeled",
                    f::VENDOR_ADDRESS,
                    &p::ADDRESS_LABEL,
                    ValueKind::Text,
                )
                .weight(0.9),
            )
            .with(HeaderAddressDetector::new(0.6))
            .with(
                PatternDetector::new(
                    "vendor_address.street_zip",
                    f::VENDOR_ADDRESS,
                    &p::STREET_ZIP,
                    ValueKind::Text,
                )
                .weight(0.4)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "vendor_tax_id.labeled",
                f::VENDOR_TAX_ID,
                &p::TAX_ID,
                ValueKind::TaxId,
            ))
            .with(PatternDetector::new(
                "vendor_phone.labeled",
                f::VENDOR_PHONE,
                &p::PHONE_LABEL,
                ValueKind::Phone,
            ))
            .with(
                PatternDetector::new(
                    "vendor_phone.bare",
                    f::VENDOR_PHONE,
                    &p::PHONE_BARE,
                    ValueKind::Phone,
                )
                .weight(0.5)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "vendor_email.labeled",
                f::VENDOR_EMAIL,
                &p::EMAIL_LABEL,
                ValueKind::Email,
            ))
            .with(
                PatternDetector::new(
                    "vendor_email.bare",
                    f::VENDOR_EMAIL,
                    &p::EMAIL,
                    ValueKind::Email,
                )
                .weight(0.6)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "vendor_website.labeled",
                f::VENDOR_WEBSITE,
                &p::WEBSITE_LABEL,
                ValueKind::Url,
            ))
            .with(
                PatternDetector::new(
                    "vendor_website.bare",
                    f::VENDOR_WEBSITE,
                    &p::WEBSITE,
                    ValueKind::Url,
                )
                .weight(0.6)
                .quality(Positional),
            )
            // Customer
            .with(SectionDetector::customer(SectionPart::Name))
            .with(SectionDetector::customer(SectionPart::Address))
            .with(SectionDetector::ship_to())
            // Bank details
            .with(PatternDetector::new(
                "bank_name.labeled",
                f::BANK_NAME,
                &p::BANK_NAME,
                ValueKind::Name,
            ))
            .with(PatternDetector::new(
                "account_number.labeled",
                f::ACCOUNT_NUMBER,
                &p::ACCOUNT_NUMBER,
                ValueKind::AccountNumber,
            ))
            .with(PatternDetector::new(
                "routing_number.labeled",
                f::ROUTING_NUMBER,
                &p::ROUTING_NUMBER,
                ValueKind::RoutingNumber,
            ))
            .with(PatternDetector::new(
                "iban.labeled",
                f::IBAN,
                &p::IBAN_LABEL,
                ValueKind::Iban { require_valid: false },
            ))
            .with(
                PatternDetector::new(
                    "iban.bare",
                    f::IBAN,
                    &p::IBAN_BARE,
                    ValueKind::Iban { require_valid: true },
                )
                .weight(0.6)
                .quality(Positional),
            )
            .with(PatternDetector::new(
                "swift_code.labeled",
                f::SWIFT_CODE,
                &p::SWIFT_CODE,
                ValueKind::Swift,
            ))
            // Notes
            .with(PatternDetector::new(
                "notes.labeled",
                f::NOTES,
                &p::NOTES,
                ValueKind::Text,
            ))
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique() {
        let registry = DetectorRegistry::default();
        let ids = registry.ids();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_every_field_has_a_detector() {
        let registry = DetectorRegistry::default();
        let fields: HashSet<_> = registry.detectors().iter().map(|e| e.detector.field()).collect();
        assert_eq!(fields.len(), 32);
    }

    #[test]
    fn test_overrides() {
        let mut config = ExtractionConfig::default();
        config.disabled_detectors.push("total.largest_amount".to_string());
        config.detector_weights.insert("total.labeled".to_string(), 0.3);

        let registry = DetectorRegistry::from_config(&config);
        assert!(!registry.ids().contains(&"total.largest_amount"));

        let total = registry
            .detectors()
            .iter()
            .find(|e| e.detector.id() == "total.labeled")
            .unwrap();
        assert_eq!(total.weight, 0.3);
        assert_eq!(registry.len(), DetectorRegistry::default().len() - 1);
    }

    #[test]
    fn test_specific_detector_registered_first() {
        let registry = DetectorRegistry::default();
        let ids = registry.ids();
        let position = |id: &str| ids.iter().position(|i| *i == id).unwrap();
        assert!(position("total.grand") < position("total.labeled"));
        assert!(position("total.labeled") < position("total.largest_amount"));
    }
}
