//! Payment terms and payment method normalization.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NET_DAYS: Regex = Regex::new(
        r"(?i)^(?:(\d{1,2})\s*/\s*(\d{1,2})\s+)?net\s*(\d{1,3})\b"
    ).unwrap();

    static ref METHOD_KEYWORDS: Vec<(Regex, PaymentMethod)> = [
        (r"\bwire\b", PaymentMethod::Wire),
        (r"\bach\b|\bdirect\s+deposit\b", PaymentMethod::Ach),
        (r"\btransfer\b|\bbank\b|\beft\b", PaymentMethod::BankTransfer),
        (r"\bche(?:ck|que)s?\b", PaymentMethod::Check),
        (r"\bcash\b", PaymentMethod::Cash),
        (r"\bcard\b|\bvisa\b|\bmaster\s*card\b|\bamex\b", PaymentMethod::Card),
        (r"\bpay\s*pal\b", PaymentMethod::PayPal),
    ]
    .into_iter()
    .map(|(pattern, method)| (Regex::new(&format!("(?i){pattern}")).unwrap(), method))
    .collect();
}

/// Payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Bank transfer.
    BankTransfer,
    /// Wire transfer.
    Wire,
    /// ACH debit or credit.
    Ach,
    /// Paper check.
    Check,
    /// Cash.
    Cash,
    /// Credit or debit card.
    Card,
    /// PayPal.
    PayPal,
}

impl PaymentMethod {
    /// Recognize a payment method in free text. Keywords match whole words
    /// only, first match wins.
    pub fn parse(s: &str) -> Option<Self> {
        METHOD_KEYWORDS
            .iter()
            .find(|(pattern, _)| pattern.is_match(s))
            .map(|(_, method)| method.clone())
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Wire => "Wire Transfer",
            PaymentMethod::Ach => "ACH",
            PaymentMethod::Check => "Check",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Credit Card",
            PaymentMethod::PayPal => "PayPal",
        };
        f.write_str(name)
    }
}

/// Canonical spelling of payment terms (`net30` becomes `Net 30`).
///
/// Unrecognized terms are returned trimmed.
pub fn normalize_terms(s: &str) -> Option<String> {
    let s = s.trim().trim_end_matches(['.', ',', ';']);
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = NET_DAYS.captures(s) {
        let days = &caps[3];
        return Some(match (caps.get(1), caps.get(2)) {
            (Some(pct), Some(within)) => {
                format!("{}/{} Net {}", pct.as_str(), within.as_str(), days)
            }
            _ => format!("Net {}", days),
        });
    }

    let lower = s.to_lowercase();
    if lower.contains("receipt") {
        return Some("Due on receipt".to_string());
    }
    if lower == "cod" || lower == "c.o.d." || lower.contains("cash on delivery") {
        return Some("COD".to_string());
    }

    Some(s.to_string())
}
