//! Duplicate invoice detection by content fingerprint.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::models::invoice::{ExtractedField, field_names};

/// SHA-256 of the normalized vendor, invoice number and total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of an extraction, or `None` when neither the invoice number
/// nor the total was found.
///
/// Vendor names are compared without case, spaces or punctuation. Invoice
/// numbers ignore case and leading zeros of each digit run, so `INV-001`
/// and `inv 1` collide. Punctuation ends a digit run without merging it
/// into the next one. Totals are compared to the cent.
pub fn fingerprint(fields: &BTreeMap<String, ExtractedField>) -> Option<Fingerprint> {
    let value = |name: &str| fields.get(name).map(|f| &f.normalized_value);

    let invoice_number =
        value(field_names::INVOICE_NUMBER).map(|v| normalize_invoice_number(&v.to_string()));
    let total = value(field_names::TOTAL)
        .and_then(|v| v.as_decimal())
        .map(|t| format!("{:.2}", t.round_dp(2)));
    if invoice_number.is_none() && total.is_none() {
        return None;
    }

    let vendor = value(field_names::VENDOR_NAME)
        .map(|v| normalize_vendor(&v.to_string()))
        .unwrap_or_default();

    let key = format!(
        "{}|{}|{}",
        vendor,
        invoice_number.unwrap_or_default(),
        total.unwrap_or_default()
    );

    let digest = Sha256::digest(key.as_bytes());
    Some(Fingerprint(digest.iter().map(|b| format!("{:02x}", b)).collect()))
}

fn normalize_vendor(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn normalize_invoice_number(number: &str) -> String {
    let mut out = String::with_capacity(number.len());
    let mut run = String::new();
    // Digit runs split by punctuation stay apart: `2024-1` is not `20-241`
    let mut after_digits = false;

    for c in number.chars() {
        if c.is_ascii_digit() {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            if after_digits {
                out.push('-');
            }
            push_digit_run(&mut out, &run);
            run.clear();
            after_digits = true;
        }
        if c.is_alphanumeric() {
            out.extend(c.to_uppercase());
            after_digits = false;
        }
    }
    if !run.is_empty() {
        if after_digits {
            out.push('-');
        }
        push_digit_run(&mut out, &run);
    }

    out
}

fn push_digit_run(out: &mut String, run: &str) {
    let trimmed = run.trim_start_matches('0');
    // A run of only zeros still leaves a trace
    out.push_str(if trimmed.is_empty() { "0" } else { trimmed });
}

/// Set of fingerprints already seen.
///
/// Implementations must make [`check_and_register`](Self::check_and_register)
/// atomic: with concurrent callers presenting the same fingerprint, exactly
/// one sees `false`.
pub trait FingerprintStore: Send + Sync {
    /// Record `fingerprint` and report whether it was already present.
    fn check_and_register(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    /// Number of remembered fingerprints.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Process-local store behind a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryFingerprintStore {
    seen: Mutex<HashSet<Fingerprint>>,
    capacity: Option<usize>,
}

impl InMemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses new fingerprints once it holds `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            capacity: Some(capacity),
        }
    }
}

impl FingerprintStore for InMemoryFingerprintStore {
    fn check_and_register(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let mut seen = self.seen.lock().map_err(|_| StoreError::Poisoned)?;

        if seen.contains(fingerprint) {
            return Ok(true);
        }
        if let Some(capacity) = self.capacity {
            if seen.len() >= capacity {
                return Err(StoreError::CapacityExceeded(capacity));
            }
        }
        seen.insert(fingerprint.clone());
        Ok(false)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.seen.lock().map_err(|_| StoreError::Poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{FieldValue, MatchQuality, TextPosition};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    fn field(value: FieldValue) -> ExtractedField {
        ExtractedField {
            normalized_value: value,
            raw_match: String::new(),
            confidence: 1.0,
            detector_id: "test".to_string(),
            quality: MatchQuality::Exact,
            position: TextPosition::default(),
        }
    }

    fn fields(
        vendor: Option<&str>,
        number: Option<&str>,
        total: Option<&str>,
    ) -> BTreeMap<String, ExtractedField> {
        let mut map = BTreeMap::new();
        if let Some(v) = vendor {
            map.insert("vendor_name".to_string(), field(FieldValue::Text(v.to_string())));
        }
        if let Some(n) = number {
            map.insert("invoice_number".to_string(), field(FieldValue::Text(n.to_string())));
        }
        if let Some(t) = total {
            let total = Decimal::from_str(t).unwrap();
            map.insert("total".to_string(), field(FieldValue::Amount(total)));
        }
        map
    }

    #[test]
    fn test_fingerprint_normalizes_inputs() {
        let a = fingerprint(&fields(Some("Acme Corp"), Some("INV-001"), Some("100.00")));
        let b = fingerprint(&fields(Some("ACME CORP."), Some("inv 1"), Some("100")));
        let c = fingerprint(&fields(Some("Acme Corp"), Some("INV-002"), Some("100.00")));

        assert!(a.is_some());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.unwrap().as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_needs_number_or_total() {
        assert_eq!(fingerprint(&fields(Some("Acme Corp"), None, None)), None);
        assert!(fingerprint(&fields(None, None, Some("5.00"))).is_some());
    }

    #[test]
    fn test_normalize_invoice_number() {
        assert_eq!(normalize_invoice_number("INV-2024-001"), "INV2024-1");
        assert_eq!(normalize_invoice_number("INV-001"), "INV1");
        assert_eq!(normalize_invoice_number("inv 1"), "INV1");
        assert_eq!(normalize_invoice_number("00042"), "42");
        assert_eq!(normalize_invoice_number("a0b"), "A0B");
        assert_eq!(normalize_invoice_number("A-000"), "A0");
    }

    #[test]
    fn test_digit_runs_do_not_merge_across_separators() {
        let a = fingerprint(&fields(Some("Acme Corp"), Some("INV-2024-001"), Some("10.00")));
        let b = fingerprint(&fields(Some("Acme Corp"), Some("INV-2024-1"), Some("10.00")));
        let c = fingerprint(&fields(Some("Acme Corp"), Some("INV-20-241"), Some("10.00")));

        assert_eq!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_check_and_register() {
        let store = InMemoryFingerprintStore::new();
        let fp = fingerprint(&fields(Some("Acme Corp"), Some("INV-001"), Some("100.00"))).unwrap();

        assert_eq!(store.check_and_register(&fp), Ok(false));
        assert_eq!(store.check_and_register(&fp), Ok(true));
        assert_eq!(store.len(), Ok(1));
    }

    #[test]
    fn test_capacity_limit() {
        let store = InMemoryFingerprintStore::with_capacity(1);
        let first = fingerprint(&fields(None, Some("1"), None)).unwrap();
        let second = fingerprint(&fields(None, Some("2"), None)).unwrap();

        assert_eq!(store.check_and_register(&first), Ok(false));
        assert_eq!(store.check_and_register(&second), Err(StoreError::CapacityExceeded(1)));
        // Known fingerprints are still recognized when full
        assert_eq!(store.check_and_register(&first), Ok(true));
    }

    #[test]
    fn test_concurrent_registration() {
        let store = Arc::new(InMemoryFingerprintStore::new());
        let fp = fingerprint(&fields(Some("Acme Corp"), Some("INV-001"), Some("100.00"))).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let fp = fp.clone();
                thread::spawn(move || store.check_and_register(&fp).unwrap())
            })
            .collect();
        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|dup| !**dup).count(), 1);
    }
}
