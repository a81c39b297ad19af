//! Core library for invoice text extraction.
//!
//! This crate provides:
//! - Text normalization of OCR and PDF text-layer output
//! - Field detection with per-field confidence
//! - Line-item table parsing and arithmetic validation
//! - Duplicate detection by content fingerprint

pub mod error;
pub mod invoice;
pub mod models;
pub mod normalize;

pub use error::{DetectorError, ExtractionError, InvexError, Result, StoreError};
pub use invoice::{
    DetectorRegistry, FieldExtractor, Fingerprint, FingerprintStore, InMemoryFingerprintStore,
    InvoiceEngine, InvoiceParser, LineItemParser, MathValidator,
};
pub use models::config::{DateOrder, InvexConfig};
pub use models::invoice::{
    DataQuality, ExtractedField, ExtractionResult, FieldValue, LineItem, MatchQuality,
    ValidationMethod, ValidationResult, field_names,
};
pub use normalize::{NormalizedText, normalize};
