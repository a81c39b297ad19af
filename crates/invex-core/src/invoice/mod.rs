//! Invoice field extraction, validation and duplicate detection.

pub mod confidence;
pub mod duplicate;
mod engine;
pub mod fields;
pub mod line_items;
pub mod registry;
pub mod rules;
pub mod validate;

pub use confidence::{ConfidenceAggregator, ConfidenceSummary};
pub use duplicate::{Fingerprint, FingerprintStore, InMemoryFingerprintStore, fingerprint};
pub use engine::{InvoiceEngine, InvoiceParser};
pub use fields::{FieldExtraction, FieldExtractor};
pub use line_items::LineItemParser;
pub use registry::{DetectorRegistry, RegisteredDetector};
pub use rules::{Detector, ExtractionMatch};
pub use validate::MathValidator;
