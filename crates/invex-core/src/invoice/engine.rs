//! Invoice engine: normalization, extraction, validation, scoring, and
//! duplicate detection in one call.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::config::InvexConfig;
use crate::models::invoice::ExtractionResult;
use crate::normalize::normalize;

use super::confidence::ConfidenceAggregator;
use super::duplicate::{FingerprintStore, InMemoryFingerprintStore, fingerprint};
use super::fields::FieldExtractor;
use super::line_items::LineItemParser;
use super::registry::DetectorRegistry;
use super::validate::MathValidator;

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse one document from text.
    fn parse(&self, text: &str) -> Result<ExtractionResult, ExtractionError>;
}

/// The full extraction pipeline.
///
/// Every stage except the duplicate check is pure, so one engine can be
/// shared across threads and reused for any number of documents.
pub struct InvoiceEngine {
    config: InvexConfig,
    fields: FieldExtractor,
    line_items: LineItemParser,
    validator: MathValidator,
    aggregator: ConfidenceAggregator,
    store: Arc<dyn FingerprintStore>,
}

impl InvoiceEngine {
    /// Engine with the built-in detectors and a fresh in-memory store.
    pub fn new(config: InvexConfig) -> Self {
        let store: Arc<dyn FingerprintStore> = match config.duplicates.max_fingerprints {
            Some(capacity) => Arc::new(InMemoryFingerprintStore::with_capacity(capacity)),
            None => Arc::new(InMemoryFingerprintStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Engine sharing an existing fingerprint store.
    pub fn with_store(config: InvexConfig, store: Arc<dyn FingerprintStore>) -> Self {
        let registry = DetectorRegistry::from_config(&config.extraction);
        Self::with_registry(config, registry, store)
    }

    /// Engine with a custom detector registry.
    pub fn with_registry(
        config: InvexConfig,
        registry: DetectorRegistry,
        store: Arc<dyn FingerprintStore>,
    ) -> Self {
        Self {
            fields: FieldExtractor::with_registry(registry, &config.extraction),
            line_items: LineItemParser::new(),
            validator: MathValidator::new(&config.validation),
            aggregator: ConfidenceAggregator::new(&config.confidence),
            store,
            config,
        }
    }

    pub fn config(&self) -> &InvexConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FingerprintStore> {
        &self.store
    }

    /// Extract, validate and score a document without touching the
    /// fingerprint store. `duplicate_detected` is always `false`.
    pub fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        let normalized = normalize(text)?;
        info!(
            "Extracting invoice from {} lines on {} page(s)",
            normalized.len(),
            normalized.page_count()
        );

        let extraction = self.fields.extract(&normalized);
        debug!("Extracted {} field(s)", extraction.fields.len());

        let line_items = self.line_items.parse(&normalized);
        debug!("Parsed {} line item(s)", line_items.len());

        let math_validation = self.validator.validate(&extraction.fields, &line_items);
        let summary = self
            .aggregator
            .aggregate(&extraction.field_confidence, &math_validation);

        Ok(ExtractionResult {
            fields: extraction.fields,
            line_items,
            field_confidence: extraction.field_confidence,
            overall_confidence: summary.overall_confidence,
            missing_required_fields: summary.missing_required_fields,
            math_validation,
            duplicate_detected: false,
            warnings: extraction.warnings,
        })
    }

    /// Like [`extract`](Self::extract), then check and record the document
    /// fingerprint.
    ///
    /// Store failures do not fail the call: they are reported in
    /// `warnings` and the document is treated as new.
    pub fn process(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        let mut result = self.extract(text)?;

        if !self.config.duplicates.enabled {
            return Ok(result);
        }

        let Some(fp) = fingerprint(&result.fields) else {
            debug!("No invoice number or total, skipping duplicate check");
            return Ok(result);
        };

        match self.store.check_and_register(&fp) {
            Ok(duplicate) => {
                if duplicate {
                    info!("Duplicate invoice detected: {}", fp);
                }
                result.duplicate_detected = duplicate;
            }
            Err(e) => {
                warn!("Duplicate check failed: {}", e);
                result.warnings.push(format!("duplicate check failed: {}", e));
            }
        }

        info!(
            "Processed invoice with confidence {:.4}, {} missing required field(s)",
            result.overall_confidence,
            result.missing_required_fields.len()
        );
        Ok(result)
    }
}

impl Default for InvoiceEngine {
    fn default() -> Self {
        Self::new(InvexConfig::default())
    }
}

impl InvoiceParser for InvoiceEngine {
    fn parse(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        self.process(text)
    }
}
