//! Field extraction: run every detector and pick one winner per field.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::registry::DetectorRegistry;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{ExtractedField, FieldCandidate, MatchQuality};
use crate::normalize::NormalizedText;

/// Output of [`FieldExtractor::extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtraction {
    /// Winning value per field. Fields without candidates are absent.
    pub fields: BTreeMap<String, ExtractedField>,
    /// Confidence of each winning value.
    pub field_confidence: BTreeMap<String, f32>,
    /// Detector failures.
    pub warnings: Vec<String>,
}

/// Runs the detector registry over normalized text.
pub struct FieldExtractor {
    registry: DetectorRegistry,
    exact_multiplier: f32,
    partial_multiplier: f32,
    positional_multiplier: f32,
}

impl FieldExtractor {
    /// Extractor with the built-in detectors.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_registry(DetectorRegistry::from_config(config), config)
    }

    /// Extractor with a custom registry.
    pub fn with_registry(registry: DetectorRegistry, config: &ExtractionConfig) -> Self {
        Self {
            registry,
            exact_multiplier: config.exact_label_multiplier,
            partial_multiplier: config.partial_label_multiplier,
            positional_multiplier: config.positional_multiplier,
        }
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// All candidates in registry order, then document order.
    pub fn candidates(&self, text: &NormalizedText) -> (Vec<FieldCandidate>, Vec<String>) {
        let mut candidates = Vec::new();
        let mut warnings = Vec::new();

        for entry in self.registry.detectors() {
            let detector = &entry.detector;
            match detector.detect(text) {
                Ok(matches) => {
                    if !matches.is_empty() {
                        debug!("Detector {} found {} candidate(s)", detector.id(), matches.len());
                    }
                    candidates.extend(matches.into_iter().map(|m| FieldCandidate {
                        field_name: detector.field().to_string(),
                        raw_match: m.raw,
                        confidence: self.confidence(entry.weight, m.quality),
                        normalized_value: m.value,
                        detector_id: detector.id().to_string(),
                        weight: entry.weight,
                        quality: m.quality,
                        structural: m.structural,
                        position: m.position,
                    }));
                }
                Err(e) => {
                    warn!("Detector {} failed: {}", detector.id(), e);
                    warnings.push(format!("detector {} failed: {}", detector.id(), e));
                }
            }
        }

        (candidates, warnings)
    }

    /// Extract one value per field.
    pub fn extract(&self, text: &NormalizedText) -> FieldExtraction {
        let (candidates, warnings) = self.candidates(text);

        let mut winners: BTreeMap<String, FieldCandidate> = BTreeMap::new();
        for candidate in candidates {
            match winners.get(&candidate.field_name) {
                Some(current) if !beats(&candidate, current) => {}
                _ => {
                    winners.insert(candidate.field_name.clone(), candidate);
                }
            }
        }

        let field_confidence = winners
            .iter()
            .map(|(name, c)| (name.clone(), c.confidence))
            .collect();
        let fields = winners
            .into_iter()
            .map(|(name, c)| (name, ExtractedField::from(c)))
            .collect();

        FieldExtraction {
            fields,
            field_confidence,
            warnings,
        }
    }

    fn confidence(&self, weight: f32, quality: MatchQuality) -> f32 {
        let multiplier = match quality {
            MatchQuality::Exact => self.exact_multiplier,
            MatchQuality::Partial => self.partial_multiplier,
            MatchQuality::Positional => self.positional_multiplier,
        };
        (weight * multiplier).clamp(0.0, 1.0)
    }
}

/// Whether `challenger` replaces `incumbent`: higher weight, then higher
/// structural score, then earlier position. Full ties keep the incumbent,
/// which came from an earlier-registered detector.
fn beats(challenger: &FieldCandidate, incumbent: &FieldCandidate) -> bool {
    challenger
        .weight
        .total_cmp(&incumbent.weight)
        .then_with(|| challenger.structural.total_cmp(&incumbent.structural))
        .then_with(|| incumbent.position.cmp(&challenger.position))
        == Ordering::Greater
}
