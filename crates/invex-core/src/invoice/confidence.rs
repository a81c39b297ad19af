//! Document-level confidence scoring.

use std::collections::BTreeMap;

use crate::models::config::ConfidenceConfig;
use crate::models::invoice::{ValidationResult, field_names};

/// Output of [`ConfidenceAggregator::aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceSummary {
    /// Weighted document confidence, in [0, 1], four decimals.
    pub overall_confidence: f32,
    /// Required fields that were not extracted, in fixed order.
    pub missing_required_fields: Vec<String>,
}

/// Combines per-field confidences and the math check into one score.
#[derive(Debug, Clone)]
pub struct ConfidenceAggregator {
    config: ConfidenceConfig,
}

impl ConfidenceAggregator {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Weighted mean of field confidences with required fields counted
    /// double (by default). A missing required field counts as zero; a
    /// missing optional field is left out.
    pub fn aggregate(
        &self,
        field_confidence: &BTreeMap<String, f32>,
        validation: &ValidationResult,
    ) -> ConfidenceSummary {
        let mut weighted = 0.0_f32;
        let mut weights = 0.0_f32;

        for (field, confidence) in field_confidence {
            let weight = if field_names::is_required(field) {
                self.config.required_weight
            } else {
                self.config.optional_weight
            };
            weighted += weight * confidence;
            weights += weight;
        }

        let missing_required_fields: Vec<String> = field_names::REQUIRED
            .iter()
            .filter(|name| !field_confidence.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        weights += self.config.required_weight * missing_required_fields.len() as f32;

        let mean = if weights > 0.0 { weighted / weights } else { 0.0 };
        let adjusted = match validation.calculations_correct {
            Some(true) => mean + self.config.math_bonus,
            Some(false) => mean - self.config.math_penalty,
            None => mean,
        };

        ConfidenceSummary {
            overall_confidence: round4(adjusted.clamp(0.0, 1.0)),
            missing_required_fields,
        }
    }
}

impl Default for ConfidenceAggregator {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
