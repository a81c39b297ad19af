//! Configuration structures for the extraction engine.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InvexError, Result};

/// Main configuration for the invex engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InvexConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Arithmetic validation configuration.
    pub validation: ValidationConfig,

    /// Overall confidence configuration.
    pub confidence: ConfidenceConfig,

    /// Duplicate detection configuration.
    pub duplicates: DuplicateConfig,
}

/// How to read ambiguous numeric dates such as `03/04/2024`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY`.
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`.
    DayFirst,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Multiplier for a value found next to its exact label.
    pub exact_label_multiplier: f32,

    /// Multiplier for a value found next to an abbreviated or fuzzy label.
    pub partial_label_multiplier: f32,

    /// Multiplier for a value inferred from its position alone.
    pub positional_multiplier: f32,

    /// Interpretation of ambiguous numeric dates.
    pub date_order: DateOrder,

    /// Per-detector weight overrides, keyed by detector id.
    pub detector_weights: BTreeMap<String, f32>,

    /// Detector ids that are skipped entirely.
    pub disabled_detectors: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            exact_label_multiplier: 1.0,
            partial_label_multiplier: 0.6,
            positional_multiplier: 0.4,
            date_order: DateOrder::MonthFirst,
            detector_weights: BTreeMap::new(),
            disabled_detectors: Vec::new(),
        }
    }
}

/// Arithmetic validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Allowed discrepancy as a fraction of the total (0.01 = 1%).
    pub relative_tolerance: f64,

    /// Minimum allowed discrepancy in currency units.
    pub absolute_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 0.01,
            absolute_tolerance: 0.01,
        }
    }
}

/// Overall confidence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Weight of a required field in the weighted mean.
    pub required_weight: f32,

    /// Weight of an optional field in the weighted mean.
    pub optional_weight: f32,

    /// Added when the arithmetic check passes.
    pub math_bonus: f32,

    /// Subtracted when the arithmetic check fails.
    pub math_penalty: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            required_weight: 2.0,
            optional_weight: 1.0,
            math_bonus: 0.05,
            math_penalty: 0.10,
        }
    }
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Check documents against the fingerprint store.
    pub enabled: bool,

    /// Maximum number of remembered fingerprints (unbounded when absent).
    pub max_fingerprints: Option<usize>,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_fingerprints: None,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let extraction = &self.extraction;
        for (name, value) in [
            ("extraction.exact_label_multiplier", extraction.exact_label_multiplier),
            ("extraction.partial_label_multiplier", extraction.partial_label_multiplier),
            ("extraction.positional_multiplier", extraction.positional_multiplier),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvexError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        for (id, weight) in &extraction.detector_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(InvexError::Config(format!(
                    "weight for detector {} must be a non-negative number, got {}",
                    id, weight
                )));
            }
        }

        let validation = &self.validation;
        if !(validation.relative_tolerance >= 0.0 && validation.absolute_tolerance >= 0.0) {
            return Err(InvexError::Config(
                "validation tolerances must be non-negative".to_string(),
            ));
        }

        let confidence = &self.confidence;
        if confidence.required_weight <= 0.0 || confidence.optional_weight <= 0.0 {
            return Err(InvexError::Config(
                "confidence weights must be positive".to_string(),
            ));
        }
        if confidence.math_bonus < 0.0 || confidence.math_penalty < 0.0 {
            return Err(InvexError::Config(
                "math bonus and penalty must be non-negative".to_string(),
            ));
        }

        if self.duplicates.max_fingerprints == Some(0) {
            return Err(InvexError::Config(
                "duplicates.max_fingerprints must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(InvexConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"validation": {"relative_tolerance": 0.02}}"#).unwrap();

        assert_eq!(config.validation.relative_tolerance, 0.02);
        assert_eq!(config.validation.absolute_tolerance, 0.01);
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_rejects_out_of_range_multiplier() {
        let mut config = InvexConfig::default();
        config.extraction.partial_label_multiplier = 1.5;
        assert!(matches!(config.validate(), Err(InvexError::Config(_))));
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let mut config = InvexConfig::default();
        config.validation.absolute_tolerance = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.extraction.date_order = DateOrder::DayFirst;
        config.extraction.detector_weights.insert("total.labeled".to_string(), 0.8);
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
