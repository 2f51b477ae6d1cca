// crates/panel-gate-core/src/runtime/settings.rs
// ============================================================================
// Module: Panel Gate Arbitration Settings
// Description: Tunable constants for the eligibility gate and confidence arbitrator.
// Purpose: Keep every numeric threshold in one validated, deserializable place.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Defaults are chosen deliberately rather than copied from placeholder
//! values. Hosts override them through the `[gate]` and `[confidence]`
//! tables of the configuration file; every override is validated before
//! use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::decision::ConfidencePenalty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tolerance when checking that component weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// SECTION: Gate Settings
// ============================================================================

/// Eligibility gate thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Confidence baseline before coherence and signal scaling.
    pub base_confidence: f64,
    /// Provisional confidence below which an output is suppressed.
    pub confidence_floor: f64,
    /// Score assumed for a domain the feature pack does not describe.
    pub unscored_domain_score: f64,
    /// Coherence below which `LOW_COHERENCE` applies.
    pub low_coherence_threshold: f64,
    /// Signal quality below which `LOW_SIGNAL_QUALITY` applies.
    pub low_signal_threshold: f64,
    /// Mean field confidence below which `LOW_ANCHOR_QUALITY` applies.
    pub low_anchor_quality_threshold: f64,
    /// Anchor age in hours beyond which `STALE_DATA` applies.
    pub stale_after_hours: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.75,
            confidence_floor: 0.35,
            unscored_domain_score: 0.5,
            low_coherence_threshold: 0.5,
            low_signal_threshold: 0.5,
            low_anchor_quality_threshold: 0.5,
            stale_after_hours: 72.0,
        }
    }
}

impl GateConfig {
    /// Validates gate thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        ensure_unit("gate.base_confidence", self.base_confidence)?;
        ensure_unit("gate.confidence_floor", self.confidence_floor)?;
        ensure_unit("gate.unscored_domain_score", self.unscored_domain_score)?;
        ensure_unit("gate.low_coherence_threshold", self.low_coherence_threshold)?;
        ensure_unit("gate.low_signal_threshold", self.low_signal_threshold)?;
        ensure_unit("gate.low_anchor_quality_threshold", self.low_anchor_quality_threshold)?;
        ensure_positive("gate.stale_after_hours", self.stale_after_hours)
    }
}

// ============================================================================
// SECTION: Confidence Settings
// ============================================================================

/// Weights of the arbitrator's linear combination; must sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentWeights {
    /// Weight of anchor completeness.
    pub completeness: f64,
    /// Weight of anchor field confidence.
    pub anchor_quality: f64,
    /// Weight of anchor recency.
    pub recency: f64,
    /// Weight of domain signal quality.
    pub signal_quality: f64,
    /// Weight of engine agreement.
    pub agreement: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            completeness: 0.25,
            anchor_quality: 0.20,
            recency: 0.15,
            signal_quality: 0.25,
            agreement: 0.15,
        }
    }
}

impl ComponentWeights {
    /// Returns the weights in driver order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 5] {
        [self.completeness, self.anchor_quality, self.recency, self.signal_quality, self.agreement]
    }
}

/// Fixed deduction per penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PenaltyAmounts {
    /// `LOW_COHERENCE` deduction.
    pub low_coherence: f64,
    /// `LOW_SIGNAL_QUALITY` deduction.
    pub low_signal_quality: f64,
    /// `STALE_DATA` deduction.
    pub stale_data: f64,
    /// `LOW_ANCHOR_QUALITY` deduction.
    pub low_anchor_quality: f64,
    /// `AGREEMENT_LOW` deduction.
    pub agreement_low: f64,
}

impl Default for PenaltyAmounts {
    fn default() -> Self {
        Self {
            low_coherence: 0.10,
            low_signal_quality: 0.10,
            stale_data: 0.08,
            low_anchor_quality: 0.08,
            agreement_low: 0.12,
        }
    }
}

impl PenaltyAmounts {
    /// Returns the deduction for a penalty.
    #[must_use]
    pub const fn amount(&self, penalty: ConfidencePenalty) -> f64 {
        match penalty {
            ConfidencePenalty::LowCoherence => self.low_coherence,
            ConfidencePenalty::LowSignalQuality => self.low_signal_quality,
            ConfidencePenalty::StaleData => self.stale_data,
            ConfidencePenalty::LowAnchorQuality => self.low_anchor_quality,
            ConfidencePenalty::AgreementLow => self.agreement_low,
        }
    }
}

/// Confidence arbitrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceConfig {
    /// Component weights.
    pub weights: ComponentWeights,
    /// Normalised disagreement above which `AGREEMENT_LOW` applies.
    pub disagreement_threshold: f64,
    /// Hours over which recency decays linearly from one to zero.
    pub recency_decay_hours: f64,
    /// Penalty deductions.
    pub penalties: PenaltyAmounts,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            disagreement_threshold: 0.15,
            recency_decay_hours: 168.0,
            penalties: PenaltyAmounts::default(),
        }
    }
}

impl ConfidenceConfig {
    /// Validates weights, thresholds, and penalty amounts.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let names = [
            "confidence.weights.completeness",
            "confidence.weights.anchor_quality",
            "confidence.weights.recency",
            "confidence.weights.signal_quality",
            "confidence.weights.agreement",
        ];
        let weights = self.weights.as_array();
        for (name, weight) in names.into_iter().zip(weights) {
            ensure_unit(name, weight)?;
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(SettingsError::WeightSum(total));
        }
        ensure_unit("confidence.disagreement_threshold", self.disagreement_threshold)?;
        ensure_positive("confidence.recency_decay_hours", self.recency_decay_hours)?;
        let penalties = [
            ("confidence.penalties.low_coherence", self.penalties.low_coherence),
            ("confidence.penalties.low_signal_quality", self.penalties.low_signal_quality),
            ("confidence.penalties.stale_data", self.penalties.stale_data),
            ("confidence.penalties.low_anchor_quality", self.penalties.low_anchor_quality),
            ("confidence.penalties.agreement_low", self.penalties.agreement_low),
        ];
        for (name, amount) in penalties {
            ensure_unit(name, amount)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invalid arbitration settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// A value must lie within [0,1].
    #[error("{0} must be within [0,1]")]
    OutOfUnitRange(&'static str),
    /// A value must be finite and greater than zero.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    /// Component weights do not sum to one.
    #[error("confidence weights must sum to 1 (got {0})")]
    WeightSum(f64),
}

/// Rejects values outside [0,1].
fn ensure_unit(name: &'static str, value: f64) -> Result<(), SettingsError> {
    if (0.0 ..= 1.0).contains(&value) { Ok(()) } else { Err(SettingsError::OutOfUnitRange(name)) }
}

/// Rejects non-finite or non-positive values.
fn ensure_positive(name: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 { Ok(()) } else { Err(SettingsError::NotPositive(name)) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(GateConfig::default().validate(), Ok(()));
        assert_eq!(ConfidenceConfig::default().validate(), Ok(()));
    }

    #[test]
    fn unbalanced_weights_are_rejected() {
        let mut config = ConfidenceConfig::default();
        config.weights.agreement = 0.5;
        assert!(matches!(config.validate(), Err(SettingsError::WeightSum(_))));
    }
}
