// crates/panel-gate-core/src/runtime/confidence.rs
// ============================================================================
// Module: Panel Gate Confidence Arbitrator
// Description: Calibrated confidence scoring with ranked drivers and penalties.
// Purpose: Turn per-output quality components into one bounded confidence value.
// Dependencies: crate::core, crate::runtime::settings
// ============================================================================

//! ## Overview
//! Confidence is a weighted linear combination of five components in [0,1]:
//! completeness, anchor quality, recency, signal quality, and engine
//! agreement (`1 - min(disagreement, 1)`). Each penalty then subtracts its
//! fixed amount and the result is clamped to [0,1].
//!
//! Drivers are the three largest positive weighted contributions. Ties are
//! broken by the fixed driver order so the ranking is reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::decision::ConfidenceDriver;
use crate::core::decision::ConfidencePenalty;
use crate::runtime::settings::ConfidenceConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of drivers reported per output.
const MAX_DRIVERS: usize = 3;

/// Drivers in component order; also the tie-break order.
const DRIVER_ORDER: [ConfidenceDriver; 5] = [
    ConfidenceDriver::HighCompleteness,
    ConfidenceDriver::HighAnchorQuality,
    ConfidenceDriver::RecentData,
    ConfidenceDriver::HighSignalQuality,
    ConfidenceDriver::EngineAgreement,
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Quality components for one output, each expected in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceComponents {
    /// Fraction of declared anchors available.
    pub completeness: f64,
    /// Mean field confidence of the available anchors.
    pub anchor_quality: f64,
    /// Recency of the oldest anchor.
    pub recency: f64,
    /// Domain signal quality.
    pub signal_quality: f64,
    /// Normalised engine disagreement; may exceed one.
    pub disagreement: f64,
}

/// Arbitrated confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceScore {
    /// Confidence in [0,1].
    pub value: f64,
    /// Up to three drivers, strongest first.
    pub drivers: Vec<ConfidenceDriver>,
    /// Deduplicated penalties in application order.
    pub penalties: Vec<ConfidencePenalty>,
}

// ============================================================================
// SECTION: Arbitrator
// ============================================================================

/// Confidence arbitrator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfidenceArbitrator {
    /// Weights, thresholds, and penalty amounts.
    config: ConfidenceConfig,
}

impl ConfidenceArbitrator {
    /// Creates an arbitrator.
    #[must_use]
    pub const fn new(config: ConfidenceConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the arbitrator settings.
    #[must_use]
    pub const fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    /// Computes recency in [0,1] from the oldest anchor age.
    ///
    /// Outputs without measured anchors are treated as current.
    #[must_use]
    pub fn recency(&self, oldest_age_hours: Option<f64>) -> f64 {
        oldest_age_hours.map_or(1.0, |age| {
            (1.0 - age.max(0.0) / self.config.recency_decay_hours).clamp(0.0, 1.0)
        })
    }

    /// Scores one output given its components and the gate's penalties.
    #[must_use]
    pub fn score(
        &self,
        components: ConfidenceComponents,
        penalties: &[ConfidencePenalty],
    ) -> ConfidenceScore {
        let agreement = 1.0 - unit(components.disagreement);
        let values = [
            unit(components.completeness),
            unit(components.anchor_quality),
            unit(components.recency),
            unit(components.signal_quality),
            agreement,
        ];
        let contributions: Vec<(ConfidenceDriver, f64)> = DRIVER_ORDER
            .into_iter()
            .zip(self.config.weights.as_array())
            .zip(values)
            .map(|((driver, weight), value)| (driver, weight * value))
            .collect();
        let weighted: f64 = contributions.iter().map(|(_, contribution)| contribution).sum();

        let mut applied: Vec<ConfidencePenalty> = Vec::with_capacity(penalties.len() + 1);
        for penalty in penalties {
            if !applied.contains(penalty) {
                applied.push(*penalty);
            }
        }
        if components.disagreement > self.config.disagreement_threshold
            && !applied.contains(&ConfidencePenalty::AgreementLow)
        {
            applied.push(ConfidencePenalty::AgreementLow);
        }
        let deducted: f64 =
            applied.iter().map(|penalty| self.config.penalties.amount(*penalty)).sum();

        let mut ranked: Vec<(ConfidenceDriver, f64)> =
            contributions.into_iter().filter(|(_, contribution)| *contribution > 0.0).collect();
        ranked.sort_by(|(left_driver, left), (right_driver, right)| {
            right.total_cmp(left).then_with(|| left_driver.cmp(right_driver))
        });
        let drivers = ranked.into_iter().take(MAX_DRIVERS).map(|(driver, _)| driver).collect();

        ConfidenceScore {
            value: (weighted - deducted).clamp(0.0, 1.0),
            drivers,
            penalties: applied,
        }
    }
}

/// Clamps a component into [0,1], mapping NaN to zero.
fn unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn components() -> ConfidenceComponents {
        ConfidenceComponents {
            completeness: 1.0,
            anchor_quality: 1.0,
            recency: 1.0,
            signal_quality: 0.75,
            disagreement: 0.0,
        }
    }

    #[test]
    fn equal_contributions_rank_by_fixed_order() {
        let mut input = components();
        input.signal_quality = 0.5;
        let score = ConfidenceArbitrator::default().score(input, &[]);
        assert_eq!(
            score.drivers,
            vec![
                ConfidenceDriver::HighCompleteness,
                ConfidenceDriver::HighAnchorQuality,
                ConfidenceDriver::RecentData,
            ]
        );
        assert!((score.value - 0.875).abs() < 1e-9);
    }

    #[test]
    fn recency_decays_linearly() {
        let arbitrator = ConfidenceArbitrator::default();
        assert!((arbitrator.recency(None) - 1.0).abs() < f64::EPSILON);
        assert!((arbitrator.recency(Some(84.0)) - 0.5).abs() < 1e-9);
        assert!(arbitrator.recency(Some(1_000.0)).abs() < f64::EPSILON);
    }
}
