// crates/panel-gate-core/src/runtime/fusion.rs
// ============================================================================
// Module: Panel Gate Engine Fusion
// Description: Reliability-weighted fusion of candidate engine estimates.
// Purpose: Reduce several engine proposals to one value, range, and disagreement score.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Estimates with a non-finite value or a non-positive weight are discarded.
//! The fused value is the reliability-weighted mean; the weighted standard
//! deviation is the spread. Disagreement is the spread normalised by the
//! output's typical range, so it is comparable across units. A single usable
//! estimate passes through unchanged with zero disagreement. A fusion whose
//! mean or spread overflows is rejected rather than reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::catalog::OutputDefinition;
use crate::core::estimate::EngineEstimate;
use crate::core::estimate::ValueRange;
use crate::core::identifiers::EngineId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Fused estimate for one output.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedEstimate {
    /// Reliability-weighted mean.
    pub value: f64,
    /// Uncertainty range.
    pub range: ValueRange,
    /// Weighted standard deviation of the estimates.
    pub spread: f64,
    /// Spread divided by the typical-range span.
    pub disagreement: f64,
    /// Engines that contributed, sorted and deduplicated.
    pub engines: Vec<EngineId>,
}

/// Fusion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    /// No usable estimate was supplied.
    #[error("no usable engine estimates for output {0}")]
    NoEstimates(String),
    /// The fused value or its spread is not a finite number.
    #[error("fused estimate for output {0} is not finite")]
    NonFinite(String),
}

// ============================================================================
// SECTION: Fusion
// ============================================================================

/// Fuses candidate estimates for one output.
///
/// # Errors
///
/// Returns [`FusionError::NoEstimates`] when every estimate is unusable and
/// [`FusionError::NonFinite`] when the weighted sums overflow.
pub fn fuse(
    definition: &OutputDefinition,
    estimates: &[EngineEstimate],
) -> Result<FusedEstimate, FusionError> {
    let usable: Vec<&EngineEstimate> =
        estimates.iter().filter(|estimate| estimate.is_usable()).collect();
    let mut engines: Vec<EngineId> = usable.iter().map(|estimate| estimate.engine.clone()).collect();
    engines.sort();
    engines.dedup();

    match usable.as_slice() {
        [] => Err(FusionError::NoEstimates(definition.key.to_string())),
        [single] => Ok(FusedEstimate {
            value: single.value,
            range: single
                .range
                .filter(ValueRange::is_well_formed)
                .unwrap_or_else(|| ValueRange::point(single.value)),
            spread: 0.0,
            disagreement: 0.0,
            engines,
        }),
        many => {
            let total_weight: f64 = many.iter().map(|estimate| estimate.reliability).sum();
            if !total_weight.is_finite() {
                return Err(FusionError::NonFinite(definition.key.to_string()));
            }
            let mean = many
                .iter()
                .map(|estimate| (estimate.reliability / total_weight) * estimate.value)
                .sum::<f64>();
            let variance = many
                .iter()
                .map(|estimate| {
                    let delta = estimate.value - mean;
                    (estimate.reliability / total_weight) * delta * delta
                })
                .sum::<f64>();
            let spread = variance.sqrt();
            let range = ValueRange::new(mean - spread, mean + spread);
            if !mean.is_finite() || !range.is_well_formed() {
                return Err(FusionError::NonFinite(definition.key.to_string()));
            }
            let span = definition.typical_range.span();
            let disagreement = if span > 0.0 { spread / span } else { 0.0 };
            Ok(FusedEstimate {
                value: mean,
                range,
                spread,
                disagreement,
                engines,
            })
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
