// crates/panel-gate-core/src/core/estimate.rs
// ============================================================================
// Module: Panel Gate Estimates
// Description: Candidate estimates proposed by estimation engines.
// Purpose: Define the ephemeral values consumed by engine fusion.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Engines propose an [`EngineEstimate`]; fusion consumes them and never
//! stores them past the output's evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EngineId;

// ============================================================================
// SECTION: Value Range
// ============================================================================

/// Closed numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl ValueRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
        }
    }

    /// Creates a degenerate range at a single point.
    #[must_use]
    pub const fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Returns the width of the range.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true when both bounds are finite and ordered.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

// ============================================================================
// SECTION: Engine Estimate
// ============================================================================

/// Candidate estimate from one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEstimate {
    /// Engine that produced the estimate.
    pub engine: EngineId,
    /// Point estimate.
    pub value: f64,
    /// Optional uncertainty range.
    #[serde(default)]
    pub range: Option<ValueRange>,
    /// Reliability weight; must be positive to take part in fusion.
    pub reliability: f64,
}

impl EngineEstimate {
    /// Creates an estimate without a range.
    #[must_use]
    pub fn new(engine: impl Into<EngineId>, value: f64, reliability: f64) -> Self {
        Self {
            engine: engine.into(),
            value,
            range: None,
            reliability,
        }
    }

    /// Attaches an uncertainty range.
    #[must_use]
    pub const fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Returns true when the estimate can take part in fusion.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.value.is_finite() && self.reliability.is_finite() && self.reliability > 0.0
    }
}
