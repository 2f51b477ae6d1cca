// crates/panel-gate-core/src/core/decision.rs
// ============================================================================
// Module: Panel Gate Decisions
// Description: Gate decisions, suppression reasons, penalties, and trace entries.
// Purpose: Provide the typed, serializable result of one eligibility evaluation.
// Dependencies: serde, smallvec
// ============================================================================

//! ## Overview
//! A [`GateDecision`] is the primary output of the eligibility gate. The
//! suppression reason is always the enum value set by the step that fired;
//! the accompanying text is for display only and is never parsed back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::core::identifiers::InputRef;

// ============================================================================
// SECTION: Suppression Reasons
// ============================================================================

/// Closed set of reasons an output can be suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuppressionReason {
    /// A declared blocker is active.
    BlockerConditionMet,
    /// A `requires_all` anchor is absent.
    MissingRequiredAnchor,
    /// Provisional confidence fell below the floor.
    ConfidenceBelowThreshold,
    /// No `requires_any` input is present, or no engine produced an estimate.
    InsufficientSignal,
}

impl SuppressionReason {
    /// Returns the stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockerConditionMet => "BLOCKER_CONDITION_MET",
            Self::MissingRequiredAnchor => "MISSING_REQUIRED_ANCHOR",
            Self::ConfidenceBelowThreshold => "CONFIDENCE_BELOW_THRESHOLD",
            Self::InsufficientSignal => "INSUFFICIENT_SIGNAL",
        }
    }
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Penalties and Drivers
// ============================================================================

/// Soft negative adjustment applied to an output's confidence.
///
/// # Invariants
/// - Each variant maps to exactly one fixed deduction in the arbitrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidencePenalty {
    /// Domain coherence is below the low-coherence threshold.
    LowCoherence,
    /// Domain signal quality is below the low-signal threshold.
    LowSignalQuality,
    /// An available anchor was collected beyond the staleness horizon.
    StaleData,
    /// Field-level confidence of the available anchors is low.
    LowAnchorQuality,
    /// Engines disagree beyond the disagreement threshold.
    AgreementLow,
}

/// Positive factor contributing to an output's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceDriver {
    /// Most declared anchors are available.
    HighCompleteness,
    /// Available anchors carry high field confidence.
    HighAnchorQuality,
    /// Anchors were collected recently.
    RecentData,
    /// Domain signal quality is high.
    HighSignalQuality,
    /// Engines agree closely.
    EngineAgreement,
}

/// Ordered penalty list; most outputs carry at most a handful.
pub type PenaltyList = SmallVec<[ConfidencePenalty; 4]>;

// ============================================================================
// SECTION: Gate Decision
// ============================================================================

/// Result of evaluating one output against the eligibility rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateDecision {
    /// The output may be produced.
    Produced {
        /// Confidence baseline after gate penalties, in [0,1].
        adjusted_confidence: f64,
        /// Penalties applied by the gate, in application order.
        penalties: PenaltyList,
    },
    /// The output must be suppressed.
    Suppressed {
        /// Typed reason set by the step that fired.
        reason: SuppressionReason,
        /// Display-only explanation.
        detail: String,
        /// Anchors whose absence caused the suppression, sorted.
        missing_anchors: Vec<InputRef>,
    },
}

impl GateDecision {
    /// Returns true when the decision allows production.
    #[must_use]
    pub const fn is_produced(&self) -> bool {
        matches!(self, Self::Produced { .. })
    }

    /// Returns the suppression reason, if suppressed.
    #[must_use]
    pub const fn reason(&self) -> Option<SuppressionReason> {
        match self {
            Self::Produced { .. } => None,
            Self::Suppressed {
                reason, ..
            } => Some(*reason),
        }
    }
}

// ============================================================================
// SECTION: Gate Trace
// ============================================================================

/// Gate evaluation step, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStep {
    /// Blocker check.
    Blockers,
    /// `requires_all` check.
    RequiredAnchors,
    /// `requires_any` check.
    AnySignal,
    /// Provisional confidence check.
    ConfidenceFloor,
    /// Post-gate estimator availability check.
    Estimation,
}

/// One entry of the gate decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateTraceEntry {
    /// Step that produced the entry.
    pub step: GateStep,
    /// Whether the step passed.
    pub passed: bool,
    /// Display-only note.
    pub note: String,
}

impl GateTraceEntry {
    /// Creates a trace entry.
    #[must_use]
    pub fn new(step: GateStep, passed: bool, note: impl Into<String>) -> Self {
        Self {
            step,
            passed,
            note: note.into(),
        }
    }
}

/// Gate decision together with the trace that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
    /// Decision.
    pub decision: GateDecision,
    /// Decision log in evaluation order.
    pub trace: Vec<GateTraceEntry>,
}
