// crates/panel-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Panel Gate Eligibility Gate
// Description: Produce-or-suppress decision for one catalog output.
// Purpose: Apply blockers, anchor requirements, and the confidence floor in fixed order.
// Dependencies: crate::core, crate::runtime::availability, smallvec
// ============================================================================

//! ## Overview
//! The gate is a pure function of the output definition, the availability
//! maps, and the domain scores. Steps run in a fixed order and the first
//! failing step decides the outcome:
//!
//! 1. an active declared blocker suppresses with `BLOCKER_CONDITION_MET`;
//! 2. a missing `requires_all` anchor suppresses with `MISSING_REQUIRED_ANCHOR`;
//! 3. an unmet `requires_any` set suppresses with `INSUFFICIENT_SIGNAL`;
//! 4. a provisional confidence below the floor suppresses with
//!    `CONFIDENCE_BELOW_THRESHOLD`.
//!
//! Otherwise the output is produced with its adjusted confidence baseline and
//! the soft penalties that were applied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::catalog::OutputDefinition;
use crate::core::decision::ConfidencePenalty;
use crate::core::decision::GateDecision;
use crate::core::decision::GateEvaluation;
use crate::core::decision::GateStep;
use crate::core::decision::GateTraceEntry;
use crate::core::decision::PenaltyList;
use crate::core::decision::SuppressionReason;
use crate::core::identifiers::BlockerRef;
use crate::core::identifiers::InputRef;
use crate::runtime::availability::AvailabilityMaps;
use crate::runtime::settings::GateConfig;
use crate::runtime::settings::PenaltyAmounts;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Eligibility gate configured with thresholds and penalty amounts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EligibilityGate {
    /// Gate thresholds.
    config: GateConfig,
    /// Penalty deductions applied to the provisional confidence.
    penalties: PenaltyAmounts,
}

impl EligibilityGate {
    /// Creates a gate.
    #[must_use]
    pub const fn new(config: GateConfig, penalties: PenaltyAmounts) -> Self {
        Self {
            config,
            penalties,
        }
    }

    /// Returns the gate thresholds.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluates one output.
    #[must_use]
    pub fn evaluate(
        &self,
        definition: &OutputDefinition,
        availability: &AvailabilityMaps,
        domain_coherence: f64,
        domain_signal_quality: f64,
        base_confidence: f64,
    ) -> GateEvaluation {
        let mut trace = Vec::with_capacity(4);

        let active: Vec<BlockerRef> = definition
            .blockers
            .iter()
            .copied()
            .filter(|blocker| availability.is_blocked(*blocker))
            .collect();
        if !active.is_empty() {
            let detail = format!("blocked by {}", join(active.iter().copied().map(BlockerRef::as_str)));
            return suppress(
                trace,
                GateStep::Blockers,
                SuppressionReason::BlockerConditionMet,
                detail,
                Vec::new(),
            );
        }
        trace.push(GateTraceEntry::new(GateStep::Blockers, true, "no active blockers"));

        let missing: Vec<InputRef> = definition
            .requires_all
            .iter()
            .filter(|input| !availability.is_available(input))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let detail =
                format!("missing required anchors: {}", join(missing.iter().map(InputRef::as_str)));
            return suppress(
                trace,
                GateStep::RequiredAnchors,
                SuppressionReason::MissingRequiredAnchor,
                detail,
                missing,
            );
        }
        trace.push(GateTraceEntry::new(
            GateStep::RequiredAnchors,
            true,
            format!("{} required anchors present", definition.requires_all.len()),
        ));

        if !definition.requires_any.is_empty()
            && !definition.requires_any.iter().any(|input| availability.is_available(input))
        {
            let candidates: Vec<InputRef> = definition.requires_any.iter().cloned().collect();
            let detail = format!(
                "none of the supporting inputs are available: {}",
                join(candidates.iter().map(InputRef::as_str))
            );
            return suppress(
                trace,
                GateStep::AnySignal,
                SuppressionReason::InsufficientSignal,
                detail,
                candidates,
            );
        }
        trace.push(GateTraceEntry::new(GateStep::AnySignal, true, "supporting signal present"));

        let (provisional, penalties) = self.provisional_confidence(
            definition,
            availability,
            domain_coherence,
            domain_signal_quality,
            base_confidence,
        );
        if provisional < self.config.confidence_floor {
            let detail = format!(
                "provisional confidence {provisional:.3} below floor {:.3}",
                self.config.confidence_floor
            );
            return suppress(
                trace,
                GateStep::ConfidenceFloor,
                SuppressionReason::ConfidenceBelowThreshold,
                detail,
                Vec::new(),
            );
        }
        trace.push(GateTraceEntry::new(
            GateStep::ConfidenceFloor,
            true,
            format!("provisional confidence {provisional:.3}"),
        ));

        GateEvaluation {
            decision: GateDecision::Produced {
                adjusted_confidence: provisional,
                penalties,
            },
            trace,
        }
    }

    /// Scales the base confidence by domain scores and applies soft penalties.
    fn provisional_confidence(
        &self,
        definition: &OutputDefinition,
        availability: &AvailabilityMaps,
        coherence: f64,
        signal: f64,
        base: f64,
    ) -> (f64, PenaltyList) {
        let anchors = availability.summarize_anchors(definition);
        let mut penalties = PenaltyList::new();
        if coherence < self.config.low_coherence_threshold {
            penalties.push(ConfidencePenalty::LowCoherence);
        }
        if signal < self.config.low_signal_threshold {
            penalties.push(ConfidencePenalty::LowSignalQuality);
        }
        if anchors.oldest_age_hours.is_some_and(|age| age > self.config.stale_after_hours) {
            penalties.push(ConfidencePenalty::StaleData);
        }
        if anchors
            .anchor_quality
            .is_some_and(|quality| quality < self.config.low_anchor_quality_threshold)
        {
            penalties.push(ConfidencePenalty::LowAnchorQuality);
        }
        let scaled = base * 0.5f64.mul_add(coherence, 0.5) * 0.5f64.mul_add(signal, 0.5);
        let deducted: f64 = penalties.iter().map(|penalty| self.penalties.amount(*penalty)).sum();
        ((scaled - deducted).clamp(0.0, 1.0), penalties)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a suppressed evaluation, closing the trace with the failing step.
fn suppress(
    mut trace: Vec<GateTraceEntry>,
    step: GateStep,
    reason: SuppressionReason,
    detail: String,
    missing_anchors: Vec<InputRef>,
) -> GateEvaluation {
    trace.push(GateTraceEntry::new(step, false, detail.clone()));
    GateEvaluation {
        decision: GateDecision::Suppressed {
            reason,
            detail,
            missing_anchors,
        },
        trace,
    }
}

/// Joins labels with commas, deduplicated and sorted.
fn join<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels.collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>().join(", ")
}
