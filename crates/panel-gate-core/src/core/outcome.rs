// crates/panel-gate-core/src/core/outcome.rs
// ============================================================================
// Module: Panel Gate Outcomes
// Description: Produced values, suppressed outputs, rationale, and the inference pack.
// Purpose: Define the immutable aggregate returned for one run.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The [`InferencePack`] is the aggregate root for one run. Every catalog key
//! appears exactly once across measured values, inferred values, and
//! suppressed outputs. All lists are sorted by output key so two evaluations
//! of the same inputs serialize identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::decision::ConfidenceDriver;
use crate::core::decision::ConfidencePenalty;
use crate::core::decision::GateTraceEntry;
use crate::core::decision::SuppressionReason;
use crate::core::digest::CanonicalJsonError;
use crate::core::digest::PackDigest;
use crate::core::estimate::ValueRange;
use crate::core::identifiers::Domain;
use crate::core::identifiers::EngineId;
use crate::core::identifiers::InputRef;
use crate::core::identifiers::OutputKey;
use crate::core::identifiers::RunId;
use crate::core::identifiers::SpecimenId;
use crate::core::run::SpecimenType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version stamped on every inference pack.
pub const INFERENCE_PACK_SCHEMA_VERSION: &str = "v2";

// ============================================================================
// SECTION: Classification Enums
// ============================================================================

/// How directly an output is supported by measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportType {
    /// Measured directly by an analyte.
    Direct,
    /// Derived from several measured analytes.
    Derived,
    /// Proxy signal for the quantity of interest.
    Proxy,
    /// Derived from cross-specimen relationships.
    Relational,
    /// Anchored mainly on population priors.
    PopulationBased,
}

impl SupportType {
    /// Returns the provenance classification implied by the support type.
    #[must_use]
    pub const fn provenance(self) -> ProvenanceType {
        match self {
            Self::Direct => ProvenanceType::Measured,
            Self::Derived | Self::Proxy | Self::Relational | Self::PopulationBased => {
                ProvenanceType::Inferred
            }
        }
    }
}

/// Whether a produced value was measured or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceType {
    /// Value read from a measurement.
    Measured,
    /// Value inferred by one or more engines.
    Inferred,
}

/// Produced-or-suppressed status for rationale entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The output was produced.
    Produced,
    /// The output was suppressed.
    Suppressed,
}

// ============================================================================
// SECTION: Per-Output Results
// ============================================================================

/// Produced output value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredValue {
    /// Output key.
    pub key: OutputKey,
    /// Fused value.
    pub value: f64,
    /// Fused range.
    pub range: ValueRange,
    /// Reporting unit.
    pub unit: String,
    /// Calibrated confidence in [0,1].
    pub confidence_0_1: f64,
    /// Support classification.
    pub support_type: SupportType,
    /// Provenance classification.
    pub provenance: ProvenanceType,
    /// Specimen types that supplied anchors, sorted.
    pub source_specimen_types: Vec<SpecimenType>,
    /// Top positive confidence factors, strongest first.
    pub confidence_drivers: Vec<ConfidenceDriver>,
    /// Applied penalties in application order.
    pub confidence_penalties: Vec<ConfidencePenalty>,
    /// Engines whose estimates were fused, sorted.
    pub engine_sources: Vec<EngineId>,
    /// Normalised spread across engine estimates.
    pub disagreement: f64,
}

/// Suppressed output with its typed reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressedOutput {
    /// Output key.
    pub key: OutputKey,
    /// Typed suppression reason.
    pub reason: SuppressionReason,
    /// Display-only explanation.
    pub reason_detail: String,
    /// Anchors whose absence caused the suppression.
    pub missing_anchors: Vec<InputRef>,
    /// Reported confidence; always zero.
    pub confidence_0_1: f64,
}

/// Eligibility rationale for one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRationale {
    /// Output key.
    pub output_key: OutputKey,
    /// Final status.
    pub status: OutcomeStatus,
    /// Declared `requires_any` inputs.
    pub requires_any: BTreeSet<InputRef>,
    /// Declared `requires_all` inputs.
    pub requires_all: BTreeSet<InputRef>,
    /// Missing dependencies when suppressed for missing anchors.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing_dependencies: Vec<InputRef>,
    /// Domain coherence used by the gate.
    pub coherence_score: f64,
    /// Domain signal quality used by the gate.
    pub signal_quality: f64,
    /// Gate decision log.
    pub decision_log: Vec<GateTraceEntry>,
}

/// Links a produced output back to the inputs that informed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Output key.
    pub output_key: OutputKey,
    /// Specimens that supplied anchors, sorted.
    pub specimen_ids: Vec<SpecimenId>,
    /// Specimen types that supplied anchors, sorted.
    pub specimen_types: Vec<SpecimenType>,
    /// Measured anchors that were available, sorted.
    pub measured_variables: Vec<InputRef>,
    /// Contextual anchors that were available, sorted.
    pub context_inputs: Vec<InputRef>,
    /// Feature-pack signals consulted.
    pub feature_pack_drivers: Vec<String>,
    /// Engines whose estimates were fused.
    pub engines: Vec<EngineId>,
}

// ============================================================================
// SECTION: Physiological States
// ============================================================================

/// Directional summary of a domain's produced outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// All outputs sit within their typical ranges.
    WithinRange,
    /// At least one output is above range and none below.
    Elevated,
    /// At least one output is below range and none above.
    Reduced,
    /// Outputs sit on both sides of their ranges.
    Mixed,
}

/// Physiological-state summary for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysiologicalState {
    /// Domain summarised.
    pub domain: Domain,
    /// Directional status.
    pub status: DomainStatus,
    /// Display-only summary line.
    pub summary: String,
    /// Produced outputs that informed the summary, sorted.
    pub evidence: Vec<OutputKey>,
    /// Mean confidence of the evidence outputs.
    pub confidence_0_1: f64,
}

// ============================================================================
// SECTION: Inference Pack
// ============================================================================

/// Whether every catalog output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    /// Every output was produced.
    Complete,
    /// At least one output was suppressed.
    Partial,
}

/// Aggregate result for one run.
///
/// # Invariants
/// - Every catalog key appears in exactly one of `measured_values`,
///   `inferred_values`, or `suppressed_outputs`.
/// - Every list is sorted by output key (states by domain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferencePack {
    /// Run identifier.
    pub run_id: RunId,
    /// Pack schema version.
    pub schema_version: String,
    /// Evaluation time supplied by the caller.
    #[serde(with = "time::serde::rfc3339")]
    pub evaluated_at: OffsetDateTime,
    /// Overall status.
    pub status: PackStatus,
    /// Produced outputs measured directly.
    pub measured_values: Vec<InferredValue>,
    /// Produced outputs that were inferred.
    pub inferred_values: Vec<InferredValue>,
    /// Suppressed outputs.
    pub suppressed_outputs: Vec<SuppressedOutput>,
    /// Eligibility rationale for every catalog key.
    pub eligibility_rationale: Vec<DependencyRationale>,
    /// Physiological-state summaries by domain.
    pub physiological_states: Vec<PhysiologicalState>,
    /// Mean confidence of produced outputs, zero when none.
    pub overall_confidence_0_1: f64,
    /// Overall coherence of the feature pack.
    pub overall_coherence_0_1: f64,
    /// Domains with at least one produced output, sorted.
    pub domains_assessed: Vec<Domain>,
    /// Number of specimens in the run.
    pub specimen_count: usize,
    /// Provenance for every produced output.
    pub provenance_map: Vec<ProvenanceEntry>,
}

impl InferencePack {
    /// Iterates every produced value, measured first.
    pub fn produced(&self) -> impl Iterator<Item = &InferredValue> {
        self.measured_values.iter().chain(self.inferred_values.iter())
    }

    /// Returns the produced value for a key, if any.
    #[must_use]
    pub fn produced_value(&self, key: &OutputKey) -> Option<&InferredValue> {
        self.produced().find(|value| &value.key == key)
    }

    /// Returns the suppressed output for a key, if any.
    #[must_use]
    pub fn suppressed(&self, key: &OutputKey) -> Option<&SuppressedOutput> {
        self.suppressed_outputs.iter().find(|output| &output.key == key)
    }

    /// Computes the canonical content digest of the pack.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalJsonError`] when canonical encoding fails.
    pub fn digest(&self) -> Result<PackDigest, CanonicalJsonError> {
        PackDigest::of(self)
    }
}
