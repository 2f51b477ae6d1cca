// crates/panel-gate-core/src/runtime/availability.rs
// ============================================================================
// Module: Panel Gate Availability Resolver
// Description: Derives input availability and active blockers from a run.
// Purpose: Give the gate, arbitrator, and estimators one view of what was observed.
// Dependencies: crate::core, time
// ============================================================================

//! ## Overview
//! [`resolve_availability`] flattens a run into per-input presence flags,
//! contextual flags, blocker flags, and per-input observations. Resolution
//! never fails; a field that is flagged missing or has no value is simply
//! recorded as unavailable.
//!
//! Invariants:
//! - Every blocker has an entry, defaulting to `false`.
//! - Every contextual reference has an entry; blank strings count as absent.
//! - An input observed in several specimens is available when any one is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;
use time::OffsetDateTime;

use crate::core::catalog::OutputDefinition;
use crate::core::features::FeaturePack;
use crate::core::identifiers::BlockerRef;
use crate::core::identifiers::InputRef;
use crate::core::identifiers::SpecimenId;
use crate::core::run::NonLabInputs;
use crate::core::run::QualitativeInputs;
use crate::core::run::Run;
use crate::core::run::SpecimenType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Contextual input references resolved from non-lab inputs.
pub const CONTEXT_REFS: [&str; 10] = [
    "age",
    "sex_at_birth",
    "weight_kg",
    "height_cm",
    "activity_level",
    "heart_rate",
    "sleep_duration_known",
    "meal_timing",
    "stress_level",
    "pregnancy_status",
];

/// Medication tokens that activate the diuretic blocker.
const DIURETIC_TOKENS: [&str; 14] = [
    "diuretic",
    "diuretics",
    "furosemide",
    "lasix",
    "bumetanide",
    "torsemide",
    "hydrochlorothiazide",
    "hctz",
    "chlorthalidone",
    "indapamide",
    "metolazone",
    "spironolactone",
    "eplerenone",
    "amiloride",
];

/// Seconds per hour, for observation ages.
const SECONDS_PER_HOUR: f64 = 3600.0;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One usable measurement of an input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Specimen that carried the measurement.
    pub specimen_id: SpecimenId,
    /// Type of that specimen.
    pub specimen_type: SpecimenType,
    /// Measured value.
    pub value: f64,
    /// Field-level confidence in [0,1].
    pub confidence: f64,
    /// Hours between collection and evaluation, never negative.
    pub age_hours: f64,
}

/// Availability view of one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AvailabilityMaps {
    /// Measured inputs keyed `<specimen_prefix>.<field>`.
    pub available_values: BTreeMap<InputRef, bool>,
    /// Contextual inputs keyed by context reference.
    pub available_contexts: BTreeMap<InputRef, bool>,
    /// Blocker activation flags.
    pub blockers: BTreeMap<BlockerRef, bool>,
    /// Usable observations per measured input, ordered freshest first.
    pub observations: BTreeMap<InputRef, Vec<Observation>>,
}

/// Anchor-level facts for one output, shared by gating and arbitration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnchorSummary {
    /// Available measured anchors, sorted.
    pub measured: Vec<InputRef>,
    /// Available contextual anchors, sorted.
    pub contexts: Vec<InputRef>,
    /// Fraction of declared anchors that are available; 1 when none declared.
    pub completeness: f64,
    /// Mean field confidence of the observation chosen per measured anchor.
    ///
    /// The chosen observation is the freshest with positive confidence, or the
    /// freshest overall when every observation has zero confidence.
    pub anchor_quality: Option<f64>,
    /// Age of the oldest chosen observation across measured anchors.
    pub oldest_age_hours: Option<f64>,
    /// Specimens that supplied the chosen observations.
    pub specimen_ids: BTreeSet<SpecimenId>,
    /// Types of those specimens.
    pub specimen_types: BTreeSet<SpecimenType>,
}

impl AvailabilityMaps {
    /// Returns true when a measured or contextual input is available.
    #[must_use]
    pub fn is_available(&self, input: &InputRef) -> bool {
        self.available_values.get(input).copied().unwrap_or(false)
            || self.available_contexts.get(input).copied().unwrap_or(false)
    }

    /// Returns true when the input is a contextual reference.
    #[must_use]
    pub fn is_context(&self, input: &InputRef) -> bool {
        self.available_contexts.contains_key(input)
    }

    /// Returns true when a blocker is active.
    #[must_use]
    pub fn is_blocked(&self, blocker: BlockerRef) -> bool {
        self.blockers.get(&blocker).copied().unwrap_or(false)
    }

    /// Returns the usable observations of an input, freshest first.
    #[must_use]
    pub fn observations(&self, input: &InputRef) -> &[Observation] {
        self.observations.get(input).map_or(&[], Vec::as_slice)
    }

    /// Returns the freshest usable observation of an input.
    #[must_use]
    pub fn freshest(&self, input: &InputRef) -> Option<&Observation> {
        self.observations(input).first()
    }

    /// Returns the freshest observation of an input with positive confidence.
    #[must_use]
    pub fn freshest_reliable(&self, input: &InputRef) -> Option<&Observation> {
        self.observations(input).iter().find(|observation| observation.confidence > 0.0)
    }

    /// Summarises the available anchors of an output.
    #[must_use]
    pub fn summarize_anchors(&self, definition: &OutputDefinition) -> AnchorSummary {
        let mut summary = AnchorSummary::default();
        let mut declared = 0_u32;
        let mut available = 0_u32;
        let mut confidence_sum = 0.0;
        let mut confidence_count = 0_u32;
        for anchor in definition.anchors() {
            declared += 1;
            if !self.is_available(anchor) {
                continue;
            }
            available += 1;
            if self.is_context(anchor) {
                summary.contexts.push(anchor.clone());
                continue;
            }
            summary.measured.push(anchor.clone());
            if let Some(observation) =
                self.freshest_reliable(anchor).or_else(|| self.freshest(anchor))
            {
                confidence_sum += observation.confidence;
                confidence_count += 1;
                summary.oldest_age_hours = Some(
                    summary
                        .oldest_age_hours
                        .map_or(observation.age_hours, |age| age.max(observation.age_hours)),
                );
                summary.specimen_ids.insert(observation.specimen_id.clone());
                summary.specimen_types.insert(observation.specimen_type);
            }
        }
        summary.measured.sort();
        summary.contexts.sort();
        summary.completeness =
            if declared == 0 { 1.0 } else { f64::from(available) / f64::from(declared) };
        if confidence_count > 0 {
            summary.anchor_quality = Some(confidence_sum / f64::from(confidence_count));
        }
        summary
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Derives availability maps for a run.
///
/// The feature pack does not influence availability; it is accepted so that
/// callers resolve every per-run view from the same inputs.
#[must_use]
pub fn resolve_availability(
    run: &Run,
    _feature_pack: &FeaturePack,
    evaluated_at: OffsetDateTime,
) -> AvailabilityMaps {
    let mut maps = AvailabilityMaps::default();
    for specimen in &run.specimens {
        let age_seconds = (evaluated_at - specimen.collected_at).as_seconds_f64();
        let age_hours = (age_seconds / SECONDS_PER_HOUR).max(0.0);
        for (name, field) in &specimen.measured_fields {
            let input = InputRef::new(format!("{}.{name}", specimen.specimen_type.prefix()));
            let value = field.usable_value();
            let entry = maps.available_values.entry(input.clone()).or_insert(false);
            *entry |= value.is_some();
            if let Some(value) = value {
                maps.observations.entry(input).or_default().push(Observation {
                    specimen_id: specimen.specimen_id.clone(),
                    specimen_type: specimen.specimen_type,
                    value,
                    confidence: field.missingness.confidence_0_1,
                    age_hours,
                });
            }
        }
    }
    for observations in maps.observations.values_mut() {
        observations.sort_by(|left, right| {
            left.age_hours
                .total_cmp(&right.age_hours)
                .then_with(|| right.confidence.total_cmp(&left.confidence))
                .then_with(|| left.specimen_id.cmp(&right.specimen_id))
        });
    }
    resolve_contexts(&run.non_lab_inputs, &mut maps.available_contexts);
    resolve_blockers(&run.non_lab_inputs, &run.qualitative_inputs, &mut maps.blockers);
    maps
}

/// Records contextual presence flags.
fn resolve_contexts(inputs: &NonLabInputs, contexts: &mut BTreeMap<InputRef, bool>) {
    let flags = [
        inputs.age.is_some(),
        inputs.sex_at_birth.is_some(),
        inputs.weight_kg.is_some(),
        inputs.height_cm.is_some(),
        has_text(inputs.activity_level.as_deref()),
        inputs.heart_rate_bpm.is_some(),
        inputs.sleep_duration_hr.is_some(),
        has_text(inputs.meal_timing.as_deref()),
        has_text(inputs.stress_level.as_deref()),
        inputs.pregnancy.is_some(),
    ];
    for (name, present) in CONTEXT_REFS.into_iter().zip(flags) {
        contexts.insert(InputRef::from(name), present);
    }
}

/// Records blocker flags, defaulting every blocker to inactive.
fn resolve_blockers(
    inputs: &NonLabInputs,
    qualitative: &QualitativeInputs,
    blockers: &mut BTreeMap<BlockerRef, bool>,
) {
    for blocker in BlockerRef::ALL {
        let active = match blocker {
            BlockerRef::PregnancyConfirmedOrSuspected => {
                inputs.pregnancy.is_some_and(|status| status.is_confirmed_or_suspected())
            }
            BlockerRef::AcuteIllness => inputs.acute_illness == Some(true),
            BlockerRef::DiureticUse => {
                qualitative.medication_list.as_deref().is_some_and(mentions_diuretic)
            }
        };
        blockers.insert(blocker, active);
    }
}

/// Returns true when the text is present and not blank.
fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

/// Returns true when a medication list names a diuretic.
fn mentions_diuretic(medications: &str) -> bool {
    medications
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            let token = token.to_ascii_lowercase();
            DIURETIC_TOKENS.contains(&token.as_str())
        })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diuretic_matching_is_token_based() {
        assert!(mentions_diuretic("Lisinopril, Furosemide 20mg"));
        assert!(mentions_diuretic("hctz"));
        assert!(!mentions_diuretic("metformin; non-diureticish supplement"));
        assert!(!mentions_diuretic(""));
    }
}
