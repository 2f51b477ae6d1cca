// crates/panel-gate-core/tests/gate.rs
// ============================================================================
// Module: Eligibility Gate Tests
// Description: Produce-or-suppress decisions, step precedence, and penalties.
// Purpose: Pin the gate's ordering and typed reasons to concrete scenarios.
// Dependencies: panel-gate-core
// ============================================================================

//! Eligibility gate behavior tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use panel_gate_core::AvailabilityMaps;
use panel_gate_core::BlockerRef;
use panel_gate_core::ConfidencePenalty;
use panel_gate_core::Domain;
use panel_gate_core::EligibilityGate;
use panel_gate_core::GateDecision;
use panel_gate_core::GateStep;
use panel_gate_core::InputRef;
use panel_gate_core::OutputDefinition;
use panel_gate_core::Run;
use panel_gate_core::RunId;
use panel_gate_core::SpecimenType;
use panel_gate_core::SupportType;
use panel_gate_core::SuppressionReason;
use panel_gate_core::ValueRange;
use panel_gate_core::resolve_availability;
use panel_gate_core::run::PregnancyStatus;

use crate::common::evaluated_at;
use crate::common::full_context;
use crate::common::specimen;
use crate::common::uniform_features;

fn glucose() -> OutputDefinition {
    OutputDefinition::new(
        "glucose_est",
        Domain::Metabolic,
        "mg/dL",
        SupportType::Direct,
        ValueRange::new(70.0, 140.0),
    )
    .requires_all(["isf.glucose"])
    .direct_source("isf.glucose")
}

fn availability(values: &[(&str, bool)], blockers: &[BlockerRef]) -> AvailabilityMaps {
    let mut maps = AvailabilityMaps::default();
    for (input, present) in values {
        maps.available_values.insert(InputRef::from(*input), *present);
    }
    for blocker in BlockerRef::ALL {
        maps.blockers.insert(blocker, blockers.contains(&blocker));
    }
    maps
}

fn gate() -> EligibilityGate {
    EligibilityGate::default()
}

#[test]
fn present_anchor_with_good_scores_is_produced() {
    let maps = availability(&[("isf.glucose", true)], &[]);
    let evaluation = gate().evaluate(&glucose(), &maps, 0.8, 0.75, 0.75);
    let GateDecision::Produced {
        adjusted_confidence,
        penalties,
    } = evaluation.decision
    else {
        panic!("expected produced");
    };
    assert!(adjusted_confidence > 0.35);
    assert!((adjusted_confidence - 0.590_625).abs() < 1e-9);
    assert!(penalties.is_empty());
    let steps: Vec<GateStep> = evaluation.trace.iter().map(|entry| entry.step).collect();
    assert_eq!(
        steps,
        vec![
            GateStep::Blockers,
            GateStep::RequiredAnchors,
            GateStep::AnySignal,
            GateStep::ConfidenceFloor
        ]
    );
    assert!(evaluation.trace.iter().all(|entry| entry.passed));
}

#[test]
fn absent_anchor_is_suppressed_with_exact_missing_list() {
    let maps = availability(&[("isf.glucose", false)], &[]);
    let evaluation = gate().evaluate(&glucose(), &maps, 0.8, 0.75, 0.75);
    assert_eq!(
        evaluation.decision,
        GateDecision::Suppressed {
            reason: SuppressionReason::MissingRequiredAnchor,
            detail: "missing required anchors: isf.glucose".to_string(),
            missing_anchors: vec![InputRef::from("isf.glucose")],
        }
    );
}

#[test]
fn active_blocker_suppresses_even_with_anchors_present() {
    let definition = glucose().blocked_by([BlockerRef::PregnancyConfirmedOrSuspected]);
    let maps =
        availability(&[("isf.glucose", true)], &[BlockerRef::PregnancyConfirmedOrSuspected]);
    let evaluation = gate().evaluate(&definition, &maps, 0.8, 0.75, 0.75);
    assert_eq!(evaluation.decision.reason(), Some(SuppressionReason::BlockerConditionMet));
    assert_eq!(evaluation.trace.len(), 1);
    assert!(!evaluation.trace[0].passed);
}

#[test]
fn blocker_takes_precedence_over_missing_anchors() {
    let definition = glucose().blocked_by([BlockerRef::AcuteIllness]);
    let maps = availability(&[], &[BlockerRef::AcuteIllness]);
    let evaluation = gate().evaluate(&definition, &maps, 0.8, 0.75, 0.75);
    assert_eq!(evaluation.decision.reason(), Some(SuppressionReason::BlockerConditionMet));
}

#[test]
fn undeclared_blocker_is_ignored() {
    let maps = availability(&[("isf.glucose", true)], &[BlockerRef::AcuteIllness]);
    let evaluation = gate().evaluate(&glucose(), &maps, 0.8, 0.75, 0.75);
    assert!(evaluation.decision.is_produced());
}

#[test]
fn missing_anchors_are_the_exact_sorted_difference() {
    let definition = OutputDefinition::new(
        "composite",
        Domain::RenalHydration,
        "score",
        SupportType::Derived,
        ValueRange::new(0.0, 100.0),
    )
    .requires_all(["isf.sodium_na", "blood.creatinine", "isf.potassium_k"]);
    let maps = availability(&[("isf.potassium_k", true), ("blood.creatinine", false)], &[]);
    let evaluation = gate().evaluate(&definition, &maps, 0.8, 0.75, 0.75);
    let GateDecision::Suppressed {
        reason,
        missing_anchors,
        ..
    } = evaluation.decision
    else {
        panic!("expected suppressed");
    };
    assert_eq!(reason, SuppressionReason::MissingRequiredAnchor);
    assert_eq!(
        missing_anchors,
        vec![InputRef::from("blood.creatinine"), InputRef::from("isf.sodium_na")]
    );
}

#[test]
fn unmet_any_set_is_insufficient_signal() {
    let definition = OutputDefinition::new(
        "inflammatory_tone",
        Domain::InflammatoryImmune,
        "score",
        SupportType::Proxy,
        ValueRange::new(0.0, 100.0),
    )
    .requires_any(["blood.wbc", "blood.crp"]);
    let maps = availability(&[("blood.wbc", false)], &[]);
    let evaluation = gate().evaluate(&definition, &maps, 0.8, 0.75, 0.75);
    assert_eq!(evaluation.decision.reason(), Some(SuppressionReason::InsufficientSignal));
    assert_eq!(evaluation.trace.last().map(|entry| entry.step), Some(GateStep::AnySignal));
}

#[test]
fn poor_scores_fall_below_the_floor() {
    let maps = availability(&[("isf.glucose", true)], &[]);
    let evaluation = gate().evaluate(&glucose(), &maps, 0.1, 0.1, 0.75);
    assert_eq!(evaluation.decision.reason(), Some(SuppressionReason::ConfidenceBelowThreshold));
}

#[test]
fn low_coherence_is_penalised_but_produced() {
    let maps = availability(&[("isf.glucose", true)], &[]);
    let evaluation = gate().evaluate(&glucose(), &maps, 0.45, 0.9, 0.75);
    let GateDecision::Produced {
        adjusted_confidence,
        penalties,
    } = evaluation.decision
    else {
        panic!("expected produced");
    };
    assert_eq!(penalties.as_slice(), &[ConfidencePenalty::LowCoherence]);
    let expected = 0.75 * 0.725 * 0.95 - 0.10;
    assert!((adjusted_confidence - expected).abs() < 1e-9);
}

#[test]
fn stale_anchor_adds_stale_data_penalty() {
    let run = Run {
        run_id: RunId::new("stale"),
        specimens: vec![specimen("isf-old", SpecimenType::Isf, 100, &[("glucose", 101.0)])],
        non_lab_inputs: full_context(),
        qualitative_inputs: panel_gate_core::QualitativeInputs::default(),
    };
    let features = uniform_features(0.9, 0.9);
    let maps = resolve_availability(&run, &features, evaluated_at());
    let evaluation = gate().evaluate(&glucose(), &maps, 0.9, 0.9, 0.75);
    let GateDecision::Produced {
        penalties, ..
    } = evaluation.decision
    else {
        panic!("expected produced");
    };
    assert_eq!(penalties.as_slice(), &[ConfidencePenalty::StaleData]);
}

#[test]
fn pregnancy_context_blocks_through_resolution() {
    let mut context = full_context();
    context.pregnancy = Some(PregnancyStatus::Suspected);
    let run = Run {
        run_id: RunId::new("pregnant"),
        specimens: vec![specimen("isf-1", SpecimenType::Isf, 1, &[("glucose", 101.0)])],
        non_lab_inputs: context,
        qualitative_inputs: panel_gate_core::QualitativeInputs::default(),
    };
    let features = uniform_features(0.8, 0.75);
    let maps = resolve_availability(&run, &features, evaluated_at());
    let definition = glucose().blocked_by([BlockerRef::PregnancyConfirmedOrSuspected]);
    let evaluation = gate().evaluate(&definition, &maps, 0.8, 0.75, 0.75);
    assert_eq!(evaluation.decision.reason(), Some(SuppressionReason::BlockerConditionMet));
}

#[test]
fn identical_inputs_serialize_identically() {
    let maps = availability(&[("isf.glucose", true)], &[]);
    let first = serde_json::to_vec(&gate().evaluate(&glucose(), &maps, 0.6, 0.55, 0.75)).unwrap();
    let second = serde_json::to_vec(&gate().evaluate(&glucose(), &maps, 0.6, 0.55, 0.75)).unwrap();
    assert_eq!(first, second);
}
