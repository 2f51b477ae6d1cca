// crates/panel-gate-core/tests/fusion.rs
// ============================================================================
// Module: Engine Fusion Tests
// Description: Weighted fusion, disagreement, and agreement penalties.
// Purpose: Verify fused values and their effect on produced outputs.
// Dependencies: panel-gate-core
// ============================================================================

//! Engine fusion tests, including end-to-end disagreement penalties.

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

use std::collections::BTreeMap;
use std::sync::Arc;

use panel_gate_core::ConfidencePenalty;
use panel_gate_core::Domain;
use panel_gate_core::EngineEstimate;
use panel_gate_core::GateConfig;
use panel_gate_core::InferenceEngine;
use panel_gate_core::OutputCatalog;
use panel_gate_core::OutputDefinition;
use panel_gate_core::OutputKey;
use panel_gate_core::PrecomputedEstimates;
use panel_gate_core::SpecimenType;
use panel_gate_core::SupportType;
use panel_gate_core::SuppressionReason;
use panel_gate_core::ValueRange;
use panel_gate_core::runtime::FusionError;
use panel_gate_core::runtime::fuse;

use crate::common::evaluated_at;
use crate::common::full_run;
use crate::common::specimen;
use crate::common::uniform_features;

fn scored(key: &str, low: f64, high: f64) -> OutputDefinition {
    OutputDefinition::new(
        key,
        Domain::Metabolic,
        "score",
        SupportType::Derived,
        ValueRange::new(low, high),
    )
    .requires_all(["isf.glucose"])
}

fn two_engine_table(key: &str) -> PrecomputedEstimates {
    let mut table = BTreeMap::new();
    table.insert(
        OutputKey::new(key),
        vec![
            EngineEstimate::new("engine_a", 90.0, 1.0),
            EngineEstimate::new("engine_b", 100.0, 1.0),
        ],
    );
    PrecomputedEstimates::new(table).unwrap()
}

#[test]
fn single_estimate_passes_through_unchanged() {
    let estimate =
        EngineEstimate::new("engine_a", 97.5, 0.8).with_range(ValueRange::new(94.0, 101.0));
    let fused = fuse(&scored("solo", 70.0, 140.0), std::slice::from_ref(&estimate)).unwrap();
    assert!((fused.value - 97.5).abs() < f64::EPSILON);
    assert_eq!(fused.range, ValueRange::new(94.0, 101.0));
    assert!(fused.disagreement.abs() < f64::EPSILON);
}

#[test]
fn single_estimate_without_range_gets_a_point_range() {
    let fused = fuse(&scored("solo", 70.0, 140.0), &[EngineEstimate::new("engine_a", 88.0, 1.0)])
        .unwrap();
    assert_eq!(fused.range, ValueRange::point(88.0));
}

#[test]
fn equal_weight_estimates_fuse_to_the_midpoint() {
    let estimates =
        [EngineEstimate::new("engine_a", 90.0, 1.0), EngineEstimate::new("engine_b", 100.0, 1.0)];
    let fused = fuse(&scored("pair", 70.0, 140.0), &estimates).unwrap();
    assert!((fused.value - 95.0).abs() < 1e-9);
    assert!(fused.disagreement > 0.0);
    assert!((fused.spread - 5.0).abs() < 1e-9);
    assert!((fused.disagreement - 5.0 / 70.0).abs() < 1e-9);
    assert_eq!(fused.range, ValueRange::new(90.0, 100.0));
}

#[test]
fn no_usable_estimate_is_an_error() {
    let result = fuse(&scored("none", 0.0, 1.0), &[EngineEstimate::new("engine_a", 1.0, -1.0)]);
    assert_eq!(result, Err(FusionError::NoEstimates("none".to_string())));
}

#[test]
fn huge_finite_estimates_fuse_without_overflow() {
    let estimates =
        [EngineEstimate::new("engine_a", 1e308, 1.0), EngineEstimate::new("engine_b", 1e308, 1.0)];
    let fused = fuse(&scored("huge", 70.0, 140.0), &estimates).unwrap();
    assert!(fused.value.is_finite());
    assert!(fused.range.is_well_formed());
    assert!(fused.spread.abs() < f64::EPSILON);
}

#[test]
fn overflowing_spread_is_an_error() {
    let estimates =
        [EngineEstimate::new("engine_a", 1e308, 1.0), EngineEstimate::new("engine_b", -1e308, 1.0)];
    let result = fuse(&scored("extreme", 70.0, 140.0), &estimates);
    assert_eq!(result, Err(FusionError::NonFinite("extreme".to_string())));
}

#[test]
fn non_finite_fusion_suppresses_only_its_output() {
    let catalog = Arc::new(
        OutputCatalog::new(vec![scored("extreme", 70.0, 140.0), scored("steady", 70.0, 140.0)])
            .unwrap(),
    );
    let mut table = BTreeMap::new();
    table.insert(
        OutputKey::new("extreme"),
        vec![
            EngineEstimate::new("engine_a", 1e308, 1.0),
            EngineEstimate::new("engine_b", -1e308, 1.0),
        ],
    );
    table.insert(OutputKey::new("steady"), vec![EngineEstimate::new("engine_a", 95.0, 1.0)]);
    let engine = InferenceEngine::new(catalog)
        .with_estimators(PrecomputedEstimates::new(table).unwrap().into_estimators());
    let pack = engine.infer(&full_run(), &uniform_features(0.8, 0.75), evaluated_at()).unwrap();
    let suppressed = pack.suppressed(&OutputKey::new("extreme")).unwrap();
    assert_eq!(suppressed.reason, SuppressionReason::InsufficientSignal);
    assert!(pack.produced_value(&OutputKey::new("steady")).is_some());
    assert!(pack.digest().is_ok());
}

#[test]
fn wide_disagreement_adds_agreement_low_to_the_produced_value() {
    let catalog = Arc::new(OutputCatalog::new(vec![scored("narrow_score", 90.0, 100.0)]).unwrap());
    let engine = InferenceEngine::new(catalog)
        .with_estimators(two_engine_table("narrow_score").into_estimators());
    let pack = engine.infer(&full_run(), &uniform_features(0.8, 0.75), evaluated_at()).unwrap();
    let value = pack.produced_value(&OutputKey::new("narrow_score")).unwrap();
    assert!((value.value - 95.0).abs() < 1e-9);
    assert!((value.disagreement - 0.5).abs() < 1e-9);
    assert!(value.confidence_penalties.contains(&ConfidencePenalty::AgreementLow));
    assert_eq!(value.engine_sources.len(), 2);
}

#[test]
fn arbitrated_confidence_may_fall_below_the_gate_floor() {
    let mut stale = specimen("isf-old", SpecimenType::Isf, 100, &[("glucose", 95.0)]);
    stale.measured_fields.get_mut("glucose").unwrap().missingness.confidence_0_1 = 0.3;
    let mut run = full_run();
    run.specimens = vec![stale];
    let catalog = Arc::new(OutputCatalog::new(vec![scored("narrow_score", 90.0, 100.0)]).unwrap());
    let engine = InferenceEngine::new(catalog)
        .with_estimators(two_engine_table("narrow_score").into_estimators());
    let pack = engine.infer(&run, &uniform_features(1.0, 0.5), evaluated_at()).unwrap();
    let value = pack.produced_value(&OutputKey::new("narrow_score")).unwrap();
    assert_eq!(
        value.confidence_penalties,
        vec![
            ConfidencePenalty::StaleData,
            ConfidencePenalty::LowAnchorQuality,
            ConfidencePenalty::AgreementLow
        ]
    );
    assert!(value.confidence_0_1 < GateConfig::default().confidence_floor);
    assert!((value.confidence_0_1 - 0.2907).abs() < 1e-3);
}

#[test]
fn modest_disagreement_keeps_agreement() {
    let catalog = Arc::new(OutputCatalog::new(vec![scored("wide_score", 70.0, 140.0)]).unwrap());
    let engine = InferenceEngine::new(catalog)
        .with_estimators(two_engine_table("wide_score").into_estimators());
    let pack = engine.infer(&full_run(), &uniform_features(0.8, 0.75), evaluated_at()).unwrap();
    let value = pack.produced_value(&OutputKey::new("wide_score")).unwrap();
    assert!(!value.confidence_penalties.contains(&ConfidencePenalty::AgreementLow));
}

#[test]
fn output_without_estimates_is_insufficient_signal() {
    let catalog = Arc::new(OutputCatalog::new(vec![scored("unestimated", 0.0, 100.0)]).unwrap());
    let engine = InferenceEngine::new(catalog);
    let pack = engine.infer(&full_run(), &uniform_features(0.8, 0.75), evaluated_at()).unwrap();
    let suppressed = pack.suppressed(&OutputKey::new("unestimated")).unwrap();
    assert_eq!(suppressed.reason, SuppressionReason::InsufficientSignal);
    assert!(suppressed.confidence_0_1.abs() < f64::EPSILON);
}
