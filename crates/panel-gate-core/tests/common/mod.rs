// crates/panel-gate-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared run, feature-pack, and sink fixtures.
// Purpose: Reduce duplication across integration tests for panel-gate-core.
// =============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites."
)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use panel_gate_core::Domain;
use panel_gate_core::FeaturePack;
use panel_gate_core::InferenceAuditEvent;
use panel_gate_core::MeasuredField;
use panel_gate_core::Missingness;
use panel_gate_core::NonLabInputs;
use panel_gate_core::QualitativeInputs;
use panel_gate_core::Run;
use panel_gate_core::RunId;
use panel_gate_core::Specimen;
use panel_gate_core::SpecimenId;
use panel_gate_core::SpecimenType;
use panel_gate_core::audit::AuditSink;
use panel_gate_core::run::PregnancyStatus;
use panel_gate_core::run::SexAtBirth;
use time::Duration;
use time::OffsetDateTime;

/// All domains, in declaration order.
pub const DOMAINS: [Domain; 5] = [
    Domain::Metabolic,
    Domain::Hematologic,
    Domain::InflammatoryImmune,
    Domain::RenalHydration,
    Domain::EndocrineStress,
];

/// Evaluation time shared by every fixture (2026-01-01T00:00:00Z).
pub fn evaluated_at() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_767_225_600).expect("valid timestamp")
}

/// Returns a measured field with full confidence.
pub fn field(value: f64) -> MeasuredField {
    MeasuredField {
        value: Some(value),
        unit: None,
        missingness: Missingness::default(),
    }
}

/// Returns a field flagged missing.
pub fn missing_field() -> MeasuredField {
    MeasuredField {
        value: None,
        unit: None,
        missingness: Missingness {
            is_missing: true,
            ..Missingness::default()
        },
    }
}

/// Builds a specimen collected `hours_before` the evaluation time.
pub fn specimen(
    id: &str,
    specimen_type: SpecimenType,
    hours_before: i64,
    fields: &[(&str, f64)],
) -> Specimen {
    Specimen {
        specimen_id: SpecimenId::new(id),
        specimen_type,
        collected_at: evaluated_at() - Duration::hours(hours_before),
        measured_fields: fields
            .iter()
            .map(|(name, value)| ((*name).to_string(), field(*value)))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Contextual inputs that satisfy every built-in catalog entry.
pub fn full_context() -> NonLabInputs {
    NonLabInputs {
        age: Some(40),
        sex_at_birth: Some(SexAtBirth::Female),
        weight_kg: Some(68.0),
        height_cm: Some(170.0),
        activity_level: Some("moderate".to_string()),
        heart_rate_bpm: Some(62.0),
        sleep_duration_hr: Some(7.5),
        meal_timing: Some("fasting".to_string()),
        stress_level: Some("low".to_string()),
        pregnancy: Some(PregnancyStatus::NotPregnant),
        acute_illness: Some(false),
    }
}

/// A run carrying every anchor the built-in catalog declares.
pub fn full_run() -> Run {
    Run {
        run_id: RunId::new("run-full"),
        specimens: vec![
            specimen(
                "isf-1",
                SpecimenType::Isf,
                2,
                &[
                    ("glucose", 95.0),
                    ("lactate", 1.1),
                    ("sodium_na", 140.0),
                    ("potassium_k", 4.2),
                    ("chloride_cl", 102.0),
                ],
            ),
            specimen(
                "chem-1",
                SpecimenType::BloodChemistry,
                3,
                &[("creatinine", 0.9), ("crp", 1.0)],
            ),
            specimen(
                "hema-1",
                SpecimenType::BloodHematology,
                3,
                &[("wbc", 6.5), ("hemoglobin", 14.2), ("platelets", 250.0)],
            ),
            specimen("saliva-1", SpecimenType::Saliva, 1, &[("cortisol", 12.0)]),
        ],
        non_lab_inputs: full_context(),
        qualitative_inputs: QualitativeInputs::default(),
    }
}

/// Feature pack with the same scores for every domain.
pub fn uniform_features(coherence: f64, signal: f64) -> FeaturePack {
    FeaturePack {
        domain_coherence: DOMAINS.iter().map(|domain| (*domain, coherence)).collect(),
        domain_signal_quality: DOMAINS.iter().map(|domain| (*domain, signal)).collect(),
        overall_coherence: None,
    }
}

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct CollectingAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<InferenceAuditEvent>>,
}

impl CollectingAuditSink {
    /// Returns the `event` labels recorded so far.
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| {
                serde_json::to_value(event).unwrap()["event"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

impl AuditSink for CollectingAuditSink {
    fn record(&self, event: &InferenceAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
