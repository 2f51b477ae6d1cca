// crates/panel-gate-core/src/core/run.rs
// ============================================================================
// Module: Panel Gate Run Model
// Description: Specimens, measured fields, missingness, and contextual inputs.
// Purpose: Define the immutable run record consumed by the inference core.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A [`Run`] is produced upstream and only borrowed here. Every measured field
//! is an explicit `Option` with its own missingness record, so availability is
//! a direct presence check on typed fields.
//! Structural problems are rejected by [`Run::validate`] before any gating.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::identifiers::RunId;
use crate::core::identifiers::SpecimenId;

// ============================================================================
// SECTION: Run
// ============================================================================

/// Multi-specimen run submitted for inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier.
    pub run_id: RunId,
    /// Specimens in submission order.
    pub specimens: Vec<Specimen>,
    /// Demographic and contextual inputs.
    #[serde(default)]
    pub non_lab_inputs: NonLabInputs,
    /// Free-text qualitative inputs.
    #[serde(default)]
    pub qualitative_inputs: QualitativeInputs,
}

impl Run {
    /// Validates the structural shape of the run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the run has no specimens, repeats a specimen
    /// identifier, or carries non-finite values or out-of-range confidences.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.specimens.is_empty() {
            return Err(RunError::NoSpecimens);
        }
        let mut seen = BTreeSet::new();
        for specimen in &self.specimens {
            if specimen.specimen_id.as_str().trim().is_empty() {
                return Err(RunError::EmptySpecimenId);
            }
            if !seen.insert(&specimen.specimen_id) {
                return Err(RunError::DuplicateSpecimenId(specimen.specimen_id.to_string()));
            }
            specimen.validate()?;
        }
        self.non_lab_inputs.validate()
    }

    /// Returns the specimen with the given identifier.
    #[must_use]
    pub fn specimen(&self, specimen_id: &SpecimenId) -> Option<&Specimen> {
        self.specimens.iter().find(|specimen| &specimen.specimen_id == specimen_id)
    }
}

// ============================================================================
// SECTION: Specimens
// ============================================================================

/// Specimen type variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecimenType {
    /// Interstitial fluid.
    Isf,
    /// Blood chemistry panel.
    BloodChemistry,
    /// Blood hematology panel.
    BloodHematology,
    /// Saliva.
    Saliva,
    /// Sweat.
    Sweat,
    /// Urine.
    Urine,
}

impl SpecimenType {
    /// Returns the input-reference prefix shared by fields of this specimen type.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Isf => "isf",
            Self::BloodChemistry | Self::BloodHematology => "blood",
            Self::Saliva => "saliva",
            Self::Sweat => "sweat",
            Self::Urine => "urine",
        }
    }
}

/// Collected specimen with its measured analyte fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specimen {
    /// Specimen identifier.
    pub specimen_id: SpecimenId,
    /// Specimen type.
    pub specimen_type: SpecimenType,
    /// Collection time.
    #[serde(with = "time::serde::rfc3339")]
    pub collected_at: OffsetDateTime,
    /// Measured fields keyed by analyte name.
    #[serde(default)]
    pub measured_fields: BTreeMap<String, MeasuredField>,
}

impl Specimen {
    /// Validates field names, values, and confidences.
    fn validate(&self) -> Result<(), RunError> {
        for (name, field) in &self.measured_fields {
            if name.trim().is_empty() {
                return Err(RunError::EmptyFieldName(self.specimen_id.to_string()));
            }
            if field.value.is_some_and(|value| !value.is_finite()) {
                return Err(RunError::NonFiniteValue {
                    specimen_id: self.specimen_id.to_string(),
                    field: name.clone(),
                });
            }
            let confidence = field.missingness.confidence_0_1;
            if !(0.0 ..= 1.0).contains(&confidence) {
                return Err(RunError::FieldConfidenceOutOfRange {
                    specimen_id: self.specimen_id.to_string(),
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Measured analyte value with missingness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredField {
    /// Measured value, `None` when not reported.
    pub value: Option<f64>,
    /// Reporting unit when known.
    #[serde(default)]
    pub unit: Option<String>,
    /// Missingness record for the field.
    #[serde(default)]
    pub missingness: Missingness,
}

impl MeasuredField {
    /// Returns the value when it is present and not flagged missing.
    #[must_use]
    pub fn usable_value(&self) -> Option<f64> {
        if self.missingness.is_missing { None } else { self.value }
    }
}

// ============================================================================
// SECTION: Missingness
// ============================================================================

/// Per-field missingness record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Missingness {
    /// True when the field is flagged missing.
    pub is_missing: bool,
    /// Why the field is missing, when it is.
    pub missing_type: Option<MissingType>,
    /// Impact classification of the missingness.
    pub missing_impact: MissingImpact,
    /// Provenance of the value.
    pub provenance: FieldProvenance,
    /// Field-level confidence in [0,1].
    pub confidence_0_1: f64,
}

impl Default for Missingness {
    fn default() -> Self {
        Self {
            is_missing: false,
            missing_type: None,
            missing_impact: MissingImpact::Neutral,
            provenance: FieldProvenance::Measured,
            confidence_0_1: 1.0,
        }
    }
}

/// Reason a field is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingType {
    /// The specimen was not collected for this analyte.
    NotCollected,
    /// Below the assay's detection limit.
    BelowDetection,
    /// Above the assay's detection limit.
    AboveDetection,
    /// The assay or sensor failed.
    AssayFailure,
    /// Withheld by the submitter.
    Withheld,
}

/// Impact of a missing field on downstream inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImpact {
    /// No downstream effect.
    #[default]
    #[serde(alias = "none")]
    Neutral,
    /// The absence itself carries information.
    Informative,
    /// The absence blocks dependent outputs.
    Blocking,
}

/// Provenance of a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProvenance {
    /// Generic measured value.
    #[default]
    Measured,
    /// Continuous sensor reading.
    Sensor,
    /// Laboratory assay.
    Assay,
    /// Reported by the subject.
    SelfReported,
    /// Imputed upstream.
    Imputed,
}

// ============================================================================
// SECTION: Contextual Inputs
// ============================================================================

/// Sex assigned at birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexAtBirth {
    /// Female.
    Female,
    /// Male.
    Male,
    /// Intersex.
    Intersex,
}

/// Reported pregnancy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyStatus {
    /// Pregnancy is confirmed.
    Confirmed,
    /// Pregnancy is suspected.
    Suspected,
    /// Not pregnant.
    NotPregnant,
}

impl PregnancyStatus {
    /// Returns true when pregnancy is confirmed or suspected.
    #[must_use]
    pub const fn is_confirmed_or_suspected(self) -> bool {
        matches!(self, Self::Confirmed | Self::Suspected)
    }
}

/// Demographic and contextual inputs; every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NonLabInputs {
    /// Age in years.
    pub age: Option<u16>,
    /// Sex assigned at birth.
    pub sex_at_birth: Option<SexAtBirth>,
    /// Body weight in kilograms.
    pub weight_kg: Option<f64>,
    /// Height in centimetres.
    pub height_cm: Option<f64>,
    /// Activity level label.
    pub activity_level: Option<String>,
    /// Resting heart rate in beats per minute.
    pub heart_rate_bpm: Option<f64>,
    /// Sleep duration in hours.
    pub sleep_duration_hr: Option<f64>,
    /// Meal timing label (for example `fasting`).
    pub meal_timing: Option<String>,
    /// Stress level label.
    pub stress_level: Option<String>,
    /// Pregnancy status.
    pub pregnancy: Option<PregnancyStatus>,
    /// Acute illness flag.
    pub acute_illness: Option<bool>,
}

impl NonLabInputs {
    /// Rejects non-finite numeric context values.
    fn validate(&self) -> Result<(), RunError> {
        let numeric = [
            ("weight_kg", self.weight_kg),
            ("height_cm", self.height_cm),
            ("heart_rate_bpm", self.heart_rate_bpm),
            ("sleep_duration_hr", self.sleep_duration_hr),
        ];
        for (name, value) in numeric {
            if value.is_some_and(|value| !value.is_finite() || value < 0.0) {
                return Err(RunError::InvalidContext(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Free-text qualitative inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeInputs {
    /// Self-reported symptoms.
    pub self_reported_symptoms: Option<String>,
    /// Medication list.
    pub medication_list: Option<String>,
    /// Recent illness description.
    pub recent_illness: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural run validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The run carries no specimens.
    #[error("run must contain at least one specimen")]
    NoSpecimens,
    /// A specimen identifier is blank.
    #[error("specimen identifier must not be empty")]
    EmptySpecimenId,
    /// A specimen identifier appears more than once.
    #[error("duplicate specimen identifier: {0}")]
    DuplicateSpecimenId(String),
    /// A measured field name is blank.
    #[error("specimen {0} has a field with an empty name")]
    EmptyFieldName(String),
    /// A measured value is NaN or infinite.
    #[error("specimen {specimen_id} field {field} has a non-finite value")]
    NonFiniteValue {
        /// Specimen identifier.
        specimen_id: String,
        /// Field name.
        field: String,
    },
    /// A field confidence is outside [0,1].
    #[error("specimen {specimen_id} field {field} confidence must be within [0,1]")]
    FieldConfidenceOutOfRange {
        /// Specimen identifier.
        specimen_id: String,
        /// Field name.
        field: String,
    },
    /// A numeric contextual input is negative or non-finite.
    #[error("contextual input {0} must be a finite, non-negative number")]
    InvalidContext(String),
}
