// crates/panel-gate-core/src/core/catalog.rs
// ============================================================================
// Module: Panel Gate Output Catalog
// Description: Static table of derivable outputs and their dependency declarations.
// Purpose: Provide the single, validated source of truth for what each output needs.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The output catalog is loaded once at process start, validated, and then
//! shared read-only across evaluations. No other component declares input
//! dependencies; the gate, resolver, and assembler all read them from here.
//!
//! Invariants:
//! - Keys are unique and non-empty.
//! - `requires_all` and `requires_any` are disjoint.
//! - A direct source, when declared, is one of the output's anchors.
//! - The typical range is finite with `low < high`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::estimate::ValueRange;
use crate::core::identifiers::BlockerRef;
use crate::core::identifiers::Domain;
use crate::core::identifiers::InputRef;
use crate::core::identifiers::OutputKey;
use crate::core::outcome::SupportType;

// ============================================================================
// SECTION: Output Definition
// ============================================================================

/// Catalog entry describing one derivable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    /// Unique output key.
    pub key: OutputKey,
    /// Human-readable name.
    pub display_name: String,
    /// Physiological domain.
    pub domain: Domain,
    /// Reporting unit.
    pub unit: String,
    /// Whether the output is measured directly or inferred.
    pub support_type: SupportType,
    /// Typical physiological range used to normalise disagreement.
    pub typical_range: ValueRange,
    /// At least one of these inputs must be available.
    #[serde(default)]
    pub requires_any: BTreeSet<InputRef>,
    /// All of these inputs must be available.
    #[serde(default)]
    pub requires_all: BTreeSet<InputRef>,
    /// Conditions that forbid producing the output.
    #[serde(default)]
    pub blockers: BTreeSet<BlockerRef>,
    /// Analyte that measures the output directly, if any.
    #[serde(default)]
    pub direct_source: Option<InputRef>,
}

impl OutputDefinition {
    /// Creates a definition with no dependencies declared.
    #[must_use]
    pub fn new(
        key: impl Into<OutputKey>,
        domain: Domain,
        unit: impl Into<String>,
        support_type: SupportType,
        typical_range: ValueRange,
    ) -> Self {
        let key = key.into();
        Self {
            display_name: key.to_string(),
            key,
            domain,
            unit: unit.into(),
            support_type,
            typical_range,
            requires_any: BTreeSet::new(),
            requires_all: BTreeSet::new(),
            blockers: BTreeSet::new(),
            direct_source: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Adds inputs that must all be available.
    #[must_use]
    pub fn requires_all<'a>(mut self, inputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.requires_all.extend(inputs.into_iter().map(InputRef::from));
        self
    }

    /// Adds inputs of which at least one must be available.
    #[must_use]
    pub fn requires_any<'a>(mut self, inputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.requires_any.extend(inputs.into_iter().map(InputRef::from));
        self
    }

    /// Adds blocking conditions.
    #[must_use]
    pub fn blocked_by(mut self, blockers: impl IntoIterator<Item = BlockerRef>) -> Self {
        self.blockers.extend(blockers);
        self
    }

    /// Declares the analyte that measures this output directly.
    #[must_use]
    pub fn direct_source(mut self, input: &str) -> Self {
        self.direct_source = Some(InputRef::from(input));
        self
    }

    /// Returns every declared anchor (`requires_all` then `requires_any`, each sorted).
    pub fn anchors(&self) -> impl Iterator<Item = &InputRef> {
        self.requires_all.iter().chain(self.requires_any.iter())
    }

    /// Validates the definition in isolation.
    fn validate(&self) -> Result<(), CatalogError> {
        let key = self.key.as_str();
        if key.trim().is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        if !self.typical_range.is_well_formed() || self.typical_range.span() <= 0.0 {
            return Err(CatalogError::InvalidTypicalRange(key.to_string()));
        }
        if self.anchors().any(|input| input.as_str().trim().is_empty()) {
            return Err(CatalogError::EmptyInputRef(key.to_string()));
        }
        if let Some(input) = self.requires_all.intersection(&self.requires_any).next() {
            return Err(CatalogError::OverlappingRequirement {
                output: key.to_string(),
                input: input.to_string(),
            });
        }
        if let Some(source) = &self.direct_source
            && !self.requires_all.contains(source)
            && !self.requires_any.contains(source)
        {
            return Err(CatalogError::UndeclaredDirectSource {
                output: key.to_string(),
                input: source.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Output Catalog
// ============================================================================

/// Immutable, validated lookup table of output definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCatalog {
    /// Definitions keyed by output key.
    outputs: BTreeMap<OutputKey, OutputDefinition>,
}

impl OutputCatalog {
    /// Builds a catalog from definitions, validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog is empty, a key repeats, or an
    /// entry is malformed.
    pub fn new(definitions: Vec<OutputDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut outputs = BTreeMap::new();
        for definition in definitions {
            definition.validate()?;
            let key = definition.key.clone();
            if outputs.insert(key.clone(), definition).is_some() {
                return Err(CatalogError::DuplicateOutput(key.to_string()));
            }
        }
        Ok(Self {
            outputs,
        })
    }

    /// Builds the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the built-in table fails validation.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_definitions())
    }

    /// Looks up a definition by key.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownOutput`] when the key is not declared.
    pub fn lookup(&self, key: &OutputKey) -> Result<&OutputDefinition, CatalogError> {
        self.outputs.get(key).ok_or_else(|| CatalogError::UnknownOutput(key.to_string()))
    }

    /// Iterates definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = &OutputDefinition> {
        self.outputs.values()
    }

    /// Iterates output keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &OutputKey> {
        self.outputs.keys()
    }

    /// Returns the number of declared outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true when the catalog has no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Returns definitions as an ordered slice-friendly vector of references.
    #[must_use]
    pub fn definitions(&self) -> Vec<&OutputDefinition> {
        self.outputs.values().collect()
    }
}

// ============================================================================
// SECTION: Built-in Table
// ============================================================================

/// Returns the built-in output definitions.
#[must_use]
pub fn builtin_definitions() -> Vec<OutputDefinition> {
    use BlockerRef::AcuteIllness;
    use BlockerRef::DiureticUse;
    use BlockerRef::PregnancyConfirmedOrSuspected;

    vec![
        OutputDefinition::new(
            "glucose_est",
            Domain::Metabolic,
            "mg/dL",
            SupportType::Direct,
            ValueRange::new(70.0, 140.0),
        )
        .named("Glucose")
        .requires_all(["isf.glucose"])
        .direct_source("isf.glucose"),
        OutputDefinition::new(
            "lactate_est",
            Domain::Metabolic,
            "mmol/L",
            SupportType::Direct,
            ValueRange::new(0.5, 2.2),
        )
        .named("Lactate")
        .requires_all(["isf.lactate"])
        .direct_source("isf.lactate"),
        OutputDefinition::new(
            "metabolic_flexibility_score",
            Domain::Metabolic,
            "score",
            SupportType::Derived,
            ValueRange::new(0.0, 100.0),
        )
        .named("Metabolic Flexibility Score")
        .requires_all(["isf.glucose", "isf.lactate"])
        .requires_any(["age", "weight_kg", "activity_level"])
        .blocked_by([PregnancyConfirmedOrSuspected, AcuteIllness]),
        OutputDefinition::new(
            "wbc_est",
            Domain::InflammatoryImmune,
            "K/uL",
            SupportType::Direct,
            ValueRange::new(4.0, 11.0),
        )
        .named("White Blood Cell Count")
        .requires_all(["blood.wbc"])
        .direct_source("blood.wbc"),
        OutputDefinition::new(
            "inflammatory_tone",
            Domain::InflammatoryImmune,
            "score",
            SupportType::Proxy,
            ValueRange::new(0.0, 100.0),
        )
        .named("Inflammatory Tone")
        .requires_any(["blood.wbc", "blood.crp", "saliva.igm"])
        .blocked_by([AcuteIllness]),
        OutputDefinition::new(
            "hemoglobin_est",
            Domain::Hematologic,
            "g/dL",
            SupportType::Direct,
            ValueRange::new(12.0, 17.5),
        )
        .named("Hemoglobin")
        .requires_all(["blood.hemoglobin"])
        .direct_source("blood.hemoglobin"),
        OutputDefinition::new(
            "platelet_est",
            Domain::Hematologic,
            "K/uL",
            SupportType::Direct,
            ValueRange::new(150.0, 400.0),
        )
        .named("Platelet Count")
        .requires_all(["blood.platelets"])
        .direct_source("blood.platelets"),
        OutputDefinition::new(
            "hydration_status",
            Domain::RenalHydration,
            "score",
            SupportType::Proxy,
            ValueRange::new(0.0, 100.0),
        )
        .named("Hydration Status")
        .requires_all(["isf.sodium_na", "heart_rate"])
        .requires_any(["weight_kg", "activity_level", "sweat.sodium_na"])
        .blocked_by([AcuteIllness]),
        OutputDefinition::new(
            "electrolyte_regulation_score",
            Domain::RenalHydration,
            "score",
            SupportType::Derived,
            ValueRange::new(0.0, 100.0),
        )
        .named("Electrolyte Regulation Efficiency Score")
        .requires_all(["isf.sodium_na", "isf.potassium_k"])
        .requires_any(["isf.chloride_cl", "sweat.sodium_na"])
        .blocked_by([DiureticUse]),
        OutputDefinition::new(
            "egfr_est",
            Domain::RenalHydration,
            "mL/min/1.73m2",
            SupportType::Derived,
            ValueRange::new(60.0, 120.0),
        )
        .named("Estimated GFR")
        .requires_all(["blood.creatinine", "age", "sex_at_birth"])
        .blocked_by([PregnancyConfirmedOrSuspected]),
        OutputDefinition::new(
            "cortisol_stress_index",
            Domain::EndocrineStress,
            "score",
            SupportType::Proxy,
            ValueRange::new(0.0, 100.0),
        )
        .named("Cortisol Stress Index")
        .requires_all(["saliva.cortisol"])
        .requires_any(["sleep_duration_known", "stress_level"])
        .blocked_by([PregnancyConfirmedOrSuspected, AcuteIllness]),
    ]
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog configuration errors; fatal at load time.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog declares no outputs.
    #[error("output catalog must declare at least one output")]
    Empty,
    /// An output key is blank.
    #[error("output key must not be empty")]
    EmptyKey,
    /// An output key is declared more than once.
    #[error("duplicate output key: {0}")]
    DuplicateOutput(String),
    /// A key was looked up that the catalog does not declare.
    #[error("unknown output key: {0}")]
    UnknownOutput(String),
    /// A typical range is non-finite or empty.
    #[error("output {0} typical range must be finite with low < high")]
    InvalidTypicalRange(String),
    /// An input reference is blank.
    #[error("output {0} declares an empty input reference")]
    EmptyInputRef(String),
    /// An input appears in both `requires_all` and `requires_any`.
    #[error("output {output} lists {input} in both requires_all and requires_any")]
    OverlappingRequirement {
        /// Output key.
        output: String,
        /// Offending input.
        input: String,
    },
    /// The direct source is not one of the output's anchors.
    #[error("output {output} direct source {input} is not a declared anchor")]
    UndeclaredDirectSource {
        /// Output key.
        output: String,
        /// Offending input.
        input: String,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
