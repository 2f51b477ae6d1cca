// crates/panel-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Panel Gate Identifiers
// Description: Opaque identifiers for runs, specimens, outputs, inputs, and engines.
// Purpose: Provide strongly typed, ordered, serializable keys with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. They implement
//! `Ord` so every map keyed by them iterates in a stable order, which the
//! report assembler relies on for reproducible output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the shared helper impls.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier!(
    /// Run identifier assigned by the upstream run producer.
    RunId
);

string_identifier!(
    /// Specimen identifier, unique within a run.
    SpecimenId
);

string_identifier!(
    /// Catalog output key (for example `glucose_est`).
    OutputKey
);

string_identifier!(
    /// Canonical input reference.
    ///
    /// Measured analytes use `<specimen_prefix>.<field>` (for example
    /// `isf.glucose`); contextual inputs use a bare name (for example `age`).
    InputRef
);

string_identifier!(
    /// Estimation engine identifier (for example `direct_measurement`).
    EngineId
);

// ============================================================================
// SECTION: Blockers
// ============================================================================

/// Blocking condition that forbids producing an output when active.
///
/// # Invariants
/// - Serialized labels are stable and used verbatim in audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockerRef {
    /// Pregnancy is confirmed or suspected.
    #[serde(rename = "pregnancy=confirmed_or_suspected")]
    PregnancyConfirmedOrSuspected,
    /// An acute illness is reported.
    #[serde(rename = "acute_illness")]
    AcuteIllness,
    /// A diuretic appears in the medication list.
    #[serde(rename = "diuretic_use")]
    DiureticUse,
}

impl BlockerRef {
    /// All blockers in declaration order.
    pub const ALL: [Self; 3] = [Self::PregnancyConfirmedOrSuspected, Self::AcuteIllness, Self::DiureticUse];

    /// Returns the stable label for the blocker.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PregnancyConfirmedOrSuspected => "pregnancy=confirmed_or_suspected",
            Self::AcuteIllness => "acute_illness",
            Self::DiureticUse => "diuretic_use",
        }
    }
}

impl fmt::Display for BlockerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Domains
// ============================================================================

/// Physiological domain an output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Glucose handling and substrate utilisation.
    Metabolic,
    /// Red cell and platelet indices.
    Hematologic,
    /// White cell and inflammatory markers.
    InflammatoryImmune,
    /// Kidney function, electrolytes, and fluid balance.
    RenalHydration,
    /// Cortisol and stress-axis markers.
    EndocrineStress,
}

impl Domain {
    /// Returns the stable snake-case label for the domain.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metabolic => "metabolic",
            Self::Hematologic => "hematologic",
            Self::InflammatoryImmune => "inflammatory_immune",
            Self::RenalHydration => "renal_hydration",
            Self::EndocrineStress => "endocrine_stress",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
