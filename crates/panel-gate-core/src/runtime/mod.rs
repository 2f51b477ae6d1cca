// crates/panel-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Panel Gate Runtime
// Description: Availability resolution, gating, fusion, arbitration, and assembly.
// Purpose: Evaluate runs against the output catalog.
// Dependencies: crate::core, crate::interfaces, rayon
// ============================================================================

//! ## Overview
//! Runtime components in dependency order: [`availability`], [`gate`],
//! [`fusion`], [`confidence`], and [`assembler`]. Tunables live in
//! [`settings`].

pub mod assembler;
pub mod availability;
pub mod confidence;
pub mod fusion;
pub mod gate;
pub mod settings;

pub use assembler::InferenceEngine;
pub use assembler::InferenceError;
pub use availability::AnchorSummary;
pub use availability::AvailabilityMaps;
pub use availability::Observation;
pub use availability::resolve_availability;
pub use confidence::ConfidenceArbitrator;
pub use confidence::ConfidenceComponents;
pub use confidence::ConfidenceScore;
pub use fusion::FusedEstimate;
pub use fusion::FusionError;
pub use fusion::fuse;
pub use gate::EligibilityGate;
pub use settings::ComponentWeights;
pub use settings::ConfidenceConfig;
pub use settings::GateConfig;
pub use settings::PenaltyAmounts;
pub use settings::SettingsError;
