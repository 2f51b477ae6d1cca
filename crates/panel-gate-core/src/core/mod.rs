// crates/panel-gate-core/src/core/mod.rs
// ============================================================================
// Module: Panel Gate Core Types
// Description: Data model for runs, catalogs, decisions, and inference packs.
// Purpose: Group the serializable types shared by runtime and interfaces.
// Dependencies: serde, smallvec, thiserror, time
// ============================================================================

//! ## Overview
//! Core types carry no behavior beyond validation and lookup. Evaluation
//! lives in [`crate::runtime`].

pub mod catalog;
pub mod decision;
pub mod estimate;
pub mod digest;
pub mod features;
pub mod identifiers;
pub mod outcome;
pub mod run;

pub use catalog::CatalogError;
pub use catalog::OutputCatalog;
pub use catalog::OutputDefinition;
pub use decision::ConfidenceDriver;
pub use decision::ConfidencePenalty;
pub use decision::GateDecision;
pub use decision::GateEvaluation;
pub use decision::GateStep;
pub use decision::GateTraceEntry;
pub use decision::PenaltyList;
pub use decision::SuppressionReason;
pub use digest::CanonicalJsonError;
pub use digest::PackDigest;
pub use estimate::EngineEstimate;
pub use estimate::ValueRange;
pub use features::FeaturePack;
pub use features::FeaturePackError;
pub use identifiers::BlockerRef;
pub use identifiers::Domain;
pub use identifiers::EngineId;
pub use identifiers::InputRef;
pub use identifiers::OutputKey;
pub use identifiers::RunId;
pub use identifiers::SpecimenId;
pub use outcome::DependencyRationale;
pub use outcome::DomainStatus;
pub use outcome::InferencePack;
pub use outcome::InferredValue;
pub use outcome::OutcomeStatus;
pub use outcome::PackStatus;
pub use outcome::PhysiologicalState;
pub use outcome::ProvenanceEntry;
pub use outcome::ProvenanceType;
pub use outcome::SupportType;
pub use outcome::SuppressedOutput;
pub use run::MeasuredField;
pub use run::Missingness;
pub use run::NonLabInputs;
pub use run::QualitativeInputs;
pub use run::Run;
pub use run::RunError;
pub use run::Specimen;
pub use run::SpecimenType;
