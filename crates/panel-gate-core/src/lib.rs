// crates/panel-gate-core/src/lib.rs
// ============================================================================
// Module: Panel Gate Core
// Description: Output eligibility gating and confidence arbitration.
// Purpose: Decide, per catalog output, whether to produce or suppress, and score what is produced.
// Dependencies: rayon, serde, serde_jcs, serde_json, sha2, smallvec, thiserror, time
// ============================================================================

//! ## Overview
//! Panel Gate evaluates a multi-specimen [`Run`] against a static
//! [`OutputCatalog`]. For every catalog output it resolves input
//! availability, applies the eligibility gate, fuses engine estimates, and
//! arbitrates a confidence score. The result is one deterministic
//! [`InferencePack`] per run.
//!
//! The crate is backend-agnostic: estimation engines plug in through the
//! [`Estimator`] trait and audit records leave through [`audit::AuditSink`].

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

pub use crate::core::*;
pub use crate::audit::AuditSink;
pub use crate::audit::FileAuditSink;
pub use crate::audit::InferenceAuditEvent;
pub use crate::audit::InferenceAuditKind;
pub use crate::audit::NoopAuditSink;
pub use crate::audit::StderrAuditSink;
pub use crate::interfaces::DirectMeasurementEstimator;
pub use crate::interfaces::EstimationContext;
pub use crate::interfaces::Estimator;
pub use crate::interfaces::EstimatorError;
pub use crate::interfaces::PrecomputedEstimates;
pub use crate::interfaces::PrecomputedEstimator;
pub use crate::runtime::AvailabilityMaps;
pub use crate::runtime::ConfidenceArbitrator;
pub use crate::runtime::ConfidenceConfig;
pub use crate::runtime::EligibilityGate;
pub use crate::runtime::GateConfig;
pub use crate::runtime::SettingsError;
pub use crate::runtime::InferenceEngine;
pub use crate::runtime::InferenceError;
pub use crate::runtime::resolve_availability;
