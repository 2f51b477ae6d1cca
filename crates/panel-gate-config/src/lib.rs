// crates/panel-gate-config/src/lib.rs
// ============================================================================
// Module: Panel Gate Config
// Description: Canonical configuration model for Panel Gate.
// Purpose: Single source of truth for config loading, validation, and wiring.
// Dependencies: panel-gate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `panel-gate-config` owns the `panel-gate.toml` model. Hosts load it once,
//! then build the catalog, audit sink, and [`panel_gate_core::InferenceEngine`]
//! from it.

pub mod config;

pub use config::AuditSettings;
pub use config::AuditSinkKind;
pub use config::CONFIG_ENV_VAR;
pub use config::CatalogSettings;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::PanelGateConfig;
pub use config::load_catalog;
