// crates/panel-gate-config/tests/catalog_loading.rs
// =============================================================================
// Module: Catalog Loading Tests
// Description: TOML catalog files, built-in fallback, and engine wiring.
// Purpose: Ensure catalog configuration errors are fatal at load time.
// =============================================================================

//! Catalog loading and engine wiring tests for panel-gate-config.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use panel_gate_config::PanelGateConfig;
use panel_gate_config::load_catalog;
use panel_gate_core::BlockerRef;
use panel_gate_core::OutputCatalog;
use panel_gate_core::OutputKey;

use crate::common::SMALL_CATALOG;
use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::temp_file;

fn config_for_catalog(path: &std::path::Path) -> String {
    format!("[catalog]\npath = {:?}\n", path.display().to_string())
}

#[test]
fn missing_catalog_path_uses_builtin_table() {
    let catalog = PanelGateConfig::default().build_catalog().unwrap();
    assert_eq!(catalog, OutputCatalog::builtin().unwrap());
}

#[test]
fn catalog_file_is_loaded_and_validated() {
    let file = temp_file(SMALL_CATALOG);
    let catalog = load_catalog(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    let egfr = catalog.lookup(&OutputKey::new("egfr_est")).unwrap();
    assert!(egfr.blockers.contains(&BlockerRef::PregnancyConfirmedOrSuspected));
    assert_eq!(egfr.requires_all.len(), 3);
}

#[test]
fn configured_catalog_drives_the_engine() {
    let file = temp_file(SMALL_CATALOG);
    let config = PanelGateConfig::from_toml_str(&config_for_catalog(file.path())).unwrap();
    let engine = config.build_engine().unwrap();
    let keys: Vec<&str> = engine.catalog().keys().map(OutputKey::as_str).collect();
    assert_eq!(keys, vec!["egfr_est", "glucose_est"]);
}

#[test]
fn duplicate_output_keys_are_fatal() -> TestResult {
    let doubled = format!("{SMALL_CATALOG}\n{}", SMALL_CATALOG.replace("egfr_est", "egfr_b"));
    let file = temp_file(&doubled);
    assert_invalid(load_catalog(file.path()), "duplicate output key: glucose_est")
}

#[test]
fn overlapping_requirements_are_fatal() -> TestResult {
    let file = temp_file(
        r#"
[[outputs]]
key = "bad"
display_name = "Bad"
domain = "metabolic"
unit = "score"
support_type = "derived"
typical_range = { low = 0.0, high = 1.0 }
requires_all = ["isf.glucose"]
requires_any = ["isf.glucose"]
"#,
    );
    assert_invalid(load_catalog(file.path()), "both requires_all and requires_any")
}

#[test]
fn unknown_blocker_is_a_parse_error() -> TestResult {
    let file = temp_file(&SMALL_CATALOG.replace("pregnancy=confirmed_or_suspected", "smoking"));
    assert_invalid(load_catalog(file.path()), "config parse error")
}

#[test]
fn empty_catalog_is_fatal() -> TestResult {
    let file = temp_file("outputs = []\n");
    assert_invalid(load_catalog(file.path()), "at least one output")
}
