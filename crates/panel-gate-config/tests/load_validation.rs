//! Config load validation tests for panel-gate-config.
// crates/panel-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, ranges).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::io::Write;
use std::path::Path;

use panel_gate_config::AuditSinkKind;
use panel_gate_config::ConfigError;
use panel_gate_config::PanelGateConfig;
use panel_gate_core::InferenceAuditEvent;
use panel_gate_core::InferenceAuditKind;
use panel_gate_core::RunId;
use tempfile::NamedTempFile;

use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::temp_file;

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a/".repeat(2_500);
    assert_invalid(PanelGateConfig::load(Some(Path::new(&long_path))), "exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        PanelGateConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match PanelGateConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(PanelGateConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(PanelGateConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_reads_sections_from_file() -> TestResult {
    let file = temp_file(
        r#"
[gate]
confidence_floor = 0.4
stale_after_hours = 48.0

[confidence]
disagreement_threshold = 0.2

[confidence.weights]
completeness = 0.3
anchor_quality = 0.2
recency = 0.1
signal_quality = 0.25
agreement = 0.15

[audit]
sink = "stderr"
"#,
    );
    let config = PanelGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if (config.gate.confidence_floor - 0.4).abs() > f64::EPSILON {
        return Err("confidence_floor not applied".to_string());
    }
    if (config.gate.base_confidence - 0.75).abs() > f64::EPSILON {
        return Err("unset gate values must keep defaults".to_string());
    }
    if (config.confidence.weights.completeness - 0.3).abs() > f64::EPSILON {
        return Err("weights not applied".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("audit sink not applied".to_string());
    }
    Ok(())
}

#[test]
fn unknown_keys_are_parse_errors() -> TestResult {
    match PanelGateConfig::from_toml_str("[gate]\nconfidence_flor = 0.4\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn out_of_range_threshold_is_invalid() -> TestResult {
    assert_invalid(PanelGateConfig::from_toml_str("[gate]\nconfidence_floor = 1.5\n"), "gate:")
}

#[test]
fn weights_must_sum_to_one() -> TestResult {
    let content = "[confidence.weights]\ncompleteness = 0.9\n";
    assert_invalid(PanelGateConfig::from_toml_str(content), "sum to 1")
}

#[test]
fn file_sink_requires_path() -> TestResult {
    assert_invalid(
        PanelGateConfig::from_toml_str("[audit]\nsink = \"file\"\n"),
        "audit.path is required",
    )
}

#[test]
fn file_sink_appends_json_lines() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let log = dir.path().join("audit.jsonl");
    let content = format!("[audit]\nsink = \"file\"\npath = {:?}\n", log.display().to_string());
    let config = PanelGateConfig::from_toml_str(&content).map_err(|err| err.to_string())?;
    let sink = config.build_audit_sink().map_err(|err| err.to_string())?;
    sink.record(&started_event());
    let written = std::fs::read_to_string(&log).map_err(|err| err.to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(written.trim()).map_err(|err| err.to_string())?;
    if value["event"] != "inference_started" {
        return Err(format!("unexpected audit line {written}"));
    }
    Ok(())
}

fn started_event() -> InferenceAuditEvent {
    InferenceAuditEvent::new(
        RunId::new("run-1"),
        InferenceAuditKind::InferenceStarted {
            specimen_count: 1,
            catalog_size: 2,
        },
    )
}
