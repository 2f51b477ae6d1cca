// crates/panel-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Temp-file fixtures for config and catalog loading.
// Purpose: Reduce duplication across integration tests for panel-gate-config.
// =============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites."
)]

use std::io::Write;

use panel_gate_config::ConfigError;
use tempfile::NamedTempFile;

/// Result alias used by tests that report failures as strings.
pub type TestResult = Result<(), String>;

/// Writes `content` to a fresh temp file.
pub fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// A minimal, valid two-output catalog.
pub const SMALL_CATALOG: &str = r#"
[[outputs]]
key = "glucose_est"
display_name = "Glucose"
domain = "metabolic"
unit = "mg/dL"
support_type = "direct"
typical_range = { low = 70.0, high = 140.0 }
requires_all = ["isf.glucose"]
direct_source = "isf.glucose"

[[outputs]]
key = "egfr_est"
display_name = "Estimated GFR"
domain = "renal_hydration"
unit = "mL/min/1.73m2"
support_type = "derived"
typical_range = { low = 60.0, high = 120.0 }
requires_all = ["blood.creatinine", "age", "sex_at_birth"]
blockers = ["pregnancy=confirmed_or_suspected"]
"#;
