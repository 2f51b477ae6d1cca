// crates/panel-gate-config/src/config.rs
// ============================================================================
// Module: Panel Gate Configuration
// Description: Configuration loading and validation for Panel Gate.
// Purpose: Provide strict, fail-closed config parsing with bounded inputs.
// Dependencies: panel-gate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! The configuration is loaded once at startup from `panel-gate.toml`. The
//! path comes from the caller, else [`CONFIG_ENV_VAR`], else
//! [`DEFAULT_CONFIG_NAME`]. A missing default file yields the built-in
//! defaults; an explicitly named file must exist. Every section is validated
//! before any engine is built, and an invalid value is fatal.
//!
//! Security posture: config files are untrusted input. Paths and file sizes
//! are bounded and contents must be UTF-8.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use panel_gate_core::AuditSink;
use panel_gate_core::ConfidenceConfig;
use panel_gate_core::FileAuditSink;
use panel_gate_core::GateConfig;
use panel_gate_core::InferenceEngine;
use panel_gate_core::NoopAuditSink;
use panel_gate_core::OutputCatalog;
use panel_gate_core::OutputDefinition;
use panel_gate_core::StderrAuditSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PANEL_GATE_CONFIG";
/// Config file name used when neither a path nor the env var is given.
pub const DEFAULT_CONFIG_NAME: &str = "panel-gate.toml";
/// Maximum size of a config file.
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;
/// Maximum size of a catalog file.
pub const MAX_CATALOG_FILE_BYTES: u64 = 4 * 1024 * 1024;
/// Maximum total length of a config or catalog path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level Panel Gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelGateConfig {
    /// Eligibility gate thresholds.
    #[serde(default)]
    pub gate: GateConfig,
    /// Confidence arbitration weights and penalties.
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Output catalog source.
    #[serde(default)]
    pub catalog: CatalogSettings,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditSettings,
}

/// Where the output catalog comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSettings {
    /// Path to a TOML catalog file; the built-in catalog is used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Audit sink kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    #[default]
    None,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Selected sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path, required for file sinks.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// On-disk catalog file: a list of `[[outputs]]` tables.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    /// Output definitions.
    outputs: Vec<OutputDefinition>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a file failed.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing failed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The configuration parsed but is invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl PanelGateConfig {
    /// Loads and validates configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let explicit = path.map(Path::to_path_buf).or(env_path);
        let resolved = match explicit {
            Some(path) => path,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_NAME);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        validate_path(&resolved)?;
        let content = read_bounded_utf8(&resolved, MAX_CONFIG_FILE_BYTES, "config file")?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate().map_err(|err| ConfigError::Invalid(format!("gate: {err}")))?;
        self.confidence
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("confidence: {err}")))?;
        if let Some(path) = &self.catalog.path {
            validate_path(path)?;
        }
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::File, None) => {
                return Err(ConfigError::Invalid("audit.path is required for file sinks".into()));
            }
            (AuditSinkKind::File, Some(path)) => validate_path(path)?,
            _ => {}
        }
        Ok(())
    }

    /// Builds the output catalog: the configured file, else the built-in table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the catalog file is unreadable or fails
    /// catalog validation.
    pub fn build_catalog(&self) -> Result<OutputCatalog, ConfigError> {
        match &self.catalog.path {
            Some(path) => load_catalog(path),
            None => OutputCatalog::builtin()
                .map_err(|err| ConfigError::Invalid(format!("catalog: {err}"))),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit log cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("audit.path is required for file sinks".into())
                })?;
                let sink = FileAuditSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("audit log {}: {err}", path.display())))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Builds an inference engine with the configured catalog, settings, and
    /// audit sink. Only the direct-measurement estimator is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any component fails to build.
    pub fn build_engine(&self) -> Result<InferenceEngine, ConfigError> {
        let catalog = Arc::new(self.build_catalog()?);
        let engine = InferenceEngine::new(catalog)
            .with_settings(self.gate.clone(), self.confidence.clone())
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(engine.with_audit(self.build_audit_sink()?))
    }
}

/// Loads and validates a TOML catalog file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable, malformed, or
/// violates catalog invariants.
pub fn load_catalog(path: &Path) -> Result<OutputCatalog, ConfigError> {
    validate_path(path)?;
    let content = read_bounded_utf8(path, MAX_CATALOG_FILE_BYTES, "catalog file")?;
    let file: CatalogFile =
        toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    OutputCatalog::new(file.outputs).map_err(|err| ConfigError::Invalid(format!("catalog: {err}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects oversized paths and path components.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".into()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".into()));
    }
    Ok(())
}

/// Reads a UTF-8 file no larger than `limit` bytes.
fn read_bounded_utf8(path: &Path, limit: u64, label: &str) -> Result<String, ConfigError> {
    let file = fs::File::open(path)
        .map_err(|err| ConfigError::Io(format!("{label} {}: {err}", path.display())))?;
    let size = file.metadata().map_err(|err| ConfigError::Io(err.to_string()))?.len();
    if size > limit {
        return Err(ConfigError::Invalid(format!("{label} exceeds size limit")));
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(err.to_string()))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > limit {
        return Err(ConfigError::Invalid(format!("{label} exceeds size limit")));
    }
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid(format!("{label} must be utf-8")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
