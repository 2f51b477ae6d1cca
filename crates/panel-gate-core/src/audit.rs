// crates/panel-gate-core/src/audit.rs
// ============================================================================
// Module: Panel Gate Audit Logging
// Description: Structured audit events for inference runs.
// Purpose: Emit JSON-line audit records without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The inference engine records one event when a run starts, one per output
//! decision, one per estimator failure, and one when the pack is complete.
//! Hosts choose where the events go by picking a sink; the engine never
//! fails because an audit write failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::decision::SuppressionReason;
use crate::core::identifiers::EngineId;
use crate::core::identifiers::OutputKey;
use crate::core::identifiers::RunId;
use crate::core::outcome::PackStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event-specific audit payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InferenceAuditKind {
    /// Evaluation of a run began.
    InferenceStarted {
        /// Number of specimens in the run.
        specimen_count: usize,
        /// Number of catalog outputs to evaluate.
        catalog_size: usize,
    },
    /// An output was produced.
    OutputProduced {
        /// Output key.
        output_key: OutputKey,
        /// Final confidence.
        confidence_0_1: f64,
        /// Number of engine estimates fused.
        engine_count: usize,
    },
    /// An output was suppressed.
    OutputSuppressed {
        /// Output key.
        output_key: OutputKey,
        /// Typed suppression reason.
        reason: SuppressionReason,
    },
    /// An estimator returned an error for one output.
    EstimatorFailed {
        /// Output key.
        output_key: OutputKey,
        /// Failing engine.
        engine: EngineId,
        /// Error message.
        error: String,
    },
    /// Evaluation of a run finished.
    InferenceCompleted {
        /// Pack status.
        status: PackStatus,
        /// Number of produced outputs.
        produced: usize,
        /// Number of suppressed outputs.
        suppressed: usize,
    },
}

/// Audit record for one inference event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Run the event belongs to.
    pub run_id: RunId,
    /// Event payload.
    #[serde(flatten)]
    pub kind: InferenceAuditKind,
}

impl InferenceAuditEvent {
    /// Creates an event stamped with the current wall-clock time.
    #[must_use]
    pub fn new(run_id: RunId, kind: InferenceAuditKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            timestamp_ms,
            run_id,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for inference audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event. Failures are swallowed by the sink.
    fn record(&self, event: &InferenceAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &InferenceAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// Append-mode file handle.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens (or creates) the audit file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &InferenceAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &InferenceAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&InferenceAuditEvent::new(
            RunId::new("run-1"),
            InferenceAuditKind::OutputSuppressed {
                output_key: OutputKey::new("egfr_est"),
                reason: SuppressionReason::BlockerConditionMet,
            },
        ));
        sink.record(&InferenceAuditEvent::new(
            RunId::new("run-1"),
            InferenceAuditKind::InferenceCompleted {
                status: PackStatus::Partial,
                produced: 0,
                suppressed: 1,
            },
        ));
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "output_suppressed");
        assert_eq!(lines[0]["reason"], "BLOCKER_CONDITION_MET");
        assert_eq!(lines[1]["event"], "inference_completed");
        assert_eq!(lines[1]["run_id"], "run-1");
    }
}
