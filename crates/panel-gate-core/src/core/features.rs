// crates/panel-gate-core/src/core/features.rs
// ============================================================================
// Module: Panel Gate Feature Pack
// Description: Per-domain coherence and signal-quality scores from preprocessing.
// Purpose: Carry the upstream feature summary consumed by gating and arbitration.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The feature pack is computed by an external preprocessing pipeline. The
//! core only reads the per-domain scores; it never recomputes them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::Domain;

// ============================================================================
// SECTION: Feature Pack
// ============================================================================

/// Feature summary produced upstream for one run.
///
/// # Invariants
/// - All scores are finite and within [0,1] once [`FeaturePack::validate`] passes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeaturePack {
    /// Internal consistency of each domain's signals.
    #[serde(default)]
    pub domain_coherence: BTreeMap<Domain, f64>,
    /// Signal quality of each domain's inputs.
    #[serde(default)]
    pub domain_signal_quality: BTreeMap<Domain, f64>,
    /// Overall coherence reported by preprocessing, when computed.
    #[serde(default)]
    pub overall_coherence: Option<f64>,
}

impl FeaturePack {
    /// Validates that every score is a finite value in [0,1].
    ///
    /// # Errors
    ///
    /// Returns [`FeaturePackError`] naming the first offending score.
    pub fn validate(&self) -> Result<(), FeaturePackError> {
        for (domain, score) in &self.domain_coherence {
            ensure_unit_interval(&format!("domain_coherence.{domain}"), *score)?;
        }
        for (domain, score) in &self.domain_signal_quality {
            ensure_unit_interval(&format!("domain_signal_quality.{domain}"), *score)?;
        }
        if let Some(score) = self.overall_coherence {
            ensure_unit_interval("overall_coherence", score)?;
        }
        Ok(())
    }

    /// Returns the coherence score for a domain when supplied.
    #[must_use]
    pub fn coherence(&self, domain: Domain) -> Option<f64> {
        self.domain_coherence.get(&domain).copied()
    }

    /// Returns the signal-quality score for a domain when supplied.
    #[must_use]
    pub fn signal_quality(&self, domain: Domain) -> Option<f64> {
        self.domain_signal_quality.get(&domain).copied()
    }

    /// Returns the feature-pack signal names that describe a domain.
    #[must_use]
    pub fn signal_names(&self, domain: Domain) -> Vec<String> {
        let mut names = Vec::new();
        if self.domain_coherence.contains_key(&domain) {
            names.push(format!("domain_coherence.{domain}"));
        }
        if self.domain_signal_quality.contains_key(&domain) {
            names.push(format!("domain_signal_quality.{domain}"));
        }
        names
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Feature pack validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeaturePackError {
    /// A score is NaN, infinite, or outside [0,1].
    #[error("feature pack score {0} must be within [0,1]")]
    ScoreOutOfRange(String),
}

/// Rejects scores outside the unit interval.
fn ensure_unit_interval(name: &str, score: f64) -> Result<(), FeaturePackError> {
    if (0.0 ..= 1.0).contains(&score) {
        Ok(())
    } else {
        Err(FeaturePackError::ScoreOutOfRange(name.to_string()))
    }
}
