// crates/panel-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Panel Gate Interfaces
// Description: Backend-agnostic estimation engine contract and built-in engines.
// Purpose: Let hosts plug numeric models into fusion without touching the gate.
// Dependencies: crate::core, crate::runtime::availability, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`Estimator`] proposes at most one candidate value per output. Engines
//! run only for outputs the gate allowed, and an engine error affects only
//! the output it was estimating.
//!
//! Two engines ship with the core:
//! - [`DirectMeasurementEstimator`] reads the freshest observation of an
//!   output's declared direct source that carries positive confidence.
//! - [`PrecomputedEstimator`] replays estimates computed elsewhere, one
//!   estimator per engine id found in a [`PrecomputedEstimates`] table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::catalog::OutputDefinition;
use crate::core::estimate::EngineEstimate;
use crate::core::features::FeaturePack;
use crate::core::identifiers::EngineId;
use crate::core::identifiers::OutputKey;
use crate::core::run::Run;
use crate::runtime::availability::AvailabilityMaps;

// ============================================================================
// SECTION: Estimator Contract
// ============================================================================

/// Read-only inputs visible to an estimator.
#[derive(Debug, Clone, Copy)]
pub struct EstimationContext<'a> {
    /// Run under evaluation.
    pub run: &'a Run,
    /// Feature pack for the run.
    pub feature_pack: &'a FeaturePack,
    /// Resolved availability.
    pub availability: &'a AvailabilityMaps,
}

/// Estimator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimatorError {
    /// The engine failed while estimating.
    #[error("estimator error: {0}")]
    Engine(String),
    /// The engine's own inputs are malformed.
    #[error("invalid estimator input: {0}")]
    InvalidInput(String),
}

/// Estimation engine.
pub trait Estimator: Send + Sync {
    /// Returns the engine identifier.
    fn id(&self) -> EngineId;

    /// Proposes a candidate value, or `None` when the engine has nothing to say.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError`] when the engine fails for this output.
    fn estimate(
        &self,
        definition: &OutputDefinition,
        ctx: &EstimationContext<'_>,
    ) -> Result<Option<EngineEstimate>, EstimatorError>;
}

// ============================================================================
// SECTION: Direct Measurement
// ============================================================================

/// Engine identifier of [`DirectMeasurementEstimator`].
pub const DIRECT_MEASUREMENT_ENGINE: &str = "direct_measurement";

/// Reads the freshest observation of an output's direct source.
///
/// Observations with zero confidence are skipped. Reliability is the
/// field-level confidence of the chosen observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMeasurementEstimator;

impl Estimator for DirectMeasurementEstimator {
    fn id(&self) -> EngineId {
        EngineId::from(DIRECT_MEASUREMENT_ENGINE)
    }

    fn estimate(
        &self,
        definition: &OutputDefinition,
        ctx: &EstimationContext<'_>,
    ) -> Result<Option<EngineEstimate>, EstimatorError> {
        let Some(source) = &definition.direct_source else {
            return Ok(None);
        };
        Ok(ctx.availability.freshest_reliable(source).map(|observation| {
            EngineEstimate::new(self.id(), observation.value, observation.confidence)
        }))
    }
}

// ============================================================================
// SECTION: Precomputed Estimates
// ============================================================================

/// Externally computed estimates keyed by output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrecomputedEstimates {
    /// Estimates per output, one per engine.
    by_output: BTreeMap<OutputKey, Vec<EngineEstimate>>,
}

impl PrecomputedEstimates {
    /// Builds a table, rejecting repeated engines for the same output.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::InvalidInput`] when an output lists the same
    /// engine twice.
    pub fn new(by_output: BTreeMap<OutputKey, Vec<EngineEstimate>>) -> Result<Self, EstimatorError> {
        for (output, estimates) in &by_output {
            let mut engines = BTreeSet::new();
            for estimate in estimates {
                if !engines.insert(&estimate.engine) {
                    return Err(EstimatorError::InvalidInput(format!(
                        "output {output} lists engine {} more than once",
                        estimate.engine
                    )));
                }
            }
        }
        Ok(Self {
            by_output,
        })
    }

    /// Parses a JSON object mapping output keys to estimate arrays.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::InvalidInput`] on malformed JSON or repeated engines.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, EstimatorError> {
        let by_output = serde_json::from_slice(bytes)
            .map_err(|err| EstimatorError::InvalidInput(err.to_string()))?;
        Self::new(by_output)
    }

    /// Returns every engine id mentioned in the table, sorted.
    #[must_use]
    pub fn engines(&self) -> BTreeSet<EngineId> {
        self.by_output
            .values()
            .flat_map(|estimates| estimates.iter().map(|estimate| estimate.engine.clone()))
            .collect()
    }

    /// Returns the estimate one engine supplied for one output.
    #[must_use]
    pub fn lookup(&self, output: &OutputKey, engine: &EngineId) -> Option<&EngineEstimate> {
        self.by_output.get(output)?.iter().find(|estimate| &estimate.engine == engine)
    }

    /// Splits the table into one estimator per engine.
    #[must_use]
    pub fn into_estimators(self) -> Vec<Arc<dyn Estimator>> {
        let engines = self.engines();
        let table = Arc::new(self);
        engines
            .into_iter()
            .map(|engine| {
                Arc::new(PrecomputedEstimator {
                    engine,
                    table: Arc::clone(&table),
                }) as Arc<dyn Estimator>
            })
            .collect()
    }
}

/// Replays one engine's column of a [`PrecomputedEstimates`] table.
#[derive(Debug, Clone)]
pub struct PrecomputedEstimator {
    /// Engine replayed by this estimator.
    engine: EngineId,
    /// Shared estimate table.
    table: Arc<PrecomputedEstimates>,
}

impl PrecomputedEstimator {
    /// Creates an estimator for one engine of a shared table.
    #[must_use]
    pub const fn new(engine: EngineId, table: Arc<PrecomputedEstimates>) -> Self {
        Self {
            engine,
            table,
        }
    }
}

impl Estimator for PrecomputedEstimator {
    fn id(&self) -> EngineId {
        self.engine.clone()
    }

    fn estimate(
        &self,
        definition: &OutputDefinition,
        _ctx: &EstimationContext<'_>,
    ) -> Result<Option<EngineEstimate>, EstimatorError> {
        Ok(self.table.lookup(&definition.key, &self.engine).cloned())
    }
}
