// crates/panel-gate-core/src/runtime/assembler.rs
// ============================================================================
// Module: Panel Gate Report Assembler
// Description: Runs gating, fusion, and arbitration for every catalog output.
// Purpose: Produce one deterministic inference pack per run.
// Dependencies: crate::core, crate::interfaces, crate::audit, rayon, thiserror, time
// ============================================================================

//! ## Overview
//! [`InferenceEngine::infer`] validates the run and feature pack, resolves
//! availability once, then evaluates every catalog output in parallel. Each
//! output is evaluated from shared read-only inputs and returns an owned
//! outcome, so one output's estimator failure never touches another.
//! Outcomes are sorted by output key before the pack is assembled, and audit
//! events are emitted in that same order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use time::OffsetDateTime;

use crate::audit::AuditSink;
use crate::audit::InferenceAuditEvent;
use crate::audit::InferenceAuditKind;
use crate::audit::NoopAuditSink;
use crate::core::catalog::CatalogError;
use crate::core::catalog::OutputCatalog;
use crate::core::catalog::OutputDefinition;
use crate::core::decision::GateDecision;
use crate::core::decision::GateEvaluation;
use crate::core::decision::GateStep;
use crate::core::decision::GateTraceEntry;
use crate::core::decision::SuppressionReason;
use crate::core::features::FeaturePack;
use crate::core::features::FeaturePackError;
use crate::core::identifiers::Domain;
use crate::core::identifiers::EngineId;
use crate::core::identifiers::InputRef;
use crate::core::identifiers::OutputKey;
use crate::core::outcome::DependencyRationale;
use crate::core::outcome::DomainStatus;
use crate::core::outcome::INFERENCE_PACK_SCHEMA_VERSION;
use crate::core::outcome::InferencePack;
use crate::core::outcome::InferredValue;
use crate::core::outcome::OutcomeStatus;
use crate::core::outcome::PackStatus;
use crate::core::outcome::PhysiologicalState;
use crate::core::outcome::ProvenanceEntry;
use crate::core::outcome::ProvenanceType;
use crate::core::outcome::SuppressedOutput;
use crate::core::run::Run;
use crate::core::run::RunError;
use crate::interfaces::DirectMeasurementEstimator;
use crate::interfaces::EstimationContext;
use crate::interfaces::Estimator;
use crate::runtime::availability::resolve_availability;
use crate::runtime::confidence::ConfidenceArbitrator;
use crate::runtime::confidence::ConfidenceComponents;
use crate::runtime::fusion::fuse;
use crate::runtime::gate::EligibilityGate;
use crate::runtime::settings::ConfidenceConfig;
use crate::runtime::settings::GateConfig;
use crate::runtime::settings::SettingsError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Inference failures; data absence is never an error.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The run failed structural validation.
    #[error("invalid run: {0}")]
    InvalidRun(#[from] RunError),
    /// The feature pack failed validation.
    #[error("invalid feature pack: {0}")]
    InvalidFeaturePack(#[from] FeaturePackError),
    /// A requested output is not in the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Report assembler: evaluates a run against the shared catalog.
#[derive(Clone)]
pub struct InferenceEngine {
    /// Shared, validated catalog.
    catalog: Arc<OutputCatalog>,
    /// Eligibility gate.
    gate: EligibilityGate,
    /// Confidence arbitrator.
    arbitrator: ConfidenceArbitrator,
    /// Estimation engines, consulted in registration order.
    estimators: Vec<Arc<dyn Estimator>>,
    /// Audit destination.
    audit: Arc<dyn AuditSink>,
}

impl InferenceEngine {
    /// Creates an engine with default settings, the direct-measurement
    /// estimator, and a no-op audit sink.
    #[must_use]
    pub fn new(catalog: Arc<OutputCatalog>) -> Self {
        let confidence = ConfidenceConfig::default();
        Self {
            catalog,
            gate: EligibilityGate::new(GateConfig::default(), confidence.penalties),
            arbitrator: ConfidenceArbitrator::new(confidence),
            estimators: vec![Arc::new(DirectMeasurementEstimator)],
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the gate and arbitrator settings after validating them.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when either settings block is invalid.
    pub fn with_settings(
        mut self,
        gate: GateConfig,
        confidence: ConfidenceConfig,
    ) -> Result<Self, SettingsError> {
        gate.validate()?;
        confidence.validate()?;
        self.gate = EligibilityGate::new(gate, confidence.penalties);
        self.arbitrator = ConfidenceArbitrator::new(confidence);
        Ok(self)
    }

    /// Registers additional estimators.
    #[must_use]
    pub fn with_estimators(
        mut self,
        estimators: impl IntoIterator<Item = Arc<dyn Estimator>>,
    ) -> Self {
        self.estimators.extend(estimators);
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &OutputCatalog {
        &self.catalog
    }

    /// Evaluates only the eligibility gate for one output.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] when the inputs are malformed or the key is
    /// not in the catalog.
    pub fn gate_output(
        &self,
        key: &OutputKey,
        run: &Run,
        feature_pack: &FeaturePack,
        evaluated_at: OffsetDateTime,
    ) -> Result<GateEvaluation, InferenceError> {
        run.validate()?;
        feature_pack.validate()?;
        let definition = self.catalog.lookup(key)?;
        let availability = resolve_availability(run, feature_pack, evaluated_at);
        let (coherence, signal) = self.domain_scores(definition, feature_pack);
        Ok(self.gate.evaluate(
            definition,
            &availability,
            coherence,
            signal,
            self.gate.config().base_confidence,
        ))
    }

    /// Evaluates every catalog output and assembles the inference pack.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] when the run or feature pack is malformed.
    pub fn infer(
        &self,
        run: &Run,
        feature_pack: &FeaturePack,
        evaluated_at: OffsetDateTime,
    ) -> Result<InferencePack, InferenceError> {
        run.validate()?;
        feature_pack.validate()?;
        self.record(run, InferenceAuditKind::InferenceStarted {
            specimen_count: run.specimens.len(),
            catalog_size: self.catalog.len(),
        });

        let availability = resolve_availability(run, feature_pack, evaluated_at);
        let ctx = EstimationContext {
            run,
            feature_pack,
            availability: &availability,
        };
        let mut outcomes: Vec<OutputOutcome> = self
            .catalog
            .definitions()
            .into_par_iter()
            .map(|definition| self.evaluate_output(definition, &ctx))
            .collect();
        outcomes.sort_by(|left, right| left.rationale.output_key.cmp(&right.rationale.output_key));

        for outcome in &outcomes {
            for (engine, error) in &outcome.estimator_failures {
                self.record(run, InferenceAuditKind::EstimatorFailed {
                    output_key: outcome.rationale.output_key.clone(),
                    engine: engine.clone(),
                    error: error.clone(),
                });
            }
            let kind = match &outcome.result {
                OutputResult::Produced {
                    value, ..
                } => InferenceAuditKind::OutputProduced {
                    output_key: value.key.clone(),
                    confidence_0_1: value.confidence_0_1,
                    engine_count: value.engine_sources.len(),
                },
                OutputResult::Suppressed(suppressed) => InferenceAuditKind::OutputSuppressed {
                    output_key: suppressed.key.clone(),
                    reason: suppressed.reason,
                },
            };
            self.record(run, kind);
        }

        let pack = assemble(run, feature_pack, evaluated_at, outcomes);
        self.record(run, InferenceAuditKind::InferenceCompleted {
            status: pack.status,
            produced: pack.measured_values.len() + pack.inferred_values.len(),
            suppressed: pack.suppressed_outputs.len(),
        });
        Ok(pack)
    }

    /// Returns the coherence and signal quality used for an output's domain.
    fn domain_scores(
        &self,
        definition: &OutputDefinition,
        feature_pack: &FeaturePack,
    ) -> (f64, f64) {
        let fallback = self.gate.config().unscored_domain_score;
        (
            feature_pack.coherence(definition.domain).unwrap_or(fallback),
            feature_pack.signal_quality(definition.domain).unwrap_or(fallback),
        )
    }

    /// Evaluates one output end to end.
    fn evaluate_output(
        &self,
        definition: &OutputDefinition,
        ctx: &EstimationContext<'_>,
    ) -> OutputOutcome {
        let (coherence, signal) = self.domain_scores(definition, ctx.feature_pack);
        let GateEvaluation {
            decision,
            mut trace,
        } = self.gate.evaluate(
            definition,
            ctx.availability,
            coherence,
            signal,
            self.gate.config().base_confidence,
        );
        let mut rationale = DependencyRationale {
            output_key: definition.key.clone(),
            status: OutcomeStatus::Suppressed,
            requires_any: definition.requires_any.clone(),
            requires_all: definition.requires_all.clone(),
            missing_dependencies: Vec::new(),
            coherence_score: coherence,
            signal_quality: signal,
            decision_log: Vec::new(),
        };

        let penalties = match decision {
            GateDecision::Suppressed {
                reason,
                detail,
                missing_anchors,
            } => {
                rationale.missing_dependencies.clone_from(&missing_anchors);
                rationale.decision_log = trace;
                return OutputOutcome::suppressed(
                    rationale,
                    definition,
                    reason,
                    detail,
                    missing_anchors,
                    Vec::new(),
                );
            }
            GateDecision::Produced {
                penalties, ..
            } => penalties,
        };

        let mut estimates = Vec::with_capacity(self.estimators.len());
        let mut failures = Vec::new();
        for estimator in &self.estimators {
            match estimator.estimate(definition, ctx) {
                Ok(Some(estimate)) => estimates.push(estimate),
                Ok(None) => {}
                Err(err) => failures.push((estimator.id(), err.to_string())),
            }
        }

        let fused = match fuse(definition, &estimates) {
            Ok(fused) => fused,
            Err(err) => {
                let detail = err.to_string();
                trace.push(GateTraceEntry::new(GateStep::Estimation, false, detail.clone()));
                rationale.decision_log = trace;
                return OutputOutcome::suppressed(
                    rationale,
                    definition,
                    SuppressionReason::InsufficientSignal,
                    detail,
                    Vec::new(),
                    failures,
                );
            }
        };
        trace.push(GateTraceEntry::new(
            GateStep::Estimation,
            true,
            format!("fused {} engine estimates", fused.engines.len()),
        ));

        let anchors = ctx.availability.summarize_anchors(definition);
        let score = self.arbitrator.score(
            ConfidenceComponents {
                completeness: anchors.completeness,
                anchor_quality: anchors.anchor_quality.unwrap_or(1.0),
                recency: self.arbitrator.recency(anchors.oldest_age_hours),
                signal_quality: signal,
                disagreement: fused.disagreement,
            },
            &penalties,
        );

        let specimen_types: Vec<_> = anchors.specimen_types.iter().copied().collect();
        let provenance = ProvenanceEntry {
            output_key: definition.key.clone(),
            specimen_ids: anchors.specimen_ids.into_iter().collect(),
            specimen_types: specimen_types.clone(),
            measured_variables: anchors.measured,
            context_inputs: anchors.contexts,
            feature_pack_drivers: ctx.feature_pack.signal_names(definition.domain),
            engines: fused.engines.clone(),
        };
        let value = InferredValue {
            key: definition.key.clone(),
            value: fused.value,
            range: fused.range,
            unit: definition.unit.clone(),
            confidence_0_1: score.value,
            support_type: definition.support_type,
            provenance: definition.support_type.provenance(),
            source_specimen_types: specimen_types,
            confidence_drivers: score.drivers,
            confidence_penalties: score.penalties,
            engine_sources: fused.engines,
            disagreement: fused.disagreement,
        };
        rationale.status = OutcomeStatus::Produced;
        rationale.decision_log = trace;
        OutputOutcome {
            rationale,
            domain: definition.domain,
            typical_low: definition.typical_range.low,
            typical_high: definition.typical_range.high,
            result: OutputResult::Produced {
                value,
                provenance,
            },
            estimator_failures: failures,
        }
    }

    /// Sends an audit event for the run.
    fn record(&self, run: &Run, kind: InferenceAuditKind) {
        self.audit.record(&InferenceAuditEvent::new(run.run_id.clone(), kind));
    }
}

// ============================================================================
// SECTION: Per-Output Outcome
// ============================================================================

/// Produced or suppressed result for one output.
enum OutputResult {
    /// The output was produced.
    Produced {
        /// Produced value.
        value: InferredValue,
        /// Provenance entry.
        provenance: ProvenanceEntry,
    },
    /// The output was suppressed.
    Suppressed(SuppressedOutput),
}

/// Owned result of evaluating one output.
struct OutputOutcome {
    /// Eligibility rationale.
    rationale: DependencyRationale,
    /// Output domain.
    domain: Domain,
    /// Lower bound of the typical range.
    typical_low: f64,
    /// Upper bound of the typical range.
    typical_high: f64,
    /// Final result.
    result: OutputResult,
    /// Estimator failures as `(engine, message)`.
    estimator_failures: Vec<(EngineId, String)>,
}

impl OutputOutcome {
    /// Builds a suppressed outcome.
    fn suppressed(
        rationale: DependencyRationale,
        definition: &OutputDefinition,
        reason: SuppressionReason,
        detail: String,
        missing_anchors: Vec<InputRef>,
        estimator_failures: Vec<(EngineId, String)>,
    ) -> Self {
        Self {
            rationale,
            domain: definition.domain,
            typical_low: definition.typical_range.low,
            typical_high: definition.typical_range.high,
            result: OutputResult::Suppressed(SuppressedOutput {
                key: definition.key.clone(),
                reason,
                reason_detail: detail,
                missing_anchors,
                confidence_0_1: 0.0,
            }),
            estimator_failures,
        }
    }
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Per-domain accumulator for physiological states.
#[derive(Default)]
struct DomainTally {
    /// Produced outputs in the domain.
    evidence: Vec<OutputKey>,
    /// Outputs above their typical range.
    above: Vec<OutputKey>,
    /// Outputs below their typical range.
    below: Vec<OutputKey>,
    /// Sum of produced confidences.
    confidence_sum: f64,
}

/// Assembles sorted outcomes into the pack.
fn assemble(
    run: &Run,
    feature_pack: &FeaturePack,
    evaluated_at: OffsetDateTime,
    outcomes: Vec<OutputOutcome>,
) -> InferencePack {
    let mut measured_values = Vec::new();
    let mut inferred_values = Vec::new();
    let mut suppressed_outputs = Vec::new();
    let mut eligibility_rationale = Vec::with_capacity(outcomes.len());
    let mut provenance_map = Vec::new();
    let mut tallies: BTreeMap<Domain, DomainTally> = BTreeMap::new();

    for outcome in outcomes {
        eligibility_rationale.push(outcome.rationale);
        match outcome.result {
            OutputResult::Suppressed(suppressed) => suppressed_outputs.push(suppressed),
            OutputResult::Produced {
                value,
                provenance,
            } => {
                let tally = tallies.entry(outcome.domain).or_default();
                tally.evidence.push(value.key.clone());
                tally.confidence_sum += value.confidence_0_1;
                if value.value > outcome.typical_high {
                    tally.above.push(value.key.clone());
                } else if value.value < outcome.typical_low {
                    tally.below.push(value.key.clone());
                }
                provenance_map.push(provenance);
                match value.provenance {
                    ProvenanceType::Measured => measured_values.push(value),
                    ProvenanceType::Inferred => inferred_values.push(value),
                }
            }
        }
    }

    let produced: Vec<f64> = measured_values
        .iter()
        .chain(inferred_values.iter())
        .map(|value| value.confidence_0_1)
        .collect();
    let overall_confidence_0_1 = mean(&produced).unwrap_or(0.0);
    let domains_assessed: Vec<Domain> = tallies.keys().copied().collect();
    let physiological_states =
        tallies.into_iter().map(|(domain, tally)| summarize(domain, tally)).collect();
    let status =
        if suppressed_outputs.is_empty() { PackStatus::Complete } else { PackStatus::Partial };

    InferencePack {
        run_id: run.run_id.clone(),
        schema_version: INFERENCE_PACK_SCHEMA_VERSION.to_string(),
        evaluated_at,
        status,
        measured_values,
        inferred_values,
        suppressed_outputs,
        eligibility_rationale,
        physiological_states,
        overall_confidence_0_1,
        overall_coherence_0_1: overall_coherence(feature_pack),
        domains_assessed,
        specimen_count: run.specimens.len(),
        provenance_map,
    }
}

/// Summarises one domain's produced outputs.
fn summarize(domain: Domain, tally: DomainTally) -> PhysiologicalState {
    let status = match (tally.above.is_empty(), tally.below.is_empty()) {
        (true, true) => DomainStatus::WithinRange,
        (false, true) => DomainStatus::Elevated,
        (true, false) => DomainStatus::Reduced,
        (false, false) => DomainStatus::Mixed,
    };
    let summary = match status {
        DomainStatus::WithinRange => {
            format!("{domain}: {} outputs within typical range", tally.evidence.len())
        }
        DomainStatus::Elevated => format!("{domain}: elevated ({})", join_keys(&tally.above)),
        DomainStatus::Reduced => format!("{domain}: reduced ({})", join_keys(&tally.below)),
        DomainStatus::Mixed => format!(
            "{domain}: mixed (above: {}; below: {})",
            join_keys(&tally.above),
            join_keys(&tally.below)
        ),
    };
    let count = u32::try_from(tally.evidence.len()).unwrap_or(u32::MAX).max(1);
    PhysiologicalState {
        domain,
        status,
        summary,
        confidence_0_1: tally.confidence_sum / f64::from(count),
        evidence: tally.evidence,
    }
}

/// Overall coherence: reported value, else mean of domain scores, else zero.
fn overall_coherence(feature_pack: &FeaturePack) -> f64 {
    feature_pack.overall_coherence.unwrap_or_else(|| {
        let scores: Vec<f64> = feature_pack.domain_coherence.values().copied().collect();
        mean(&scores).unwrap_or(0.0)
    })
}

/// Arithmetic mean, `None` for an empty slice.
fn mean(values: &[f64]) -> Option<f64> {
    let count = u32::try_from(values.len()).ok().filter(|count| *count > 0)?;
    Some(values.iter().sum::<f64>() / f64::from(count))
}

/// Joins output keys with commas.
fn join_keys(keys: &[OutputKey]) -> String {
    keys.iter().map(OutputKey::as_str).collect::<Vec<_>>().join(", ")
}
