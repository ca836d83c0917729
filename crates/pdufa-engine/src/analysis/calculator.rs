use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::confidence::ConfidenceScorer;
use super::context::{AnalysisContext, InvalidContext};
use super::layers::Layer;
use super::registry::{FactorRegistry, RegistryError};
use super::result::{percent, AnalysisResult, FactorOutcome, FactorResult, Warning};
use crate::config::constants::CalculatorConfig;

/// Runs every registered layer over a context and assembles the audited
/// result. Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct ProbabilityCalculator {
    registry: Arc<FactorRegistry>,
}

impl ProbabilityCalculator {
    pub fn new(registry: Arc<FactorRegistry>) -> Self {
        Self { registry }
    }

    /// Calculator over the stock factor set.
    pub fn with_defaults(config: CalculatorConfig) -> Result<Self, RegistryError> {
        Ok(Self::new(Arc::new(FactorRegistry::with_defaults(config)?)))
    }

    pub fn registry(&self) -> &Arc<FactorRegistry> {
        &self.registry
    }

    pub fn calculate(&self, context: &AnalysisContext) -> Result<AnalysisResult, InvalidContext> {
        context.validate_identity()?;

        let snapshot = self.registry.snapshot();
        let config = snapshot.config();
        let mut warnings = context.unresolved_warnings();
        let mut trace: Vec<FactorResult> = Vec::new();
        let mut probability = 0.0;
        let mut base_probability = 0.0;
        let mut base_rationale = String::new();

        for layer in Layer::ORDER {
            probability =
                snapshot.apply_layer(layer, context, probability, &mut trace, &mut warnings);
            if layer != Layer::Base {
                continue;
            }

            match trace
                .iter()
                .find(|result| result.layer == Layer::Base && result.is_applied())
            {
                Some(base) => base_rationale = base.reason.clone(),
                None => {
                    let fallback = config.base_rates.most_conservative();
                    base_rationale = format!(
                        "no base state could be established; most conservative rate {}",
                        percent(fallback)
                    );
                    warnings.push(Warning::major(base_rationale.clone()));
                    trace.push(FactorResult {
                        name: "base_rate_fallback".to_string(),
                        layer: Layer::Base,
                        adjustment: fallback - probability,
                        reason: base_rationale.clone(),
                        probability_before: probability,
                        probability_after: fallback,
                        outcome: FactorOutcome::Applied,
                    });
                    probability = fallback;
                }
            }
            base_probability = probability;
        }

        let bounded = config.bounds.clamp(probability);
        if bounded != probability {
            debug!(raw = probability, bounded, "probability clamped to global bounds");
            trace.push(FactorResult {
                name: "probability_bounds".to_string(),
                layer: Layer::Cap,
                adjustment: bounded - probability,
                reason: format!(
                    "held within global bounds {} to {}",
                    percent(config.bounds.min),
                    percent(config.bounds.max)
                ),
                probability_before: probability,
                probability_after: bounded,
                outcome: FactorOutcome::Applied,
            });
        }

        dedup_warnings(&mut warnings);
        let confidence = ConfidenceScorer::new(config.confidence.clone()).score(context, &warnings);

        let result = AnalysisResult {
            ticker: context.ticker.clone(),
            drug_name: context.drug_name.clone(),
            pdufa_date: context.pdufa_date,
            analysis_date: context.analysis_date,
            probability: bounded,
            base_probability,
            base_rationale,
            factors: trace,
            confidence,
            warnings,
        };

        info!(
            ticker = %result.ticker,
            drug = %result.drug_name,
            probability = result.probability,
            confidence = result.confidence.score,
            warnings = result.warnings.len(),
            "analysis complete"
        );
        Ok(result)
    }

    /// What-if analysis: the base context plus named variants of it. Results
    /// are keyed by scenario name, with the base under `"base"`.
    pub fn calculate_scenarios(
        &self,
        base: &AnalysisContext,
        scenarios: &BTreeMap<String, AnalysisContext>,
    ) -> Result<BTreeMap<String, AnalysisResult>, InvalidContext> {
        let mut results = BTreeMap::new();
        results.insert("base".to_string(), self.calculate(base)?);
        for (name, context) in scenarios {
            results.insert(name.clone(), self.calculate(context)?);
        }
        Ok(results)
    }

    /// Applies a single registered factor once to `probability`, for
    /// debugging one rule in isolation. Failures and non-finite adjustments
    /// come back as neutral `Failed` results, exactly as in a full run.
    pub fn simulate_factor(
        &self,
        context: &AnalysisContext,
        name: &str,
        probability: f64,
    ) -> Option<FactorResult> {
        let mut warnings = Vec::new();
        let result = self
            .registry
            .snapshot()
            .simulate_factor(name, context, probability, &mut warnings)?;
        debug!(
            factor = name,
            before = result.probability_before,
            after = result.probability_after,
            warnings = warnings.len(),
            "factor simulated"
        );
        Some(result)
    }
}

fn dedup_warnings(warnings: &mut Vec<Warning>) {
    let mut seen = std::collections::BTreeSet::new();
    warnings.retain(|warning| seen.insert((warning.severity, warning.message.clone())));
}
