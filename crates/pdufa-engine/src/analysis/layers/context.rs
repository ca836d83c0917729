//! Combination effects. Each configured interaction becomes one factor that
//! reads the trace built by the earlier layers.

use std::sync::Arc;

use crate::analysis::context::AnalysisContext;
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, FactorRule, RuleInput, RuleOutcome};
use crate::analysis::result::percent;
use crate::config::constants::{InteractionEffect, InteractionRule};

pub(super) fn factors(rules: &[InteractionRule]) -> Vec<Factor> {
    rules
        .iter()
        .zip(1..)
        .map(|(rule, position)| InteractionFactor::new(rule.clone()).into_factor(position * 10))
        .collect()
}

/// Interaction rule evaluated against the factors that held earlier in the
/// calculation.
#[derive(Debug, Clone)]
pub struct InteractionFactor {
    rule: InteractionRule,
}

impl InteractionFactor {
    pub fn new(rule: InteractionRule) -> Self {
        Self { rule }
    }

    pub fn into_factor(self, order: i32) -> Factor {
        let name = self.rule.name.clone();
        let description = self.rule.description.clone();
        Factor::new(name, Layer::Context, order, Arc::new(self)).describe(description)
    }

    fn triggered(&self, input: &RuleInput<'_>) -> bool {
        self.rule
            .requires
            .iter()
            .all(|requirement| requirement.names().iter().any(|name| input.held(name)))
    }
}

impl FactorRule for InteractionFactor {
    fn evaluate(&self, _context: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
        if !self.triggered(input) {
            return Ok(None);
        }

        match &self.rule.effect {
            InteractionEffect::Bonus { value } => Ok(Some(Adjustment::bonus(
                *value,
                format!("{} interaction", self.rule.name),
            ))),
            InteractionEffect::PenaltyReduction { fraction } => {
                let penalties: f64 = input
                    .trace
                    .iter()
                    .filter(|result| result.is_penalty())
                    .map(|result| result.adjustment)
                    .sum();
                let refund = penalties.abs() * fraction;
                if refund <= f64::EPSILON {
                    return Ok(None);
                }
                Ok(Some(Adjustment::bonus(
                    refund,
                    format!(
                        "{} interaction refunds {} of {} in penalties",
                        self.rule.name,
                        percent(*fraction),
                        percent(penalties.abs())
                    ),
                )))
            }
            InteractionEffect::PenaltyAmplification { fraction, targets } => {
                let penalties: f64 = input
                    .trace
                    .iter()
                    .filter(|result| result.is_penalty() && targets.contains(&result.name))
                    .map(|result| result.adjustment)
                    .sum();
                let extra = penalties.abs() * fraction;
                if extra <= f64::EPSILON {
                    return Ok(None);
                }
                Ok(Some(Adjustment::penalty(
                    extra,
                    format!(
                        "{} interaction deepens combined penalties by {}",
                        self.rule.name,
                        percent(*fraction)
                    ),
                )))
            }
        }
    }
}
