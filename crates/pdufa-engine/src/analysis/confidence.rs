use serde::{Deserialize, Serialize};

use super::context::{AnalysisContext, ContextField, FieldState, VerificationTier};
use super::result::{Warning, WarningSeverity};
use crate::config::constants::ConfidenceWeights;

/// Credit for a known field whose source was not recorded, such as a context
/// assembled directly in code.
const UNTRACKED_CREDIT: f64 = 0.5;

/// How far to trust a probability, separate from the probability itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub score: f64,
    /// Share of consumed fields backed by verified sources.
    pub verification: f64,
    pub recency: f64,
    /// One minus the weighted warning load.
    pub warnings: f64,
}

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ConfidenceWeights,
}

impl ConfidenceScorer {
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, context: &AnalysisContext, warnings: &[Warning]) -> ConfidenceScore {
        let verification = verification_coverage(context);
        let recency = recency(context);
        let warning_component = warning_component(warnings);

        let weights = &self.weights;
        let total = weights.verification + weights.recency + weights.warnings;
        let blended = if total > 0.0 {
            (weights.verification * verification
                + weights.recency * recency
                + weights.warnings * warning_component)
                / total
        } else {
            0.0
        };

        ConfidenceScore {
            score: blended.clamp(0.0, 1.0),
            verification,
            recency,
            warnings: warning_component,
        }
    }
}

fn verification_coverage(context: &AnalysisContext) -> f64 {
    let mut consumed = 0usize;
    let mut credit = 0.0;
    for field in ContextField::ALL {
        match context.state_of(field) {
            FieldState::NotApplicable => continue,
            FieldState::Unknown => consumed += 1,
            FieldState::Known => {
                consumed += 1;
                credit += match context.provenance.get(&field).map(|p| p.tier) {
                    Some(VerificationTier::Official | VerificationTier::CrossVerified) => 1.0,
                    Some(VerificationTier::Secondary) => 0.5,
                    Some(VerificationTier::Inferred) => 0.0,
                    None => UNTRACKED_CREDIT,
                };
            }
        }
    }
    if consumed == 0 {
        return 0.0;
    }
    credit / consumed as f64
}

/// Mean freshness of dated facts, discounted once the decision date has
/// passed. Unverified facts age faster.
fn recency(context: &AnalysisContext) -> f64 {
    let scores: Vec<f64> = context
        .provenance
        .iter()
        .filter(|(field, _)| context.state_of(**field) == FieldState::Known)
        .filter_map(|(_, provenance)| {
            let observed = provenance.observed_on?;
            let age = context.days_since(observed).max(0);
            let score = if provenance.tier.is_verified() {
                match age {
                    0..=365 => 1.0,
                    366..=730 => 0.9,
                    _ => 0.8,
                }
            } else {
                match age {
                    0..=90 => 1.0,
                    91..=365 => 0.8,
                    _ => 0.6,
                }
            };
            Some(score)
        })
        .collect();

    let freshness = if scores.is_empty() {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    if context.decision_passed() {
        freshness * 0.5
    } else {
        freshness
    }
}

fn warning_component(warnings: &[Warning]) -> f64 {
    let load: f64 = warnings
        .iter()
        .map(|warning| match warning.severity {
            WarningSeverity::Info => 0.02,
            WarningSeverity::Minor => 0.05,
            WarningSeverity::Major => 0.12,
        })
        .sum();
    (1.0 - load).max(0.0)
}
