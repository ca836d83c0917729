use std::fmt;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::confidence::ConfidenceScore;
use super::layers::Layer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Minor,
    Major,
}

impl WarningSeverity {
    pub fn label(self) -> &'static str {
        match self {
            WarningSeverity::Info => "info",
            WarningSeverity::Minor => "minor",
            WarningSeverity::Major => "major",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub severity: WarningSeverity,
    pub message: String,
}

impl Warning {
    pub fn new(severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Info, message)
    }

    pub fn minor(message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Minor, message)
    }

    pub fn major(message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Major, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.label(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FactorOutcome {
    Applied,
    /// Condition held but another member of the same group won.
    Suppressed { winner: String },
    /// Rule raised an error and was treated as neutral.
    Failed { error: String },
    /// Condition did not hold. Only single-factor simulation reports this;
    /// a full calculation leaves such factors out of the trace.
    NotTriggered,
}

/// One audited step of the calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorResult {
    pub name: String,
    pub layer: Layer,
    pub adjustment: f64,
    pub reason: String,
    pub probability_before: f64,
    pub probability_after: f64,
    pub outcome: FactorOutcome,
}

impl FactorResult {
    pub fn is_applied(&self) -> bool {
        self.outcome == FactorOutcome::Applied
    }

    /// The factor's condition held, whether or not its adjustment survived
    /// grouping.
    pub fn held(&self) -> bool {
        matches!(
            self.outcome,
            FactorOutcome::Applied | FactorOutcome::Suppressed { .. }
        )
    }

    pub fn is_bonus(&self) -> bool {
        self.is_applied() && self.layer.is_adjustment_layer() && self.adjustment > 0.0
    }

    pub fn is_penalty(&self) -> bool {
        self.is_applied() && self.layer.is_adjustment_layer() && self.adjustment < 0.0
    }
}

/// Net movement produced by one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub layer: Layer,
    pub probability_in: f64,
    pub probability_out: f64,
    pub net_adjustment: f64,
    pub applied: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Outcome of one calculation: the probability and everything needed to audit
/// how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub drug_name: String,
    pub pdufa_date: Option<NaiveDate>,
    pub analysis_date: NaiveDate,
    pub probability: f64,
    pub base_probability: f64,
    pub base_rationale: String,
    pub factors: Vec<FactorResult>,
    pub confidence: ConfidenceScore,
    pub warnings: Vec<Warning>,
}

impl AnalysisResult {
    pub fn confidence_score(&self) -> f64 {
        self.confidence.score
    }

    pub fn factor(&self, name: &str) -> Option<&FactorResult> {
        self.factors.iter().find(|result| result.name == name)
    }

    pub fn applied_factors(&self) -> impl Iterator<Item = &FactorResult> {
        self.factors.iter().filter(|result| result.is_applied())
    }

    pub fn total_bonus(&self) -> f64 {
        self.factors
            .iter()
            .filter(|result| result.is_bonus())
            .map(|result| result.adjustment)
            .sum()
    }

    pub fn total_penalty(&self) -> f64 {
        self.factors
            .iter()
            .filter(|result| result.is_penalty())
            .map(|result| result.adjustment)
            .sum()
    }

    pub fn layer_summaries(&self) -> Vec<LayerSummary> {
        Layer::ORDER
            .iter()
            .filter_map(|layer| {
                let entries: Vec<&FactorResult> = self
                    .factors
                    .iter()
                    .filter(|result| result.layer == *layer)
                    .collect();
                let first = entries.first()?;
                let last = entries.last()?;
                Some(LayerSummary {
                    layer: *layer,
                    probability_in: first.probability_before,
                    probability_out: last.probability_after,
                    net_adjustment: entries
                        .iter()
                        .filter(|result| result.is_applied())
                        .map(|result| result.adjustment)
                        .sum(),
                    applied: entries.iter().filter(|result| result.is_applied()).count(),
                    suppressed: entries
                        .iter()
                        .filter(|result| {
                            matches!(result.outcome, FactorOutcome::Suppressed { .. })
                        })
                        .count(),
                    failed: entries
                        .iter()
                        .filter(|result| matches!(result.outcome, FactorOutcome::Failed { .. }))
                        .count(),
                })
            })
            .collect()
    }

    /// One-line digest used in batch listings and logs.
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} (confidence {:.2}, {} factors, {} warnings)",
            self.ticker,
            self.drug_name,
            percent(self.probability),
            self.confidence.score,
            self.applied_factors().count(),
            self.warnings.len()
        )
    }

    /// Human-readable walk through the trace, in evaluation order.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let decision = self
            .pdufa_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            out,
            "{} ({}) PDUFA {} as of {}",
            self.ticker, self.drug_name, decision, self.analysis_date
        );
        let _ = writeln!(
            out,
            "Approval probability: {} (confidence {:.2})",
            percent(self.probability),
            self.confidence.score
        );
        let _ = writeln!(
            out,
            "Base rate: {} ({})",
            percent(self.base_probability),
            self.base_rationale
        );

        for summary in self.layer_summaries() {
            if summary.layer == Layer::Base {
                continue;
            }
            let _ = writeln!(
                out,
                "{}: {} -> {}",
                summary.layer.label(),
                signed_points(summary.net_adjustment),
                percent(summary.probability_out)
            );
            for result in self.factors.iter().filter(|r| r.layer == summary.layer) {
                let line = match &result.outcome {
                    FactorOutcome::Applied => format!(
                        "  {} {}: {}",
                        result.name,
                        signed_points(result.adjustment),
                        result.reason
                    ),
                    FactorOutcome::Suppressed { winner } => {
                        format!("  {} (suppressed by {winner}): {}", result.name, result.reason)
                    }
                    FactorOutcome::Failed { error } => {
                        format!("  {} failed and was ignored: {error}", result.name)
                    }
                    FactorOutcome::NotTriggered => format!("  {} did not apply", result.name),
                };
                let _ = writeln!(out, "{line}");
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "Warnings:");
            for warning in &self.warnings {
                let _ = writeln!(out, "  {warning}");
            }
        }

        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

pub(crate) fn signed_points(adjustment: f64) -> String {
    format!("{:+.1}%", adjustment * 100.0)
}
