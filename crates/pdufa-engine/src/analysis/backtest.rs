//! Scores the engine against historical decisions with known outcomes.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::calculator::ProbabilityCalculator;
use super::context::AnalysisContext;
use crate::facts::EventOutcome;

#[derive(Debug, Clone)]
pub struct BacktestCase {
    pub id: String,
    pub context: AnalysisContext,
    pub outcome: EventOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub ticker: String,
    pub probability: f64,
    pub confidence: f64,
    pub outcome: EventOutcome,
}

impl Prediction {
    fn approved(&self) -> bool {
        self.outcome == EventOutcome::Approved
    }
}

/// Share of approvals among predictions falling in one probability band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_probability: f64,
    pub approval_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub threshold: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub brier_score: f64,
    /// Absent when only one outcome class is present.
    pub roc_auc: Option<f64>,
    /// Mean probability of approved events minus that of rejected events.
    pub separation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub predictions: Vec<Prediction>,
    /// Cases the calculator refused, with the reason.
    pub skipped: Vec<(String, String)>,
    pub metrics: BacktestMetrics,
    pub calibration: Vec<CalibrationBucket>,
}

const BUCKET_EDGES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

pub fn run_backtest(
    calculator: &ProbabilityCalculator,
    cases: &[BacktestCase],
    threshold: f64,
) -> BacktestReport {
    let mut predictions = Vec::with_capacity(cases.len());
    let mut skipped = Vec::new();
    for case in cases {
        match calculator.calculate(&case.context) {
            Ok(result) => predictions.push(Prediction {
                id: case.id.clone(),
                ticker: result.ticker,
                probability: result.probability,
                confidence: result.confidence.score,
                outcome: case.outcome,
            }),
            Err(err) => {
                warn!(case = %case.id, error = %err, "backtest case skipped");
                skipped.push((case.id.clone(), err.to_string()));
            }
        }
    }

    let metrics = compute_metrics(&predictions, threshold);
    let calibration = calibration(&predictions);
    info!(
        cases = metrics.total,
        accuracy = metrics.accuracy,
        brier = metrics.brier_score,
        "backtest complete"
    );
    BacktestReport {
        predictions,
        skipped,
        metrics,
        calibration,
    }
}

pub fn compute_metrics(predictions: &[Prediction], threshold: f64) -> BacktestMetrics {
    let total = predictions.len();
    let approved = predictions.iter().filter(|p| p.approved()).count();

    let mut confusion = [0usize; 4];
    for prediction in predictions {
        let predicted = prediction.probability >= threshold;
        let index = match (predicted, prediction.approved()) {
            (true, true) => 0,
            (true, false) => 1,
            (false, false) => 2,
            (false, true) => 3,
        };
        confusion[index] += 1;
    }
    let [tp, fp, tn, fn_] = confusion;

    let ratio = |numerator: usize, denominator: usize| {
        if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64
        }
    };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let brier_score = if total == 0 {
        0.0
    } else {
        predictions
            .iter()
            .map(|p| {
                let actual = if p.approved() { 1.0 } else { 0.0 };
                (p.probability - actual).powi(2)
            })
            .sum::<f64>()
            / total as f64
    };

    let mean = |approved_side: bool| {
        let values: Vec<f64> = predictions
            .iter()
            .filter(|p| p.approved() == approved_side)
            .map(|p| p.probability)
            .collect();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    };
    let separation = match (mean(true), mean(false)) {
        (Some(approved_mean), Some(rejected_mean)) => Some(approved_mean - rejected_mean),
        _ => None,
    };

    BacktestMetrics {
        total,
        approved,
        rejected: total - approved,
        threshold,
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fn_,
        accuracy: ratio(tp + tn, total),
        precision,
        recall,
        f1,
        brier_score,
        roc_auc: roc_auc(predictions),
        separation,
    }
}

/// Probability that a random approved event outscored a random rejected one,
/// with ties counted as half.
fn roc_auc(predictions: &[Prediction]) -> Option<f64> {
    let positives: Vec<f64> = predictions
        .iter()
        .filter(|p| p.approved())
        .map(|p| p.probability)
        .collect();
    let negatives: Vec<f64> = predictions
        .iter()
        .filter(|p| !p.approved())
        .map(|p| p.probability)
        .collect();
    if positives.is_empty() || negatives.is_empty() {
        return None;
    }

    let wins: f64 = positives
        .iter()
        .map(|positive| {
            negatives
                .iter()
                .map(|negative| match positive.total_cmp(negative) {
                    std::cmp::Ordering::Greater => 1.0,
                    std::cmp::Ordering::Equal => 0.5,
                    std::cmp::Ordering::Less => 0.0,
                })
                .sum::<f64>()
        })
        .sum();
    Some(wins / (positives.len() * negatives.len()) as f64)
}

fn calibration(predictions: &[Prediction]) -> Vec<CalibrationBucket> {
    BUCKET_EDGES
        .windows(2)
        .filter_map(|edges| {
            let (lower, upper) = (edges[0], edges[1]);
            let members: Vec<&Prediction> = predictions
                .iter()
                .filter(|p| {
                    p.probability >= lower && (p.probability < upper || upper >= 1.0)
                })
                .collect();
            if members.is_empty() {
                return None;
            }
            let count = members.len();
            Some(CalibrationBucket {
                lower,
                upper,
                count,
                mean_probability: members.iter().map(|p| p.probability).sum::<f64>()
                    / count as f64,
                approval_rate: members.iter().filter(|p| p.approved()).count() as f64
                    / count as f64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: &str, probability: f64, outcome: EventOutcome) -> Prediction {
        Prediction {
            id: id.to_string(),
            ticker: id.to_uppercase(),
            probability,
            confidence: 0.6,
            outcome,
        }
    }

    #[test]
    fn perfect_ranking_scores_full_auc() {
        let predictions = vec![
            prediction("a", 0.85, EventOutcome::Approved),
            prediction("b", 0.70, EventOutcome::Approved),
            prediction("c", 0.30, EventOutcome::Crl),
            prediction("d", 0.10, EventOutcome::Crl),
        ];
        let metrics = compute_metrics(&predictions, 0.5);
        assert_eq!(metrics.roc_auc, Some(1.0));
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.f1, 1.0);
        assert_eq!(metrics.true_positives, 2);
        assert_eq!(metrics.true_negatives, 2);
        let separation = metrics.separation.expect("both classes present");
        assert!((separation - 0.575).abs() < 1e-9);
    }

    #[test]
    fn confusion_counts_follow_threshold() {
        let predictions = vec![
            prediction("a", 0.55, EventOutcome::Crl),
            prediction("b", 0.45, EventOutcome::Approved),
        ];
        let metrics = compute_metrics(&predictions, 0.5);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.roc_auc, Some(0.0));
        assert!((metrics.brier_score - 0.3025).abs() < 1e-9);
    }

    #[test]
    fn single_class_has_no_auc() {
        let predictions = vec![prediction("a", 0.7, EventOutcome::Approved)];
        let metrics = compute_metrics(&predictions, 0.5);
        assert_eq!(metrics.roc_auc, None);
        assert_eq!(metrics.separation, None);
    }

    #[test]
    fn calibration_groups_by_band() {
        let predictions = vec![
            prediction("a", 0.85, EventOutcome::Approved),
            prediction("b", 0.82, EventOutcome::Crl),
            prediction("c", 0.15, EventOutcome::Crl),
        ];
        let buckets = calibration(&predictions);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].lower, 0.0);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 2);
        assert!((buckets[1].approval_rate - 0.5).abs() < 1e-12);
    }
}
