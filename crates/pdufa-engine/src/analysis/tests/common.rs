use std::sync::Arc;

use chrono::NaiveDate;

use crate::analysis::layers::Layer;
use crate::analysis::{
    AnalysisContext, AnalysisResult, FactorRegistry, Observed, ProbabilityCalculator, TrialPhase,
};
use crate::config::constants::CalculatorConfig;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn analysis_date() -> NaiveDate {
    date(2026, 1, 15)
}

/// Identity only; every fact unknown.
pub(super) fn blank_context() -> AnalysisContext {
    AnalysisContext::new("ABCD", "abcimab", date(2026, 4, 30), analysis_date())
}

/// Phase 3 original application with a clean record: BTD, no AdCom, no CRL,
/// endpoint met, inspection passed, no warning letter.
pub(super) fn clean_phase3_context() -> AnalysisContext {
    let mut context = blank_context();
    context.designations.breakthrough_therapy = Observed::Known(true);
    context.adcom.held = Observed::Known(false);
    context.crl.prior_crl = Observed::Known(false);
    context.clinical.trial_phase = Observed::Known(TrialPhase::Phase3);
    context.clinical.primary_endpoint_met = Observed::Known(true);
    context.manufacturing.pai_passed = Observed::Known(true);
    context.manufacturing.warning_letter = Observed::Known(false);
    context
}

pub(super) fn registry() -> Arc<FactorRegistry> {
    Arc::new(FactorRegistry::with_defaults(CalculatorConfig::default()).expect("defaults register"))
}

pub(super) fn calculator() -> ProbabilityCalculator {
    ProbabilityCalculator::new(registry())
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn applied_in_layer(result: &AnalysisResult, layer: Layer) -> f64 {
    result
        .factors
        .iter()
        .filter(|factor| factor.layer == layer && factor.is_applied())
        .map(|factor| factor.adjustment)
        .sum()
}
