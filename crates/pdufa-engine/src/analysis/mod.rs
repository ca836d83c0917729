//! Probability analysis: context model, factor registry, calculator and the
//! batch/backtest drivers built on top of it.

mod backtest;
mod batch;
mod builder;
mod calculator;
mod confidence;
mod context;
pub mod layers;
mod registry;
mod result;

pub use backtest::{
    compute_metrics, run_backtest, BacktestCase, BacktestMetrics, BacktestReport,
    CalibrationBucket, Prediction,
};
pub use batch::{BatchError, BatchItem, BatchReport, BatchRunner};
pub use builder::{parse_date, Admission, BuildError, ContextBuilder, TrustPolicy};
pub use calculator::ProbabilityCalculator;
pub use confidence::{ConfidenceScore, ConfidenceScorer};
pub use context::{
    AdComOutcome, AdComRecord, AnalysisContext, CitizenPetition, ClinicalEvidence, ContextField,
    CrlCategory, CrlHistory, Designations, DisputeOutcome, DisputeRecord, EarningsCallSignals,
    FieldProvenance, FieldState, Form483Severity, InvalidContext, ManagementTone,
    ManufacturingRecord, MentalHealthIndication, Observed, PetitionStatus, ResubmissionClass,
    SpaStatus, SpecialFlags, TrialPhase, TrialRegion, VerificationTier,
};
pub use layers::{active_ceiling, CapTier, InteractionFactor, Layer};
pub use registry::{
    resolve_group, Adjustment, Factor, FactorGroup, FactorInfo, FactorRegistry, FactorRule,
    GroupCandidate, GroupPolicy, LayerPass, RegistryError, RegistrySnapshot, Resolution, RuleError,
    RuleFn, RuleInput, RuleOutcome,
};
pub use result::{
    AnalysisResult, FactorOutcome, FactorResult, LayerSummary, Warning, WarningSeverity,
};

#[cfg(test)]
mod tests;
