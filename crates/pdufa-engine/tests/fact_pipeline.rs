use std::sync::Arc;

use chrono::NaiveDate;
use pdufa_engine::analysis::{
    run_backtest, BacktestCase, ContextBuilder, FactorRegistry, ProbabilityCalculator, TrustPolicy,
    VerificationTier,
};
use pdufa_engine::facts::{
    EventOutcome, FactRecord, FactStore, FactStoreError, FactValue, InMemoryFactStore,
    ProvenanceTag,
};
use pdufa_engine::CalculatorConfig;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date")
}

fn calculator() -> ProbabilityCalculator {
    let registry = FactorRegistry::with_defaults(CalculatorConfig::default())
        .expect("stock factors register");
    ProbabilityCalculator::new(Arc::new(registry))
}

const STRONG_RECORD: &str = r#"{
    "event_id": "abcd-2026",
    "ticker": "ABCD",
    "drug_name": "abcimab",
    "pdufa_date": "April 30, 2026",
    "facts": {
        "breakthrough_therapy": { "value": true, "provenance": "verified_primary", "observed_on": "2025-03-02" },
        "trial_phase": { "value": "phase 3", "provenance": "verified_primary" },
        "primary_endpoint_met": { "value": "yes", "provenance": "cross_verified_secondary" },
        "pai_passed": { "value": true, "provenance": "secondary_only", "source": "company press release" },
        "prior_crl": { "value": false, "provenance": "verified_primary" },
        "adcom_held": { "provenance": "not_applicable" },
        "warning_letter": { "value": false, "provenance": "verified_primary" },
        "orphan_drug": { "value": true, "provenance": "inferred_derived" }
    },
    "outcome": "approved"
}"#;

fn weak_record() -> FactRecord {
    let mut record =
        FactRecord::new("efgh-2025", "EFGH", "efgostat").with_pdufa_date("2025-11-02");
    let primary = ProvenanceTag::VerifiedPrimary;
    record.set("trial_phase", FactValue::Text("Phase 3".to_string()), primary);
    record.set("primary_endpoint_met", FactValue::Bool(false), primary);
    record.set("warning_letter", FactValue::Bool(true), primary);
    record.set("warning_letter_date", FactValue::Text("2025-08-14".to_string()), primary);
    record.outcome = Some(EventOutcome::Crl);
    record
}

fn store() -> InMemoryFactStore {
    let store = InMemoryFactStore::new();
    store.insert(serde_json::from_str(STRONG_RECORD).expect("record parses"));
    store.insert(weak_record());
    store
}

#[test]
fn stored_record_flows_through_to_an_audited_result() {
    let store = store();
    let record = store.load("abcd-2026").expect("record stored");
    let context = ContextBuilder::new(TrustPolicy::Standard)
        .build(&record, as_of())
        .expect("record builds");

    assert!(context.designations.orphan_drug.is_unknown());
    assert!(context.adcom.held.state() == pdufa_engine::analysis::FieldState::NotApplicable);

    let result = calculator().calculate(&context).expect("context is valid");
    assert!((result.probability - 0.85).abs() < 1e-9);
    assert!(result
        .warnings
        .iter()
        .any(|warning| warning.message.contains("orphan_drug rejected")));
}

#[test]
fn default_policy_drops_single_source_facts() {
    let store = store();
    let record = store.load("abcd-2026").expect("record stored");
    let calculator = calculator();

    let standard = ContextBuilder::new(TrustPolicy::Standard)
        .build(&record, as_of())
        .expect("record builds");
    let strict = ContextBuilder::default()
        .build(&record, as_of())
        .expect("record builds");
    assert_eq!(
        standard
            .provenance
            .get(&pdufa_engine::analysis::ContextField::PaiPassed)
            .map(|provenance| provenance.tier),
        Some(VerificationTier::Secondary)
    );
    assert!(strict.manufacturing.pai_passed.is_unknown());

    let standard = calculator.calculate(&standard).expect("context is valid");
    let strict = calculator.calculate(&strict).expect("context is valid");
    assert!(strict.probability < standard.probability);
    assert!(strict.confidence.score < standard.confidence.score);
}

#[test]
fn missing_events_are_reported() {
    match store().load("zzzz-2030") {
        Err(FactStoreError::NotFound(id)) => assert_eq!(id, "zzzz-2030"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn backtest_over_stored_outcomes() {
    let store = store();
    let builder = ContextBuilder::default();
    let cases: Vec<BacktestCase> = store
        .event_ids()
        .expect("ids listed")
        .into_iter()
        .map(|id| {
            let record = store.load(&id).expect("record stored");
            BacktestCase {
                id,
                context: builder.build(&record, as_of()).expect("record builds"),
                outcome: record.outcome.expect("historical outcome"),
            }
        })
        .collect();

    let report = run_backtest(&calculator(), &cases, 0.5);

    assert!(report.skipped.is_empty());
    assert_eq!(report.metrics.total, 2);
    assert_eq!(report.metrics.accuracy, 1.0);
    assert_eq!(report.metrics.roc_auc, Some(1.0));
    assert!(report.metrics.brier_score < 0.05);
}
