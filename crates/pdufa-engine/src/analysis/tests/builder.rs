use super::common::*;
use crate::analysis::{
    BuildError, ContextBuilder, ContextField, FieldProvenance, Form483Severity, InvalidContext,
    Observed, TrialPhase, TrustPolicy, VerificationTier,
};
use crate::facts::{FactEntry, FactRecord, FactValue, ProvenanceTag};

fn record() -> FactRecord {
    FactRecord::new("abcd-2026", "ABCD", "abcimab").with_pdufa_date("2026-04-30")
}

fn clean_record() -> FactRecord {
    let mut record = record();
    let primary = ProvenanceTag::VerifiedPrimary;
    record.set("breakthrough_therapy", FactValue::Bool(true), primary);
    record.set("adcom_held", FactValue::Bool(false), primary);
    record.set("prior_crl", FactValue::Bool(false), primary);
    record.set("trial_phase", FactValue::Text("Phase 3".to_string()), primary);
    record.set("primary_endpoint_met", FactValue::Bool(true), primary);
    record.set("pai_passed", FactValue::Bool(true), primary);
    record.set("warning_letter", FactValue::Bool(false), primary);
    record
}

fn build(record: &FactRecord) -> crate::analysis::AnalysisContext {
    ContextBuilder::default()
        .build(record, analysis_date())
        .expect("record builds")
}

#[test]
fn verified_record_reproduces_the_reference_probability() {
    let context = build(&clean_record());
    assert_eq!(context.pdufa_date, Some(date(2026, 4, 30)));
    assert_eq!(
        context.clinical.trial_phase,
        Observed::Known(TrialPhase::Phase3)
    );

    let result = calculator().calculate(&context).expect("context is valid");
    assert_close(result.probability, 0.85);
}

#[test]
fn inferred_facts_never_reach_the_context() {
    let mut record = record();
    record.set(
        "breakthrough_therapy",
        FactValue::Bool(true),
        ProvenanceTag::InferredDerived,
    );

    let context = build(&record);

    assert!(context.designations.breakthrough_therapy.is_unknown());
    assert!(!context.provenance.contains_key(&ContextField::BreakthroughTherapy));
    assert!(context
        .notes
        .iter()
        .any(|note| note == "breakthrough_therapy rejected: inferred provenance is not trusted"));
}

#[test]
fn not_yet_searched_is_the_same_as_absent() {
    let mut searched_later = record();
    searched_later.insert(
        "primary_endpoint_met",
        FactEntry {
            value: None,
            provenance: ProvenanceTag::NotYetSearched,
            observed_on: None,
            source: None,
        },
    );

    let pending = build(&searched_later);
    let absent = build(&record());
    assert_eq!(pending, absent);

    let calculator = calculator();
    assert_eq!(
        calculator.calculate(&pending),
        calculator.calculate(&absent)
    );
}

#[test]
fn not_applicable_fields_raise_no_warning() {
    let mut record = clean_record();
    record.set_not_applicable("adcom_held");

    let context = build(&record);

    assert_eq!(context.adcom.held, Observed::NotApplicable);
    assert!(context
        .unresolved_warnings()
        .iter()
        .all(|warning| !warning.message.starts_with("adcom_held")));
}

#[test]
fn accepted_facts_carry_their_provenance() {
    let mut record = record();
    record.insert(
        "pai_passed",
        FactEntry::new(FactValue::Bool(true), ProvenanceTag::VerifiedPrimary)
            .observed_on(date(2025, 11, 20))
            .source("FDA establishment inspection report"),
    );
    record.set(
        "orphan_drug",
        FactValue::Text("yes".to_string()),
        ProvenanceTag::SecondaryOnly,
    );

    let context = ContextBuilder::new(TrustPolicy::Standard)
        .build(&record, analysis_date())
        .expect("record builds");

    assert_eq!(
        context.provenance.get(&ContextField::PaiPassed),
        Some(&FieldProvenance {
            tier: VerificationTier::Official,
            observed_on: Some(date(2025, 11, 20)),
        })
    );
    assert_eq!(
        context
            .provenance
            .get(&ContextField::OrphanDrug)
            .map(|provenance| provenance.tier),
        Some(VerificationTier::Secondary)
    );
}

#[test]
fn single_source_facts_need_the_relaxed_policy() {
    let mut record = record();
    record.set(
        "orphan_drug",
        FactValue::Bool(true),
        ProvenanceTag::SecondaryOnly,
    );

    let strict = build(&record);
    let standard = ContextBuilder::new(TrustPolicy::Standard)
        .build(&record, analysis_date())
        .expect("record builds");

    assert!(strict.designations.orphan_drug.is_unknown());
    assert!(standard.designations.orphan_drug.is_true());
}

#[test]
fn uninterpretable_values_become_unknown_with_a_note() {
    let mut record = record();
    let primary = ProvenanceTag::VerifiedPrimary;
    record.set(
        "breakthrough_therapy",
        FactValue::Text("maybe".to_string()),
        primary,
    );
    record.set("adcom_vote_ratio", FactValue::Number(250.0), primary);

    let context = build(&record);

    assert!(context.designations.breakthrough_therapy.is_unknown());
    assert!(context.adcom.vote_ratio.is_unknown());
    assert_eq!(
        context
            .notes
            .iter()
            .filter(|note| note.contains("could not be interpreted"))
            .count(),
        2
    );
}

#[test]
fn observation_counts_are_graded() {
    let mut record = record();
    record.set(
        "form_483_observations",
        FactValue::Integer(4),
        ProvenanceTag::VerifiedPrimary,
    );

    let context = build(&record);

    assert_eq!(
        context.manufacturing.form_483_severity,
        Observed::Known(Form483Severity::Moderate)
    );
}

#[test]
fn clean_form_483_is_not_a_penalty_or_a_note() {
    let mut record = clean_record();
    record.set(
        "form_483_observations",
        FactValue::Integer(0),
        ProvenanceTag::VerifiedPrimary,
    );

    let context = build(&record);

    assert_eq!(
        context.manufacturing.form_483_severity,
        Observed::Known(Form483Severity::NoObservations)
    );
    assert!(context
        .notes
        .iter()
        .all(|note| !note.contains("form_483_severity")));

    let result = calculator().calculate(&context).expect("context is valid");
    assert!(result.factor("fda_483_observations").is_none());
    assert_close(result.probability, 0.85);
}

#[test]
fn fractional_vote_ratio_above_one_is_not_rescaled() {
    let mut record = record();
    record.set(
        "adcom_vote_ratio",
        FactValue::Text("1.5".to_string()),
        ProvenanceTag::VerifiedPrimary,
    );

    let context = build(&record);

    assert!(context.adcom.vote_ratio.is_unknown());
    assert!(context
        .notes
        .iter()
        .any(|note| note.contains("adcom_vote_ratio") && note.contains("could not be interpreted")));
}

#[test]
fn unrecognized_keys_are_ignored() {
    let mut with_extra = clean_record();
    with_extra.set(
        "analyst_sentiment",
        FactValue::Text("bullish".to_string()),
        ProvenanceTag::VerifiedPrimary,
    );
    assert_eq!(build(&with_extra), build(&clean_record()));
}

#[test]
fn unreadable_decision_date_fails_the_build() {
    let record = record().with_pdufa_date("sometime in Q2");
    match ContextBuilder::default().build(&record, analysis_date()) {
        Err(BuildError::InvalidDecisionDate { event_id, raw }) => {
            assert_eq!(event_id, "abcd-2026");
            assert_eq!(raw, "sometime in Q2");
        }
        other => panic!("expected invalid date, got {other:?}"),
    }
}

#[test]
fn missing_decision_date_is_rejected_by_the_calculator() {
    let record = FactRecord::new("abcd-2026", "ABCD", "abcimab");
    let context = build(&record);
    assert_eq!(context.pdufa_date, None);
    assert_eq!(
        calculator().calculate(&context),
        Err(InvalidContext::MissingDecisionDate)
    );
}
