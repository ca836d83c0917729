use super::common::*;
use crate::analysis::layers::Layer;
use crate::analysis::{
    AnalysisContext, Factor, FactorOutcome, FactorRegistry, GroupPolicy, ProbabilityCalculator,
    RegistryError, RuleError, RuleInput, RuleOutcome, WarningSeverity,
};
use crate::config::constants::CalculatorConfig;

fn broken_rule(_: &AnalysisContext, _: &RuleInput<'_>) -> RuleOutcome {
    Err(RuleError::Failed("upstream feed returned garbage".to_string()))
}

fn never_fires(_: &AnalysisContext, _: &RuleInput<'_>) -> RuleOutcome {
    Ok(None)
}

#[test]
fn stock_registry_covers_every_layer_in_order() {
    let registry = registry();
    let listed = registry.list();

    for layer in Layer::ORDER {
        assert!(
            listed.iter().any(|info| info.layer == layer),
            "no factor registered for {layer}"
        );
    }
    assert!(listed
        .windows(2)
        .all(|pair| (pair[0].layer, pair[0].order) <= (pair[1].layer, pair[1].order)));
    assert_eq!(registry.len(), listed.len());
    assert!(!registry.is_empty());
}

#[test]
fn duplicate_names_are_rejected() {
    let registry = registry();
    let err = registry
        .register(Factor::from_fn("breakthrough_therapy", Layer::Special, 99, never_fires))
        .expect_err("name already taken");
    assert_eq!(
        err,
        RegistryError::DuplicateFactor("breakthrough_therapy".to_string())
    );
}

#[test]
fn group_members_must_agree_on_layer_and_policy() {
    let registry = registry();

    let wrong_policy = Factor::from_fn("rare_pediatric", Layer::Designation, 60, never_fires)
        .in_group("fda_designation", GroupPolicy::Exclusive);
    match registry.register(wrong_policy) {
        Err(RegistryError::GroupConflict { group, .. }) => assert_eq!(group, "fda_designation"),
        other => panic!("expected group conflict, got {other:?}"),
    }

    let wrong_layer = Factor::from_fn("rare_pediatric", Layer::Special, 60, never_fires)
        .in_group("fda_designation", GroupPolicy::MaxOnly);
    match registry.register(wrong_layer) {
        Err(RegistryError::GroupConflict { reason, .. }) => assert!(reason.contains("layer")),
        other => panic!("expected group conflict, got {other:?}"),
    }

    let compatible = Factor::from_fn("rare_pediatric", Layer::Designation, 60, never_fires)
        .in_group("fda_designation", GroupPolicy::MaxOnly);
    registry.register(compatible).expect("compatible member");
    assert!(registry.get("rare_pediatric").is_some());
}

#[test]
fn toggling_is_idempotent() {
    let registry = registry();

    assert_eq!(registry.disable("facility_pai_passed"), Ok(true));
    let after_first = registry.list();
    assert_eq!(registry.disable("facility_pai_passed"), Ok(false));
    assert_eq!(registry.list(), after_first);

    assert_eq!(registry.enable("facility_pai_passed"), Ok(true));
    assert_eq!(registry.enable("facility_pai_passed"), Ok(false));
}

#[test]
fn unknown_names_are_reported_not_ignored() {
    let registry = registry();
    assert_eq!(
        registry.disable("no_such_factor"),
        Err(RegistryError::UnknownFactor("no_such_factor".to_string()))
    );
    assert!(matches!(
        registry.deprecate("no_such_factor", "gone"),
        Err(RegistryError::UnknownFactor(_))
    ));
    assert!(!registry.unregister("no_such_factor"));
}

#[test]
fn unregistered_factor_stops_contributing() {
    let registry = registry();
    let calculator = ProbabilityCalculator::new(registry.clone());
    let context = clean_phase3_context();

    assert!(registry.unregister("breakthrough_therapy"));
    assert!(registry.get("breakthrough_therapy").is_none());

    let result = calculator.calculate(&context).expect("context is valid");
    assert!(result.factor("breakthrough_therapy").is_none());
    assert_close(result.probability, 0.77);
}

#[test]
fn disabled_factor_is_skipped() {
    let registry = registry();
    let calculator = ProbabilityCalculator::new(registry.clone());
    registry
        .disable("facility_pai_passed")
        .expect("factor exists");

    let result = calculator
        .calculate(&clean_phase3_context())
        .expect("context is valid");
    assert!(result.factor("facility_pai_passed").is_none());
    assert_close(result.probability, 0.73);
}

#[test]
fn deprecated_factor_fires_with_a_warning() {
    let registry = registry();
    let calculator = ProbabilityCalculator::new(registry.clone());
    assert_eq!(
        registry.deprecate("breakthrough_therapy", "superseded by designation tiers"),
        Ok(true)
    );
    assert_eq!(
        registry.deprecate("breakthrough_therapy", "superseded by designation tiers"),
        Ok(false)
    );

    let result = calculator
        .calculate(&clean_phase3_context())
        .expect("context is valid");
    assert!(result
        .factor("breakthrough_therapy")
        .is_some_and(|factor| factor.is_applied()));
    assert!(result.warnings.iter().any(|warning| {
        warning.severity == WarningSeverity::Minor
            && warning.message.contains("'breakthrough_therapy' is deprecated")
    }));
}

#[test]
fn suppressed_deprecated_member_stays_quiet() {
    let registry = registry();
    let calculator = ProbabilityCalculator::new(registry.clone());
    registry
        .deprecate("priority_review", "folded into review tiers")
        .expect("factor exists");
    let mut context = clean_phase3_context();
    context.designations.priority_review = crate::analysis::Observed::Known(true);

    let result = calculator.calculate(&context).expect("context is valid");

    assert!(matches!(
        result.factor("priority_review").map(|factor| &factor.outcome),
        Some(FactorOutcome::Suppressed { winner }) if winner == "breakthrough_therapy"
    ));
    assert!(result
        .warnings
        .iter()
        .all(|warning| !warning.message.contains("'priority_review' is deprecated")));
}

#[test]
fn failing_rule_is_neutral_and_reported() {
    let registry = registry();
    registry
        .register(Factor::from_fn("broken_signal", Layer::Special, 99, broken_rule))
        .expect("new name");
    let calculator = ProbabilityCalculator::new(registry);

    let result = calculator
        .calculate(&clean_phase3_context())
        .expect("context is valid");

    assert_close(result.probability, 0.85);
    let entry = result.factor("broken_signal").expect("failure recorded");
    match &entry.outcome {
        FactorOutcome::Failed { error } => assert!(error.contains("garbage")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(entry.adjustment, 0.0);
    assert!(result.warnings.iter().any(|warning| {
        warning.severity == WarningSeverity::Major && warning.message.contains("broken_signal")
    }));
}

#[test]
fn snapshot_is_isolated_from_later_changes() {
    let registry = registry();
    let context = clean_phase3_context();
    let before = registry.snapshot();

    registry
        .disable("facility_pai_passed")
        .expect("factor exists");
    let after = registry.snapshot();

    let old_pass = before.apply_all(&context, 0.0);
    let new_pass = after.apply_all(&context, 0.0);
    assert!(old_pass
        .trace
        .iter()
        .any(|result| result.name == "facility_pai_passed"));
    assert!(new_pass
        .trace
        .iter()
        .all(|result| result.name != "facility_pai_passed"));
}

#[test]
fn empty_registry_still_produces_a_bounded_result() {
    let calculator = ProbabilityCalculator::new(std::sync::Arc::new(FactorRegistry::new(
        CalculatorConfig::default(),
    )));
    let result = calculator
        .calculate(&clean_phase3_context())
        .expect("context is valid");
    assert_close(result.probability, 0.35);
    assert!(result.factor("base_rate_fallback").is_some());
}
