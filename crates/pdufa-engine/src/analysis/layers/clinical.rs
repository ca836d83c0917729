//! Clinical evidence quality.

use crate::analysis::context::{AnalysisContext, MentalHealthIndication, TrialRegion};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("primary_endpoint_not_met", Layer::Clinical, 10, endpoint_not_met)
            .describe("Pivotal trial missed its primary endpoint"),
        Factor::from_fn("single_arm_trial", Layer::Clinical, 20, single_arm)
            .describe("Efficacy rests on a single-arm study"),
        Factor::from_fn("trial_region_china_only", Layer::Clinical, 30, china_only)
            .describe("Pivotal data generated only in China"),
        Factor::from_fn("clinical_hold_history", Layer::Clinical, 40, clinical_hold)
            .describe("Program was placed on clinical hold"),
        Factor::from_fn("mental_health_indication", Layer::Clinical, 50, mental_health)
            .describe("Psychiatric indications carry high placebo response"),
    ]
}

fn endpoint_not_met(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.clinical.primary_endpoint_met.is_false() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.clinical.primary_endpoint_not_met,
        "primary endpoint not met",
    )))
}

fn single_arm(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.clinical.single_arm.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.clinical.single_arm,
        "single-arm pivotal trial",
    )))
}

fn china_only(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.clinical.trial_region.is(&TrialRegion::ChinaOnly) {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.clinical.china_only,
        "pivotal data from China-only sites",
    )))
}

fn clinical_hold(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.clinical.clinical_hold_history.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.clinical.clinical_hold_history,
        "clinical hold on record",
    )))
}

fn mental_health(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let Some(indication) = ctx.clinical.mental_health_indication.known() else {
        return Ok(None);
    };
    let table = &input.config.clinical.mental_health;
    let penalty = table
        .get(indication)
        .or_else(|| table.get(&MentalHealthIndication::Other))
        .copied()
        .unwrap_or(0.0);
    if penalty <= 0.0 {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        penalty,
        format!("psychiatric indication ({})", indication.label()),
    )))
}
