use crate::analysis::context::{AnalysisContext, SpaStatus};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("first_in_class", Layer::Special, 10, first_in_class)
            .describe("First approved mechanism in its class"),
        Factor::from_fn("supplement_application", Layer::Special, 20, supplement)
            .describe("Supplemental application for an approved product"),
        Factor::from_fn("spa_agreed", Layer::Special, 30, spa_agreed)
            .describe("Special Protocol Assessment agreement in force"),
        Factor::from_fn("spa_rescinded", Layer::Special, 40, spa_rescinded)
            .describe("Special Protocol Assessment rescinded by FDA"),
    ]
}

fn first_in_class(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.first_in_class.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.special.first_in_class,
        "first-in-class mechanism",
    )))
}

fn supplement(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.supplement.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.special.supplement,
        "supplemental application for an approved product",
    )))
}

fn spa_agreed(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.spa_status.is(&SpaStatus::Agreed) {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.special.spa_agreed,
        "SPA agreement in force",
    )))
}

fn spa_rescinded(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.spa_status.is(&SpaStatus::Rescinded) {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.special.spa_rescinded,
        "SPA rescinded",
    )))
}
