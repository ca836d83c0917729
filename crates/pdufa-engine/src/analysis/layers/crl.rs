//! Complete response letter history. Each signal stands on its own.

use crate::analysis::context::{AnalysisContext, ResubmissionClass};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("crl_class1_resubmission", Layer::Crl, 10, class1_bonus)
            .describe("Class 1 resubmissions carry a short review and narrow scope"),
        Factor::from_fn("crl_class2_resubmission", Layer::Crl, 20, class2_bonus)
            .describe("Class 2 resubmission"),
        Factor::from_fn("crl_resubmission", Layer::Crl, 30, resubmission_penalty)
            .describe("Application already failed at least one review cycle"),
        Factor::from_fn("crl_new_application", Layer::Crl, 40, new_application_crl)
            .describe("Original application with a CRL on record"),
        Factor::from_fn("crl_category", Layer::Crl, 50, category_penalty)
            .describe("Severity of the deficiency cited in the CRL"),
    ]
}

fn class1_bonus(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !(ctx.crl.is_resubmission() && ctx.crl.resubmission_class.is(&ResubmissionClass::Class1)) {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.crl.class1_bonus,
        "class 1 resubmission",
    )))
}

fn class2_bonus(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !(ctx.crl.is_resubmission() && ctx.crl.resubmission_class.is(&ResubmissionClass::Class2)) {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.crl.class2_bonus,
        "class 2 resubmission",
    )))
}

fn resubmission_penalty(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.crl.is_resubmission() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.crl.resubmission_penalty,
        "prior review cycle ended in a CRL",
    )))
}

fn new_application_crl(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !(ctx.crl.prior_crl.is_true() && ctx.crl.resubmission_number.is(&0)) {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.crl.new_application_crl_penalty,
        "CRL on record for an original application",
    )))
}

fn category_penalty(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.crl.prior_crl.is_true() {
        return Ok(None);
    }
    let Some(category) = ctx.crl.category.known() else {
        return Ok(None);
    };
    let penalty = input
        .config
        .crl
        .category_penalties
        .get(category)
        .copied()
        .unwrap_or(0.0);
    if penalty <= 0.0 {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        penalty,
        format!("{} deficiency cited in CRL", category.label()),
    )))
}
