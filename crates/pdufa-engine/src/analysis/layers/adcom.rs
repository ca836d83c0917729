//! Advisory committee outcome. At most one reading of the meeting applies;
//! the stronger signals are registered first.

use crate::analysis::context::{AdComOutcome, AnalysisContext};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, GroupPolicy, RuleFn, RuleInput, RuleOutcome};
use crate::analysis::result::percent;

const GROUP: &str = "adcom_outcome";

pub(super) fn factors() -> Vec<Factor> {
    vec![
        adcom("adcom_unanimous", 10, unanimous).describe("Unanimous favorable vote"),
        adcom("adcom_vote_positive", 20, positive).describe("Favorable vote or majority"),
        adcom("adcom_vote_negative", 30, negative).describe("Unfavorable vote or minority"),
        adcom("adcom_mixed", 40, mixed).describe("Split committee"),
        adcom("adcom_waived", 50, waived).describe("Committee waived by FDA"),
    ]
}

fn adcom(name: &str, order: i32, rule: RuleFn) -> Factor {
    Factor::from_fn(name, Layer::AdCom, order, rule).in_group(GROUP, GroupPolicy::Exclusive)
}

fn vote_note(ctx: &AnalysisContext) -> String {
    ctx.adcom
        .vote_ratio
        .known()
        .map(|ratio| format!(" ({} in favor)", percent(*ratio)))
        .unwrap_or_default()
}

fn unanimous(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let unanimous = ctx.adcom.held.is_true()
        && ctx.adcom.vote_ratio.known().is_some_and(|ratio| *ratio >= 1.0);
    if !unanimous {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.adcom.unanimous,
        "advisory committee voted unanimously in favor",
    )))
}

fn positive(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let threshold = input.config.adcom.negative_vote_threshold;
    let favorable = ctx.adcom.held.is_true()
        && (ctx.adcom.outcome.is(&AdComOutcome::Positive)
            || ctx.adcom.vote_ratio.known().is_some_and(|ratio| *ratio > threshold));
    if !favorable {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.adcom.positive,
        format!("favorable advisory committee{}", vote_note(ctx)),
    )))
}

fn negative(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let threshold = input.config.adcom.negative_vote_threshold;
    let unfavorable = ctx.adcom.held.is_true()
        && (ctx.adcom.outcome.is(&AdComOutcome::Negative)
            || ctx.adcom.vote_ratio.known().is_some_and(|ratio| *ratio <= threshold));
    if !unfavorable {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.adcom.negative,
        format!("unfavorable advisory committee{}", vote_note(ctx)),
    )))
}

fn mixed(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !(ctx.adcom.held.is_true() && ctx.adcom.outcome.is(&AdComOutcome::Mixed)) {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.adcom.mixed,
        "advisory committee was split",
    )))
}

fn waived(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.adcom.outcome.is(&AdComOutcome::Waived) {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.adcom.waived,
        "FDA waived the advisory committee",
    )))
}
