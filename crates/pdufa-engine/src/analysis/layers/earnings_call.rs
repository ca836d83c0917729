//! Management commentary from the latest earnings call.

use crate::analysis::context::{AnalysisContext, ManagementTone};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("label_negotiation_signal", Layer::EarningsCall, 10, label_negotiation)
            .describe("Management reports label discussions under way"),
        Factor::from_fn("timeline_delay_signal", Layer::EarningsCall, 20, timeline_delay)
            .describe("Management signals a slipping review timeline"),
        Factor::from_fn("management_tone", Layer::EarningsCall, 30, management_tone)
            .describe("Overall tone on the regulatory outlook"),
    ]
}

fn label_negotiation(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.earnings_call.label_negotiation.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.earnings_call.label_negotiation,
        "label negotiation under way",
    )))
}

fn timeline_delay(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.earnings_call.timeline_delayed.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.earnings_call.timeline_delay,
        "management flagged a timeline delay",
    )))
}

fn management_tone(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let constants = &input.config.earnings_call;
    let adjustment = match ctx.earnings_call.management_tone.known() {
        Some(ManagementTone::Confident) => {
            Adjustment::bonus(constants.confident_tone, "confident management tone")
        }
        Some(ManagementTone::Cautious) => {
            Adjustment::penalty(constants.cautious_tone, "cautious management tone")
        }
        Some(ManagementTone::Neutral) | None => return Ok(None),
    };
    Ok(Some(adjustment))
}
