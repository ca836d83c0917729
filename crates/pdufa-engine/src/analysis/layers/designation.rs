//! Expedited-program designations. They overlap heavily, so only the
//! strongest held designation counts.

use crate::analysis::context::{AnalysisContext, Observed};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, GroupPolicy, RuleFn, RuleInput, RuleOutcome};

const GROUP: &str = "fda_designation";

pub(super) fn factors() -> Vec<Factor> {
    vec![
        designation("breakthrough_therapy", 10, breakthrough_therapy),
        designation("priority_review", 20, priority_review),
        designation("fast_track", 30, fast_track),
        designation("orphan_drug", 40, orphan_drug),
        designation("accelerated_approval", 50, accelerated_approval),
    ]
}

fn designation(name: &str, order: i32, rule: RuleFn) -> Factor {
    Factor::from_fn(name, Layer::Designation, order, rule)
        .in_group(GROUP, GroupPolicy::MaxOnly)
        .describe("FDA expedited-program designation")
}

fn held(flag: &Observed<bool>, magnitude: f64, label: &str) -> RuleOutcome {
    if !flag.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(magnitude, format!("{label} designation"))))
}

fn breakthrough_therapy(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    held(
        &ctx.designations.breakthrough_therapy,
        input.config.designations.breakthrough_therapy,
        "Breakthrough Therapy",
    )
}

fn priority_review(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    held(
        &ctx.designations.priority_review,
        input.config.designations.priority_review,
        "Priority Review",
    )
}

fn fast_track(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    held(
        &ctx.designations.fast_track,
        input.config.designations.fast_track,
        "Fast Track",
    )
}

fn orphan_drug(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    held(
        &ctx.designations.orphan_drug,
        input.config.designations.orphan_drug,
        "Orphan Drug",
    )
}

fn accelerated_approval(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    held(
        &ctx.designations.accelerated_approval,
        input.config.designations.accelerated_approval,
        "Accelerated Approval",
    )
}
