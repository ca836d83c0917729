//! Starting probability. Exactly one base state applies: the first one, in
//! registration order, whose condition holds.

use crate::analysis::context::{AnalysisContext, ResubmissionClass, TrialPhase};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, GroupPolicy, RuleFn, RuleInput, RuleOutcome};
use crate::analysis::result::percent;

const GROUP: &str = "base_rate";

pub(super) fn factors() -> Vec<Factor> {
    vec![
        base("base_resubmission_class1", 10, class1_resubmission)
            .describe("First resubmission after a CRL, reviewed as Class 1"),
        base("base_resubmission_class2", 20, class2_resubmission)
            .describe("First resubmission after a CRL, reviewed as Class 2"),
        base("base_resubmission", 30, resubmission)
            .describe("Resubmission without a known review class, or a repeat resubmission"),
        base("base_biosimilar", 40, biosimilar).describe("Biosimilar application"),
        base("base_phase3", 50, phase3).describe("Original application backed by phase 3 data"),
        base("base_phase2", 60, phase2).describe("Original application backed by phase 2 data"),
        base("base_phase1", 70, phase1).describe("Original application backed by phase 1 data"),
        base("base_new_application", 80, new_application)
            .describe("Confirmed original submission with no phase on record"),
    ]
}

fn base(name: &str, order: i32, rule: RuleFn) -> Factor {
    Factor::from_fn(name, Layer::Base, order, rule).in_group(GROUP, GroupPolicy::Exclusive)
}

fn set_base(rate: f64, label: &str, input: &RuleInput<'_>) -> RuleOutcome {
    Ok(Some(Adjustment::set_to(
        rate,
        input.probability,
        format!("{label} base rate {}", percent(rate)),
    )))
}

fn first_resubmission(ctx: &AnalysisContext, class: ResubmissionClass) -> bool {
    ctx.crl.resubmission_number.is(&1) && ctx.crl.resubmission_class.is(&class)
}

fn class1_resubmission(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !first_resubmission(ctx, ResubmissionClass::Class1) {
        return Ok(None);
    }
    let rates = &input.config.base_rates;
    if ctx.crl.is_cmc_only() {
        set_base(
            rates.resubmission_class1_cmc_only,
            "class 1 resubmission after CMC-only CRL",
            input,
        )
    } else {
        set_base(rates.resubmission_class1, "class 1 resubmission", input)
    }
}

fn class2_resubmission(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !first_resubmission(ctx, ResubmissionClass::Class2) {
        return Ok(None);
    }
    let rates = &input.config.base_rates;
    if ctx.crl.is_cmc_only() {
        set_base(
            rates.resubmission_class2_cmc_only,
            "class 2 resubmission after CMC-only CRL",
            input,
        )
    } else {
        set_base(rates.resubmission_class2, "class 2 resubmission", input)
    }
}

fn resubmission(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let Some(number) = ctx.crl.resubmission_number.known().filter(|n| **n >= 1) else {
        return Ok(None);
    };
    set_base(
        input.config.base_rates.resubmission,
        &format!("resubmission #{number}"),
        input,
    )
}

fn biosimilar(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.biosimilar.is_true() {
        return Ok(None);
    }
    set_base(input.config.base_rates.biosimilar, "biosimilar", input)
}

fn on_phase(ctx: &AnalysisContext, phase: TrialPhase) -> bool {
    ctx.clinical.trial_phase.is(&phase)
}

fn phase3(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !on_phase(ctx, TrialPhase::Phase3) {
        return Ok(None);
    }
    set_base(input.config.base_rates.phase3, "phase 3", input)
}

fn phase2(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !on_phase(ctx, TrialPhase::Phase2) {
        return Ok(None);
    }
    set_base(input.config.base_rates.phase2, "phase 2", input)
}

fn phase1(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !on_phase(ctx, TrialPhase::Phase1) {
        return Ok(None);
    }
    set_base(input.config.base_rates.phase1, "phase 1", input)
}

fn new_application(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let original = ctx.crl.resubmission_number.is(&0) || ctx.crl.prior_crl.is_false();
    if !original {
        return Ok(None);
    }
    set_base(
        input.config.base_rates.new_application,
        "original application",
        input,
    )
}
