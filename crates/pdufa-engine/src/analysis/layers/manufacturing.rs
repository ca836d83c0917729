//! Facility and inspection record. Inspection findings lose weight as they
//! age; a warning letter issued after the pre-approval inspection weighs more.

use crate::analysis::context::{AnalysisContext, Form483Severity};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};
use crate::analysis::result::Warning;

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("facility_pai_passed", Layer::Manufacturing, 10, pai_passed)
            .describe("Pre-approval inspection passed"),
        Factor::from_fn("facility_pai_failed", Layer::Manufacturing, 20, pai_failed)
            .describe("Pre-approval inspection failed"),
        Factor::from_fn("facility_warning_letter", Layer::Manufacturing, 30, warning_letter)
            .describe("Active warning letter at a manufacturing site")
            .version("2"),
        Factor::from_fn("fda_483_observations", Layer::Manufacturing, 40, form_483)
            .describe("Form 483 observations graded by severity and age"),
        Factor::from_fn("cdmo_high_risk", Layer::Manufacturing, 50, high_risk_cdmo)
            .describe("Contract manufacturer with a poor compliance record"),
    ]
}

fn pai_passed(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.manufacturing.pai_passed.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::bonus(
        input.config.manufacturing.pai_passed,
        "pre-approval inspection passed",
    )))
}

fn pai_failed(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.manufacturing.pai_passed.is_false() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.manufacturing.pai_failed,
        "pre-approval inspection failed",
    )))
}

fn warning_letter(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let record = &ctx.manufacturing;
    if !record.warning_letter.is_true() {
        return Ok(None);
    }
    let constants = &input.config.manufacturing;
    let temporal = &constants.temporal;

    let Some(issued) = record.warning_letter_date.known() else {
        return Ok(Some(
            Adjustment::penalty(constants.warning_letter, "active warning letter").with_warning(
                Warning::minor("warning letter date unknown; full penalty applied"),
            ),
        ));
    };

    let age = ctx.days_since(*issued);
    if age > temporal.warning_letter_stale_days {
        return Ok(Some(Adjustment::penalty(
            constants.warning_letter * temporal.warning_letter_stale_multiplier,
            format!("warning letter issued {age} days ago"),
        )));
    }
    if record.pai_date.known().is_some_and(|pai| issued > pai) {
        return Ok(Some(Adjustment::penalty(
            constants.warning_letter * temporal.warning_letter_after_pai_multiplier,
            "warning letter issued after the pre-approval inspection",
        )));
    }
    Ok(Some(Adjustment::penalty(
        constants.warning_letter,
        "active warning letter",
    )))
}

fn form_483(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let Some(severity) = ctx.manufacturing.form_483_severity.known() else {
        return Ok(None);
    };
    let constants = &input.config.manufacturing;
    let temporal = &constants.temporal;
    let (magnitude, label) = match severity {
        Form483Severity::NoObservations => return Ok(None),
        Form483Severity::Minor => (constants.form_483_minor, "minor"),
        Form483Severity::Moderate => (constants.form_483_moderate, "moderate"),
        Form483Severity::Critical => (constants.form_483_critical, "critical"),
    };

    let (multiplier, age_note) = match ctx.manufacturing.form_483_date.known() {
        Some(issued) => {
            let age = ctx.days_since(*issued);
            if age > temporal.form_483_stale_days {
                (temporal.form_483_stale_multiplier, format!(", {age} days old"))
            } else if age > temporal.form_483_aging_days {
                (temporal.form_483_aging_multiplier, format!(", {age} days old"))
            } else {
                (1.0, String::new())
            }
        }
        None => (1.0, String::new()),
    };

    Ok(Some(Adjustment::penalty(
        magnitude * multiplier,
        format!("{label} Form 483 observations{age_note}"),
    )))
}

fn high_risk_cdmo(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.manufacturing.high_risk_cdmo.is_true() {
        return Ok(None);
    }
    Ok(Some(Adjustment::penalty(
        input.config.manufacturing.high_risk_cdmo,
        "high-risk contract manufacturer",
    )))
}
