//! Hard caps and floors. Caps run first and floors never lift the
//! probability above the tightest active cap.

use serde::{Deserialize, Serialize};

use crate::analysis::context::{AnalysisContext, SpaStatus, TrialRegion};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};
use crate::analysis::result::{percent, FactorResult};
use crate::config::constants::HardCaps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapTier {
    Catastrophic,
    Critical,
    Severe,
    Moderate,
}

impl CapTier {
    fn ceiling(self, caps: &HardCaps) -> f64 {
        match self {
            CapTier::Catastrophic => caps.catastrophic,
            CapTier::Critical => caps.critical,
            CapTier::Severe => caps.severe,
            CapTier::Moderate => caps.moderate,
        }
    }

    fn triggered(self, ctx: &AnalysisContext, trace: &[FactorResult]) -> Option<&'static str> {
        let manufacturing = &ctx.manufacturing;
        match self {
            CapTier::Catastrophic => ctx
                .clinical
                .primary_endpoint_met
                .is_false()
                .then_some("primary endpoint not met"),
            CapTier::Critical => {
                if ctx.clinical.trial_region.is(&TrialRegion::ChinaOnly) {
                    Some("China-only pivotal data")
                } else if manufacturing.pai_passed.is_false()
                    && manufacturing.warning_letter.is_true()
                {
                    Some("failed inspection with an active warning letter")
                } else {
                    None
                }
            }
            CapTier::Severe => manufacturing
                .warning_letter
                .is_true()
                .then_some("active warning letter"),
            CapTier::Moderate => trace
                .iter()
                .any(|result| result.name == "adcom_vote_negative" && result.is_applied())
                .then_some("unfavorable advisory committee"),
        }
    }
}

/// Tightest ceiling triggered for this calculation, if any.
pub fn active_ceiling(
    ctx: &AnalysisContext,
    trace: &[FactorResult],
    caps: &HardCaps,
) -> Option<(CapTier, f64)> {
    [
        CapTier::Catastrophic,
        CapTier::Critical,
        CapTier::Severe,
        CapTier::Moderate,
    ]
    .into_iter()
    .filter(|tier| tier.triggered(ctx, trace).is_some())
    .map(|tier| (tier, tier.ceiling(caps)))
    .min_by(|left, right| left.1.total_cmp(&right.1))
}

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("hard_cap_catastrophic", Layer::Cap, 10, catastrophic)
            .describe("Ceiling for a failed primary endpoint"),
        Factor::from_fn("hard_cap_critical", Layer::Cap, 20, critical)
            .describe("Ceiling for critical data-integrity or manufacturing failures"),
        Factor::from_fn("hard_cap_severe", Layer::Cap, 30, severe)
            .describe("Ceiling while a warning letter is active"),
        Factor::from_fn("hard_cap_moderate", Layer::Cap, 40, moderate)
            .describe("Ceiling after an unfavorable advisory committee"),
        Factor::from_fn("floor_fda_designation", Layer::Cap, 50, designation_floor)
            .describe("Minimum for any expedited-program designation"),
        Factor::from_fn("floor_spa_agreed", Layer::Cap, 60, spa_floor)
            .describe("Minimum while an SPA agreement is in force"),
    ]
}

fn apply_cap(tier: CapTier, ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    let Some(condition) = tier.triggered(ctx, input.trace) else {
        return Ok(None);
    };
    let ceiling = tier.ceiling(&input.config.caps);
    if input.probability <= ceiling {
        return Ok(None);
    }
    Ok(Some(Adjustment::set_to(
        ceiling,
        input.probability,
        format!("capped at {} ({condition})", percent(ceiling)),
    )))
}

fn catastrophic(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    apply_cap(CapTier::Catastrophic, ctx, input)
}

fn critical(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    apply_cap(CapTier::Critical, ctx, input)
}

fn severe(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    apply_cap(CapTier::Severe, ctx, input)
}

fn moderate(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    apply_cap(CapTier::Moderate, ctx, input)
}

fn apply_floor(
    floor: f64,
    condition: &str,
    ctx: &AnalysisContext,
    input: &RuleInput<'_>,
) -> RuleOutcome {
    let target = match active_ceiling(ctx, input.trace, &input.config.caps) {
        Some((_, ceiling)) => floor.min(ceiling),
        None => floor,
    };
    if input.probability >= target {
        return Ok(None);
    }
    Ok(Some(Adjustment::set_to(
        target,
        input.probability,
        format!("raised to floor {} ({condition})", percent(target)),
    )))
}

fn designation_floor(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.designations.any_held() {
        return Ok(None);
    }
    apply_floor(input.config.floors.designation, "FDA designation", ctx, input)
}

fn spa_floor(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.special.spa_status.is(&SpaStatus::Agreed) {
        return Ok(None);
    }
    apply_floor(input.config.floors.spa_agreed, "SPA agreement", ctx, input)
}
