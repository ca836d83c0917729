use crate::analysis::context::{AnalysisContext, DisputeOutcome};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};

pub(super) fn factors() -> Vec<Factor> {
    vec![
        Factor::from_fn("dispute_resolution", Layer::Dispute, 10, dispute_resolution)
            .describe("Outcome of a formal dispute resolution request"),
    ]
}

fn dispute_resolution(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.dispute.filed.is_true() {
        return Ok(None);
    }
    let constants = &input.config.dispute;
    let adjustment = match ctx.dispute.outcome.known() {
        Some(DisputeOutcome::WonFully) => {
            Adjustment::bonus(constants.won, "formal dispute resolved in the sponsor's favor")
        }
        Some(DisputeOutcome::Partial) => {
            Adjustment::penalty(constants.partial, "formal dispute only partially won")
        }
        Some(DisputeOutcome::LostFully) => {
            Adjustment::penalty(constants.lost, "formal dispute lost")
        }
        None => return Ok(None),
    };
    Ok(Some(adjustment))
}
