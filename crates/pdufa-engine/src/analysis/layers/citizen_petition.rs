use crate::analysis::context::{AnalysisContext, PetitionStatus};
use crate::analysis::layers::Layer;
use crate::analysis::registry::{Adjustment, Factor, RuleInput, RuleOutcome};
use crate::analysis::result::Warning;

pub(super) fn factors() -> Vec<Factor> {
    vec![Factor::from_fn(
        "citizen_petition",
        Layer::CitizenPetition,
        10,
        citizen_petition,
    )
    .describe("Citizen petition filed against the application")]
}

fn citizen_petition(ctx: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
    if !ctx.citizen_petition.filed.is_true() {
        return Ok(None);
    }
    let constants = &input.config.citizen_petition;
    let adjustment = match ctx.citizen_petition.status.known() {
        Some(PetitionStatus::Filed) => {
            Adjustment::penalty(constants.filed, "citizen petition pending")
        }
        Some(PetitionStatus::Denied) => {
            Adjustment::bonus(constants.denied, "citizen petition denied by FDA")
        }
        Some(PetitionStatus::Granted) => {
            Adjustment::penalty(constants.granted, "citizen petition granted")
        }
        None => Adjustment::penalty(constants.filed, "citizen petition with unknown status")
            .with_warning(Warning::minor(
                "citizen petition status unknown; treated as pending",
            )),
    };
    Ok(Some(adjustment))
}
