//! Trust boundary between raw fact records and the calculator.
//!
//! Only facts with an admissible provenance reach the context; everything else
//! becomes `Unknown`. A fact that was never searched is indistinguishable from
//! one that is absent.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::{
    AnalysisContext, ContextField, FieldProvenance, Form483Severity, Observed, VerificationTier,
};
use crate::facts::{FactEntry, FactRecord, FactValue, ProvenanceTag};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("event '{event_id}' has an unreadable PDUFA date '{raw}'")]
    InvalidDecisionDate { event_id: String, raw: String },
}

/// How much corroboration a fact needs before the engine relies on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Also accept single-source secondary facts.
    Standard,
    /// Accept only primary and cross-verified facts.
    #[default]
    Strict,
}

impl TrustPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept(VerificationTier),
    Reject,
    NotApplicable,
    Absent,
}

/// Outcome of admitting one fact into a context slot.
#[derive(Debug, Clone, Copy)]
enum Update<'a> {
    Value(&'a FactValue),
    NotApplicable,
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    policy: TrustPolicy,
}

impl ContextBuilder {
    pub fn new(policy: TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TrustPolicy {
        self.policy
    }

    pub fn admit(&self, tag: ProvenanceTag) -> Admission {
        match (tag, self.policy) {
            (ProvenanceTag::VerifiedPrimary, _) => Admission::Accept(VerificationTier::Official),
            (ProvenanceTag::CrossVerifiedSecondary, _) => {
                Admission::Accept(VerificationTier::CrossVerified)
            }
            (ProvenanceTag::SecondaryOnly, TrustPolicy::Standard) => {
                Admission::Accept(VerificationTier::Secondary)
            }
            (ProvenanceTag::SecondaryOnly, TrustPolicy::Strict) => Admission::Reject,
            (ProvenanceTag::InferredDerived | ProvenanceTag::Unverified, _) => Admission::Reject,
            (ProvenanceTag::NotApplicable, _) => Admission::NotApplicable,
            (ProvenanceTag::NotYetSearched, _) => Admission::Absent,
        }
    }

    /// Builds the immutable context for one event as of `analysis_date`.
    pub fn build(
        &self,
        record: &FactRecord,
        analysis_date: NaiveDate,
    ) -> Result<AnalysisContext, BuildError> {
        let pdufa_date = match record.pdufa_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_date(raw).ok_or_else(|| BuildError::InvalidDecisionDate {
                event_id: record.event_id.clone(),
                raw: raw.to_string(),
            })?),
        };

        let mut context = AnalysisContext {
            pdufa_date,
            ..AnalysisContext::new(
                record.ticker.trim(),
                record.drug_name.trim(),
                analysis_date,
                analysis_date,
            )
        };

        for (key, entry) in &record.facts {
            let Some(field) = ContextField::from_key(key) else {
                debug!(event = %record.event_id, fact = %key, "ignoring unrecognized fact");
                continue;
            };
            self.admit_entry(&mut context, field, entry);
        }

        Ok(context)
    }

    fn admit_entry(&self, context: &mut AnalysisContext, field: ContextField, entry: &FactEntry) {
        match self.admit(entry.provenance) {
            Admission::Absent => {}
            Admission::Reject => context.notes.push(format!(
                "{field} rejected: {} provenance is not trusted",
                tag_label(entry.provenance)
            )),
            Admission::NotApplicable => {
                // Type-agnostic, cannot fail.
                let _ = assign(context, field, Update::NotApplicable);
            }
            Admission::Accept(tier) => {
                let Some(value) = &entry.value else {
                    context
                        .notes
                        .push(format!("{field} has a trusted source but no value"));
                    return;
                };
                if assign(context, field, Update::Value(value)).is_err() {
                    context.notes.push(format!(
                        "{field} value {value:?} could not be interpreted; treated as unknown"
                    ));
                    return;
                }
                context.provenance.insert(
                    field,
                    FieldProvenance {
                        tier,
                        observed_on: entry.observed_on,
                    },
                );
            }
        }
    }
}

fn tag_label(tag: ProvenanceTag) -> &'static str {
    match tag {
        ProvenanceTag::VerifiedPrimary => "verified primary",
        ProvenanceTag::CrossVerifiedSecondary => "cross-verified secondary",
        ProvenanceTag::SecondaryOnly => "single secondary",
        ProvenanceTag::InferredDerived => "inferred",
        ProvenanceTag::Unverified => "unverified",
        ProvenanceTag::NotApplicable => "not applicable",
        ProvenanceTag::NotYetSearched => "not yet searched",
    }
}

struct Mismatch;

fn assign(context: &mut AnalysisContext, field: ContextField, update: Update<'_>) -> Result<(), Mismatch> {
    let c = context;
    match field {
        ContextField::BreakthroughTherapy => set(&mut c.designations.breakthrough_therapy, update, as_bool),
        ContextField::PriorityReview => set(&mut c.designations.priority_review, update, as_bool),
        ContextField::FastTrack => set(&mut c.designations.fast_track, update, as_bool),
        ContextField::OrphanDrug => set(&mut c.designations.orphan_drug, update, as_bool),
        ContextField::AcceleratedApproval => set(&mut c.designations.accelerated_approval, update, as_bool),
        ContextField::AdcomHeld => set(&mut c.adcom.held, update, as_bool),
        ContextField::AdcomVoteRatio => set(&mut c.adcom.vote_ratio, update, as_ratio),
        ContextField::AdcomOutcome => set(&mut c.adcom.outcome, update, as_variant),
        ContextField::AdcomDate => set(&mut c.adcom.meeting_date, update, as_date),
        ContextField::PriorCrl => set(&mut c.crl.prior_crl, update, as_bool),
        ContextField::CrlCategory => set(&mut c.crl.category, update, as_variant),
        ContextField::ResubmissionNumber => set(&mut c.crl.resubmission_number, update, as_count),
        ContextField::ResubmissionClass => set(&mut c.crl.resubmission_class, update, as_variant),
        ContextField::CrlDate => set(&mut c.crl.letter_date, update, as_date),
        ContextField::TrialPhase => set(&mut c.clinical.trial_phase, update, as_variant),
        ContextField::PrimaryEndpointMet => set(&mut c.clinical.primary_endpoint_met, update, as_bool),
        ContextField::SingleArm => set(&mut c.clinical.single_arm, update, as_bool),
        ContextField::TrialRegion => set(&mut c.clinical.trial_region, update, as_variant),
        ContextField::MentalHealthIndication => set(&mut c.clinical.mental_health_indication, update, as_variant),
        ContextField::ClinicalHoldHistory => set(&mut c.clinical.clinical_hold_history, update, as_bool),
        ContextField::PaiPassed => set(&mut c.manufacturing.pai_passed, update, as_bool),
        ContextField::PaiDate => set(&mut c.manufacturing.pai_date, update, as_date),
        ContextField::WarningLetter => set(&mut c.manufacturing.warning_letter, update, as_bool),
        ContextField::WarningLetterDate => set(&mut c.manufacturing.warning_letter_date, update, as_date),
        ContextField::Form483Severity => set(&mut c.manufacturing.form_483_severity, update, as_form_483),
        ContextField::Form483Date => set(&mut c.manufacturing.form_483_date, update, as_date),
        ContextField::HighRiskCdmo => set(&mut c.manufacturing.high_risk_cdmo, update, as_bool),
        ContextField::DisputeFiled => set(&mut c.dispute.filed, update, as_bool),
        ContextField::DisputeOutcome => set(&mut c.dispute.outcome, update, as_variant),
        ContextField::LabelNegotiation => set(&mut c.earnings_call.label_negotiation, update, as_bool),
        ContextField::TimelineDelayed => set(&mut c.earnings_call.timeline_delayed, update, as_bool),
        ContextField::ManagementTone => set(&mut c.earnings_call.management_tone, update, as_variant),
        ContextField::CitizenPetition => set(&mut c.citizen_petition.filed, update, as_bool),
        ContextField::PetitionStatus => set(&mut c.citizen_petition.status, update, as_variant),
        ContextField::FirstInClass => set(&mut c.special.first_in_class, update, as_bool),
        ContextField::Supplement => set(&mut c.special.supplement, update, as_bool),
        ContextField::Biosimilar => set(&mut c.special.biosimilar, update, as_bool),
        ContextField::SpaStatus => set(&mut c.special.spa_status, update, as_variant),
    }
}

fn set<T>(
    slot: &mut Observed<T>,
    update: Update<'_>,
    parse: fn(&FactValue) -> Option<T>,
) -> Result<(), Mismatch> {
    *slot = match update {
        Update::NotApplicable => Observed::NotApplicable,
        Update::Value(value) => Observed::Known(parse(value).ok_or(Mismatch)?),
    };
    Ok(())
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_ascii_lowercase()
        .replace(['-', ' ', '/'], "_")
}

fn as_bool(value: &FactValue) -> Option<bool> {
    match value {
        FactValue::Bool(flag) => Some(*flag),
        FactValue::Integer(0) => Some(false),
        FactValue::Integer(1) => Some(true),
        FactValue::Text(text) => match normalize(text).as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Vote share in `[0, 1]`. Values marked with `%` and whole numbers above 1
/// are read as percentages; a fractional value above 1 is ambiguous and
/// rejected.
fn as_ratio(value: &FactValue) -> Option<f64> {
    let (raw, marked_percent) = match value {
        FactValue::Number(number) => (*number, false),
        FactValue::Integer(number) => (*number as f64, false),
        FactValue::Text(text) => {
            let text = text.trim();
            match text.strip_suffix('%') {
                Some(body) => (body.trim().parse().ok()?, true),
                None => (text.parse().ok()?, false),
            }
        }
        FactValue::Bool(_) => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let ratio = if marked_percent || (raw > 1.0 && raw.fract() == 0.0) {
        raw / 100.0
    } else if raw > 1.0 {
        return None;
    } else {
        raw
    };
    (0.0..=1.0).contains(&ratio).then_some(ratio)
}

fn as_count(value: &FactValue) -> Option<u32> {
    match value {
        FactValue::Integer(number) => u32::try_from(*number).ok(),
        FactValue::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_date(value: &FactValue) -> Option<NaiveDate> {
    match value {
        FactValue::Text(text) => parse_date(text),
        _ => None,
    }
}

fn as_variant<T: DeserializeOwned>(value: &FactValue) -> Option<T> {
    let key = match value {
        FactValue::Text(text) => normalize(text),
        FactValue::Integer(number) => number.to_string(),
        _ => return None,
    };
    serde_json::from_value(serde_json::Value::String(key)).ok()
}

fn as_form_483(value: &FactValue) -> Option<Form483Severity> {
    match value {
        FactValue::Integer(count) => Form483Severity::from_observations(*count),
        FactValue::Text(text) => match text.trim().parse::<i64>() {
            Ok(count) => Form483Severity::from_observations(count),
            Err(_) => as_variant(value),
        },
        other => as_variant(other),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_accepts_percentages() {
        assert_eq!(as_ratio(&FactValue::Integer(75)), Some(0.75));
        assert_eq!(as_ratio(&FactValue::Text("60%".to_string())), Some(0.6));
        assert_eq!(as_ratio(&FactValue::Number(1.0)), Some(1.0));
        assert_eq!(as_ratio(&FactValue::Number(250.0)), None);
        assert_eq!(as_ratio(&FactValue::Text("1.5%".to_string())), Some(0.015));
    }

    #[test]
    fn fractional_ratio_above_one_is_ambiguous() {
        assert_eq!(as_ratio(&FactValue::Number(1.5)), None);
        assert_eq!(as_ratio(&FactValue::Text("1.5".to_string())), None);
        assert_eq!(as_ratio(&FactValue::Number(f64::NAN)), None);
        assert_eq!(as_ratio(&FactValue::Number(0.4)), Some(0.4));
    }

    #[test]
    fn zero_form_483_observations_is_a_clean_inspection() {
        assert_eq!(
            as_form_483(&FactValue::Integer(0)),
            Some(Form483Severity::NoObservations)
        );
        assert_eq!(
            as_form_483(&FactValue::Text("0".to_string())),
            Some(Form483Severity::NoObservations)
        );
        assert_eq!(as_form_483(&FactValue::Integer(-1)), None);
    }

    #[test]
    fn variants_parse_loosely() {
        let phase: Option<crate::analysis::TrialPhase> =
            as_variant(&FactValue::Text("Phase 3".to_string()));
        assert_eq!(phase, Some(crate::analysis::TrialPhase::Phase3));
        let class: Option<crate::analysis::ResubmissionClass> =
            as_variant(&FactValue::Integer(2));
        assert_eq!(class, Some(crate::analysis::ResubmissionClass::Class2));
    }

    #[test]
    fn dates_parse_in_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date");
        assert_eq!(parse_date("2026-03-14"), Some(expected));
        assert_eq!(parse_date("03/14/2026"), Some(expected));
        assert_eq!(parse_date("March 14, 2026"), Some(expected));
        assert_eq!(parse_date("next spring"), None);
    }

    #[test]
    fn strict_policy_rejects_single_source_facts() {
        let standard = ContextBuilder::new(TrustPolicy::Standard);
        let strict = ContextBuilder::new(TrustPolicy::Strict);
        assert_eq!(
            standard.admit(ProvenanceTag::SecondaryOnly),
            Admission::Accept(VerificationTier::Secondary)
        );
        assert_eq!(strict.admit(ProvenanceTag::SecondaryOnly), Admission::Reject);
        assert_eq!(strict.admit(ProvenanceTag::NotYetSearched), Admission::Absent);
    }
}
