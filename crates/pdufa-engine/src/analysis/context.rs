use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::result::{Warning, WarningSeverity};

/// Three-state marker carried by every fact the engine consumes.
///
/// `Unknown` covers both "searched and unverified" and "never looked for";
/// factor rules treat it as neutral. `NotApplicable` means the question does
/// not apply to this event at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Observed<T> {
    Known(T),
    Unknown,
    NotApplicable,
}

impl<T> Default for Observed<T> {
    fn default() -> Self {
        Observed::Unknown
    }
}

impl<T> Observed<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Observed::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Observed::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Observed::Unknown)
    }

    pub fn state(&self) -> FieldState {
        match self {
            Observed::Known(_) => FieldState::Known,
            Observed::Unknown => FieldState::Unknown,
            Observed::NotApplicable => FieldState::NotApplicable,
        }
    }
}

impl<T: PartialEq> Observed<T> {
    pub fn is(&self, expected: &T) -> bool {
        self.known() == Some(expected)
    }
}

impl Observed<bool> {
    pub fn is_true(&self) -> bool {
        matches!(self, Observed::Known(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Observed::Known(false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Known,
    Unknown,
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    #[serde(alias = "phase_1", alias = "p1", alias = "1")]
    Phase1,
    #[serde(alias = "phase_2", alias = "p2", alias = "2")]
    Phase2,
    #[serde(alias = "phase_3", alias = "p3", alias = "3")]
    Phase3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdComOutcome {
    #[serde(alias = "favorable")]
    Positive,
    #[serde(alias = "unfavorable")]
    Negative,
    #[serde(alias = "split")]
    Mixed,
    #[serde(alias = "not_held")]
    Waived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmissionClass {
    #[serde(alias = "class_1", alias = "1")]
    Class1,
    #[serde(alias = "class_2", alias = "2")]
    Class2,
}

/// Primary deficiency cited in a complete response letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrlCategory {
    Labeling,
    CmcMinor,
    CmcMajor,
    #[serde(alias = "cdmo")]
    CdmoThirdParty,
    #[serde(alias = "safety")]
    SafetyRems,
    EfficacySupplement,
    EfficacyNewTrial,
    TrialDesign,
    Statistical,
}

impl CrlCategory {
    /// CRLs limited to manufacturing questions, which resubmissions usually
    /// resolve.
    pub fn is_cmc_only(self) -> bool {
        matches!(
            self,
            CrlCategory::CmcMinor | CrlCategory::CmcMajor | CrlCategory::CdmoThirdParty
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            CrlCategory::Labeling => "labeling",
            CrlCategory::CmcMinor => "minor CMC",
            CrlCategory::CmcMajor => "major CMC",
            CrlCategory::CdmoThirdParty => "third-party CDMO",
            CrlCategory::SafetyRems => "safety/REMS",
            CrlCategory::EfficacySupplement => "supplemental efficacy",
            CrlCategory::EfficacyNewTrial => "new efficacy trial",
            CrlCategory::TrialDesign => "trial design",
            CrlCategory::Statistical => "statistical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialRegion {
    Global,
    #[serde(alias = "us")]
    UsOnly,
    #[serde(alias = "non_us")]
    ExUs,
    #[serde(alias = "china")]
    ChinaOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentalHealthIndication {
    #[serde(alias = "major_depressive_disorder", alias = "depression")]
    Mdd,
    Ptsd,
    #[serde(alias = "gad")]
    Anxiety,
    #[serde(alias = "bipolar_disorder")]
    Bipolar,
    Schizophrenia,
    Other,
}

impl MentalHealthIndication {
    pub fn label(self) -> &'static str {
        match self {
            MentalHealthIndication::Mdd => "major depressive disorder",
            MentalHealthIndication::Ptsd => "PTSD",
            MentalHealthIndication::Anxiety => "anxiety disorder",
            MentalHealthIndication::Bipolar => "bipolar disorder",
            MentalHealthIndication::Schizophrenia => "schizophrenia",
            MentalHealthIndication::Other => "other psychiatric",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form483Severity {
    /// Inspection closed with a Form 483 listing nothing.
    NoObservations,
    Minor,
    Moderate,
    Critical,
}

impl Form483Severity {
    /// Grades a Form 483 by its observation count.
    pub fn from_observations(count: i64) -> Option<Self> {
        match count {
            i64::MIN..=-1 => None,
            0 => Some(Self::NoObservations),
            1..=2 => Some(Self::Minor),
            3..=5 => Some(Self::Moderate),
            _ => Some(Self::Critical),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaStatus {
    Agreed,
    Rescinded,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    #[serde(alias = "won")]
    WonFully,
    #[serde(alias = "partially_won")]
    Partial,
    #[serde(alias = "lost")]
    LostFully,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionStatus {
    #[serde(alias = "pending")]
    Filed,
    Denied,
    Granted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementTone {
    Confident,
    Neutral,
    Cautious,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Designations {
    pub breakthrough_therapy: Observed<bool>,
    pub priority_review: Observed<bool>,
    pub fast_track: Observed<bool>,
    pub orphan_drug: Observed<bool>,
    pub accelerated_approval: Observed<bool>,
}

impl Designations {
    pub fn any_held(&self) -> bool {
        [
            &self.breakthrough_therapy,
            &self.priority_review,
            &self.fast_track,
            &self.orphan_drug,
            &self.accelerated_approval,
        ]
        .iter()
        .any(|flag| flag.is_true())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdComRecord {
    pub held: Observed<bool>,
    /// Share of votes in favor, in `[0, 1]`.
    pub vote_ratio: Observed<f64>,
    pub outcome: Observed<AdComOutcome>,
    pub meeting_date: Observed<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrlHistory {
    pub prior_crl: Observed<bool>,
    pub category: Observed<CrlCategory>,
    /// Zero for an original submission.
    pub resubmission_number: Observed<u32>,
    pub resubmission_class: Observed<ResubmissionClass>,
    pub letter_date: Observed<NaiveDate>,
}

impl CrlHistory {
    pub fn is_resubmission(&self) -> bool {
        self.resubmission_number
            .known()
            .is_some_and(|number| *number >= 1)
    }

    pub fn is_cmc_only(&self) -> bool {
        self.category
            .known()
            .is_some_and(|category| category.is_cmc_only())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalEvidence {
    pub trial_phase: Observed<TrialPhase>,
    pub primary_endpoint_met: Observed<bool>,
    pub single_arm: Observed<bool>,
    pub trial_region: Observed<TrialRegion>,
    pub mental_health_indication: Observed<MentalHealthIndication>,
    pub clinical_hold_history: Observed<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManufacturingRecord {
    pub pai_passed: Observed<bool>,
    pub pai_date: Observed<NaiveDate>,
    pub warning_letter: Observed<bool>,
    pub warning_letter_date: Observed<NaiveDate>,
    pub form_483_severity: Observed<Form483Severity>,
    pub form_483_date: Observed<NaiveDate>,
    pub high_risk_cdmo: Observed<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisputeRecord {
    pub filed: Observed<bool>,
    pub outcome: Observed<DisputeOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsCallSignals {
    pub label_negotiation: Observed<bool>,
    pub timeline_delayed: Observed<bool>,
    pub management_tone: Observed<ManagementTone>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitizenPetition {
    pub filed: Observed<bool>,
    pub status: Observed<PetitionStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialFlags {
    pub first_in_class: Observed<bool>,
    pub supplement: Observed<bool>,
    pub biosimilar: Observed<bool>,
    pub spa_status: Observed<SpaStatus>,
}

/// Trust tier of an admitted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    Inferred,
    Secondary,
    CrossVerified,
    Official,
}

impl VerificationTier {
    pub fn is_verified(self) -> bool {
        matches!(self, VerificationTier::CrossVerified | VerificationTier::Official)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub tier: VerificationTier,
    pub observed_on: Option<NaiveDate>,
}

/// Addressable fact slots of an [`AnalysisContext`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    BreakthroughTherapy,
    PriorityReview,
    FastTrack,
    OrphanDrug,
    AcceleratedApproval,
    AdcomHeld,
    AdcomVoteRatio,
    AdcomOutcome,
    AdcomDate,
    PriorCrl,
    CrlCategory,
    ResubmissionNumber,
    ResubmissionClass,
    CrlDate,
    TrialPhase,
    PrimaryEndpointMet,
    SingleArm,
    TrialRegion,
    MentalHealthIndication,
    ClinicalHoldHistory,
    PaiPassed,
    PaiDate,
    WarningLetter,
    WarningLetterDate,
    #[serde(rename = "form_483_severity", alias = "form_483_observations")]
    Form483Severity,
    #[serde(rename = "form_483_date")]
    Form483Date,
    HighRiskCdmo,
    DisputeFiled,
    DisputeOutcome,
    LabelNegotiation,
    TimelineDelayed,
    ManagementTone,
    CitizenPetition,
    PetitionStatus,
    FirstInClass,
    Supplement,
    Biosimilar,
    SpaStatus,
}

impl ContextField {
    pub const ALL: [ContextField; 38] = [
        ContextField::BreakthroughTherapy,
        ContextField::PriorityReview,
        ContextField::FastTrack,
        ContextField::OrphanDrug,
        ContextField::AcceleratedApproval,
        ContextField::AdcomHeld,
        ContextField::AdcomVoteRatio,
        ContextField::AdcomOutcome,
        ContextField::AdcomDate,
        ContextField::PriorCrl,
        ContextField::CrlCategory,
        ContextField::ResubmissionNumber,
        ContextField::ResubmissionClass,
        ContextField::CrlDate,
        ContextField::TrialPhase,
        ContextField::PrimaryEndpointMet,
        ContextField::SingleArm,
        ContextField::TrialRegion,
        ContextField::MentalHealthIndication,
        ContextField::ClinicalHoldHistory,
        ContextField::PaiPassed,
        ContextField::PaiDate,
        ContextField::WarningLetter,
        ContextField::WarningLetterDate,
        ContextField::Form483Severity,
        ContextField::Form483Date,
        ContextField::HighRiskCdmo,
        ContextField::DisputeFiled,
        ContextField::DisputeOutcome,
        ContextField::LabelNegotiation,
        ContextField::TimelineDelayed,
        ContextField::ManagementTone,
        ContextField::CitizenPetition,
        ContextField::PetitionStatus,
        ContextField::FirstInClass,
        ContextField::Supplement,
        ContextField::Biosimilar,
        ContextField::SpaStatus,
    ];

    /// Fields whose absence leaves a visible hole in the estimate, with the
    /// severity of the warning raised when they stay unknown.
    pub const CORE: [(ContextField, WarningSeverity); 7] = [
        (ContextField::PrimaryEndpointMet, WarningSeverity::Major),
        (ContextField::TrialPhase, WarningSeverity::Minor),
        (ContextField::PriorCrl, WarningSeverity::Minor),
        (ContextField::AdcomHeld, WarningSeverity::Minor),
        (ContextField::PaiPassed, WarningSeverity::Minor),
        (ContextField::WarningLetter, WarningSeverity::Minor),
        (ContextField::BreakthroughTherapy, WarningSeverity::Info),
    ];

    pub fn key(self) -> &'static str {
        match self {
            ContextField::BreakthroughTherapy => "breakthrough_therapy",
            ContextField::PriorityReview => "priority_review",
            ContextField::FastTrack => "fast_track",
            ContextField::OrphanDrug => "orphan_drug",
            ContextField::AcceleratedApproval => "accelerated_approval",
            ContextField::AdcomHeld => "adcom_held",
            ContextField::AdcomVoteRatio => "adcom_vote_ratio",
            ContextField::AdcomOutcome => "adcom_outcome",
            ContextField::AdcomDate => "adcom_date",
            ContextField::PriorCrl => "prior_crl",
            ContextField::CrlCategory => "crl_category",
            ContextField::ResubmissionNumber => "resubmission_number",
            ContextField::ResubmissionClass => "resubmission_class",
            ContextField::CrlDate => "crl_date",
            ContextField::TrialPhase => "trial_phase",
            ContextField::PrimaryEndpointMet => "primary_endpoint_met",
            ContextField::SingleArm => "single_arm",
            ContextField::TrialRegion => "trial_region",
            ContextField::MentalHealthIndication => "mental_health_indication",
            ContextField::ClinicalHoldHistory => "clinical_hold_history",
            ContextField::PaiPassed => "pai_passed",
            ContextField::PaiDate => "pai_date",
            ContextField::WarningLetter => "warning_letter",
            ContextField::WarningLetterDate => "warning_letter_date",
            ContextField::Form483Severity => "form_483_severity",
            ContextField::Form483Date => "form_483_date",
            ContextField::HighRiskCdmo => "high_risk_cdmo",
            ContextField::DisputeFiled => "dispute_filed",
            ContextField::DisputeOutcome => "dispute_outcome",
            ContextField::LabelNegotiation => "label_negotiation",
            ContextField::TimelineDelayed => "timeline_delayed",
            ContextField::ManagementTone => "management_tone",
            ContextField::CitizenPetition => "citizen_petition",
            ContextField::PetitionStatus => "petition_status",
            ContextField::FirstInClass => "first_in_class",
            ContextField::Supplement => "supplement",
            ContextField::Biosimilar => "biosimilar",
            ContextField::SpaStatus => "spa_status",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        serde_json::from_value(serde_json::Value::String(normalized)).ok()
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable, normalized view of one PDUFA event.
///
/// Built either by the [`super::ContextBuilder`] from raw facts or directly by
/// callers that already hold typed data. The calculator never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub ticker: String,
    pub drug_name: String,
    pub pdufa_date: Option<NaiveDate>,
    /// Reference date for any age-based rule; fixed per analysis so repeated
    /// runs agree.
    pub analysis_date: NaiveDate,
    #[serde(default)]
    pub designations: Designations,
    #[serde(default)]
    pub adcom: AdComRecord,
    #[serde(default)]
    pub crl: CrlHistory,
    #[serde(default)]
    pub clinical: ClinicalEvidence,
    #[serde(default)]
    pub manufacturing: ManufacturingRecord,
    #[serde(default)]
    pub dispute: DisputeRecord,
    #[serde(default)]
    pub earnings_call: EarningsCallSignals,
    #[serde(default)]
    pub citizen_petition: CitizenPetition,
    #[serde(default)]
    pub special: SpecialFlags,
    #[serde(default)]
    pub provenance: BTreeMap<ContextField, FieldProvenance>,
    /// Admission notes produced while building the context.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl AnalysisContext {
    /// Context with identity set and every fact unknown.
    pub fn new(
        ticker: impl Into<String>,
        drug_name: impl Into<String>,
        pdufa_date: NaiveDate,
        analysis_date: NaiveDate,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            drug_name: drug_name.into(),
            pdufa_date: Some(pdufa_date),
            analysis_date,
            designations: Designations::default(),
            adcom: AdComRecord::default(),
            crl: CrlHistory::default(),
            clinical: ClinicalEvidence::default(),
            manufacturing: ManufacturingRecord::default(),
            dispute: DisputeRecord::default(),
            earnings_call: EarningsCallSignals::default(),
            citizen_petition: CitizenPetition::default(),
            special: SpecialFlags::default(),
            provenance: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn validate_identity(&self) -> Result<(), InvalidContext> {
        if self.ticker.trim().is_empty() {
            return Err(InvalidContext::MissingTicker);
        }
        if self.drug_name.trim().is_empty() {
            return Err(InvalidContext::MissingDrugName);
        }
        if self.pdufa_date.is_none() {
            return Err(InvalidContext::MissingDecisionDate);
        }
        Ok(())
    }

    pub fn state_of(&self, field: ContextField) -> FieldState {
        match field {
            ContextField::BreakthroughTherapy => self.designations.breakthrough_therapy.state(),
            ContextField::PriorityReview => self.designations.priority_review.state(),
            ContextField::FastTrack => self.designations.fast_track.state(),
            ContextField::OrphanDrug => self.designations.orphan_drug.state(),
            ContextField::AcceleratedApproval => self.designations.accelerated_approval.state(),
            ContextField::AdcomHeld => self.adcom.held.state(),
            ContextField::AdcomVoteRatio => self.adcom.vote_ratio.state(),
            ContextField::AdcomOutcome => self.adcom.outcome.state(),
            ContextField::AdcomDate => self.adcom.meeting_date.state(),
            ContextField::PriorCrl => self.crl.prior_crl.state(),
            ContextField::CrlCategory => self.crl.category.state(),
            ContextField::ResubmissionNumber => self.crl.resubmission_number.state(),
            ContextField::ResubmissionClass => self.crl.resubmission_class.state(),
            ContextField::CrlDate => self.crl.letter_date.state(),
            ContextField::TrialPhase => self.clinical.trial_phase.state(),
            ContextField::PrimaryEndpointMet => self.clinical.primary_endpoint_met.state(),
            ContextField::SingleArm => self.clinical.single_arm.state(),
            ContextField::TrialRegion => self.clinical.trial_region.state(),
            ContextField::MentalHealthIndication => self.clinical.mental_health_indication.state(),
            ContextField::ClinicalHoldHistory => self.clinical.clinical_hold_history.state(),
            ContextField::PaiPassed => self.manufacturing.pai_passed.state(),
            ContextField::PaiDate => self.manufacturing.pai_date.state(),
            ContextField::WarningLetter => self.manufacturing.warning_letter.state(),
            ContextField::WarningLetterDate => self.manufacturing.warning_letter_date.state(),
            ContextField::Form483Severity => self.manufacturing.form_483_severity.state(),
            ContextField::Form483Date => self.manufacturing.form_483_date.state(),
            ContextField::HighRiskCdmo => self.manufacturing.high_risk_cdmo.state(),
            ContextField::DisputeFiled => self.dispute.filed.state(),
            ContextField::DisputeOutcome => self.dispute.outcome.state(),
            ContextField::LabelNegotiation => self.earnings_call.label_negotiation.state(),
            ContextField::TimelineDelayed => self.earnings_call.timeline_delayed.state(),
            ContextField::ManagementTone => self.earnings_call.management_tone.state(),
            ContextField::CitizenPetition => self.citizen_petition.filed.state(),
            ContextField::PetitionStatus => self.citizen_petition.status.state(),
            ContextField::FirstInClass => self.special.first_in_class.state(),
            ContextField::Supplement => self.special.supplement.state(),
            ContextField::Biosimilar => self.special.biosimilar.state(),
            ContextField::SpaStatus => self.special.spa_status.state(),
        }
    }

    /// Warnings for core fields that stayed unknown, plus any admission notes.
    ///
    /// A field that was never searched produces exactly the same warning as one
    /// that is absent from the fact store.
    pub fn unresolved_warnings(&self) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = ContextField::CORE
            .iter()
            .filter(|(field, _)| self.state_of(*field) == FieldState::Unknown)
            .map(|(field, severity)| {
                Warning::new(
                    *severity,
                    format!("{field} is unverified or missing; treated as neutral"),
                )
            })
            .collect();

        warnings.extend(
            self.notes
                .iter()
                .map(|note| Warning::new(WarningSeverity::Info, note.clone())),
        );
        warnings
    }

    pub fn days_since(&self, date: NaiveDate) -> i64 {
        (self.analysis_date - date).num_days()
    }

    pub fn decision_passed(&self) -> bool {
        self.pdufa_date
            .is_some_and(|pdufa_date| pdufa_date < self.analysis_date)
    }
}

/// Rejection raised before any factor is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidContext {
    #[error("analysis context is missing a ticker")]
    MissingTicker,
    #[error("analysis context is missing a drug name")]
    MissingDrugName,
    #[error("analysis context is missing a PDUFA decision date")]
    MissingDecisionDate,
}
