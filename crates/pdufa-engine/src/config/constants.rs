//! Tunable constants for the probability calculator.
//!
//! Every rate, bonus, penalty, cap and interaction lives here so the factor
//! rules stay free of literals. Adjustment values are magnitudes; each rule
//! decides whether it adds or subtracts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::{CrlCategory, MentalHealthIndication};

#[derive(Debug, thiserror::Error)]
pub enum ConstantsError {
    #[error("unable to read calculator constants from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("calculator constants are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid calculator constants: {0}")]
    Invalid(String),
}

/// Full constant set injected into the registry and calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub base_rates: BaseRates,
    pub designations: DesignationAdjustments,
    pub adcom: AdComAdjustments,
    pub crl: CrlAdjustments,
    pub clinical: ClinicalAdjustments,
    pub manufacturing: ManufacturingAdjustments,
    pub dispute: DisputeAdjustments,
    pub earnings_call: EarningsCallAdjustments,
    pub citizen_petition: PetitionAdjustments,
    pub special: SpecialAdjustments,
    pub caps: HardCaps,
    pub floors: Floors,
    pub bounds: ProbabilityBounds,
    pub interactions: Vec<InteractionRule>,
    pub confidence: ConfidenceWeights,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            base_rates: BaseRates::default(),
            designations: DesignationAdjustments::default(),
            adcom: AdComAdjustments::default(),
            crl: CrlAdjustments::default(),
            clinical: ClinicalAdjustments::default(),
            manufacturing: ManufacturingAdjustments::default(),
            dispute: DisputeAdjustments::default(),
            earnings_call: EarningsCallAdjustments::default(),
            citizen_petition: PetitionAdjustments::default(),
            special: SpecialAdjustments::default(),
            caps: HardCaps::default(),
            floors: Floors::default(),
            bounds: ProbabilityBounds::default(),
            interactions: InteractionRule::defaults(),
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl CalculatorConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConstantsError> {
        let raw = fs::read_to_string(path).map_err(|source| ConstantsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses a (possibly partial) constant set; omitted sections keep their
    /// defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConstantsError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConstantsError> {
        let bounds = &self.bounds;
        if !(0.0..1.0).contains(&bounds.min) || !(0.0..=1.0).contains(&bounds.max) {
            return Err(ConstantsError::Invalid(
                "probability bounds must lie within [0, 1]".to_string(),
            ));
        }
        if bounds.min >= bounds.max {
            return Err(ConstantsError::Invalid(format!(
                "lower bound {} must be below upper bound {}",
                bounds.min, bounds.max
            )));
        }

        for (name, rate) in self.base_rates.entries() {
            if !(bounds.min..=bounds.max).contains(&rate) {
                return Err(ConstantsError::Invalid(format!(
                    "base rate '{name}' ({rate}) falls outside the probability bounds"
                )));
            }
        }

        for (name, cap) in self.caps.entries() {
            if !(bounds.min..=bounds.max).contains(&cap) {
                return Err(ConstantsError::Invalid(format!(
                    "hard cap '{name}' ({cap}) falls outside the probability bounds"
                )));
            }
        }

        for (name, floor) in [
            ("designation", self.floors.designation),
            ("spa_agreed", self.floors.spa_agreed),
        ] {
            if !(bounds.min..=bounds.max).contains(&floor) {
                return Err(ConstantsError::Invalid(format!(
                    "floor '{name}' ({floor}) falls outside the probability bounds"
                )));
            }
        }

        let weights = &self.confidence;
        let total = weights.verification + weights.recency + weights.warnings;
        if weights.verification < 0.0 || weights.recency < 0.0 || weights.warnings < 0.0 {
            return Err(ConstantsError::Invalid(
                "confidence weights must not be negative".to_string(),
            ));
        }
        if total <= 0.0 {
            return Err(ConstantsError::Invalid(
                "at least one confidence weight must be positive".to_string(),
            ));
        }

        for rule in &self.interactions {
            if rule.requires.is_empty() {
                return Err(ConstantsError::Invalid(format!(
                    "interaction '{}' has no required factors",
                    rule.name
                )));
            }
            rule.effect.validate(&rule.name)?;
        }

        Ok(())
    }
}

/// Starting probabilities per application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseRates {
    pub resubmission_class1: f64,
    pub resubmission_class1_cmc_only: f64,
    pub resubmission_class2: f64,
    pub resubmission_class2_cmc_only: f64,
    pub resubmission: f64,
    pub biosimilar: f64,
    pub phase3: f64,
    pub phase2: f64,
    pub phase1: f64,
    pub new_application: f64,
}

impl Default for BaseRates {
    fn default() -> Self {
        Self {
            resubmission_class1: 0.78,
            resubmission_class1_cmc_only: 0.86,
            resubmission_class2: 0.62,
            resubmission_class2_cmc_only: 0.72,
            resubmission: 0.55,
            biosimilar: 0.85,
            phase3: 0.65,
            phase2: 0.50,
            phase1: 0.35,
            new_application: 0.60,
        }
    }
}

impl BaseRates {
    pub fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("resubmission_class1", self.resubmission_class1),
            ("resubmission_class1_cmc_only", self.resubmission_class1_cmc_only),
            ("resubmission_class2", self.resubmission_class2),
            ("resubmission_class2_cmc_only", self.resubmission_class2_cmc_only),
            ("resubmission", self.resubmission),
            ("biosimilar", self.biosimilar),
            ("phase3", self.phase3),
            ("phase2", self.phase2),
            ("phase1", self.phase1),
            ("new_application", self.new_application),
        ]
    }

    /// Lowest configured rate, used when no base state can be established.
    pub fn most_conservative(&self) -> f64 {
        self.entries()
            .iter()
            .map(|(_, rate)| *rate)
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignationAdjustments {
    pub breakthrough_therapy: f64,
    pub priority_review: f64,
    pub fast_track: f64,
    pub orphan_drug: f64,
    pub accelerated_approval: f64,
}

impl Default for DesignationAdjustments {
    fn default() -> Self {
        Self {
            breakthrough_therapy: 0.08,
            priority_review: 0.05,
            fast_track: 0.05,
            orphan_drug: 0.04,
            accelerated_approval: 0.06,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdComAdjustments {
    pub unanimous: f64,
    pub positive: f64,
    pub negative: f64,
    pub mixed: f64,
    pub waived: f64,
    /// Vote share at or below which a meeting counts as negative.
    pub negative_vote_threshold: f64,
}

impl Default for AdComAdjustments {
    fn default() -> Self {
        Self {
            unanimous: 0.12,
            positive: 0.08,
            negative: 0.20,
            mixed: 0.05,
            waived: 0.03,
            negative_vote_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrlAdjustments {
    pub class1_bonus: f64,
    pub class2_bonus: f64,
    pub resubmission_penalty: f64,
    pub new_application_crl_penalty: f64,
    pub category_penalties: BTreeMap<CrlCategory, f64>,
}

impl Default for CrlAdjustments {
    fn default() -> Self {
        Self {
            class1_bonus: 0.05,
            class2_bonus: 0.02,
            resubmission_penalty: 0.05,
            new_application_crl_penalty: 0.10,
            category_penalties: BTreeMap::from([
                (CrlCategory::Labeling, 0.0),
                (CrlCategory::CmcMinor, 0.02),
                (CrlCategory::CmcMajor, 0.06),
                (CrlCategory::CdmoThirdParty, 0.05),
                (CrlCategory::SafetyRems, 0.08),
                (CrlCategory::EfficacySupplement, 0.08),
                (CrlCategory::EfficacyNewTrial, 0.15),
                (CrlCategory::TrialDesign, 0.12),
                (CrlCategory::Statistical, 0.10),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalAdjustments {
    pub primary_endpoint_not_met: f64,
    pub single_arm: f64,
    pub china_only: f64,
    pub clinical_hold_history: f64,
    pub mental_health: BTreeMap<MentalHealthIndication, f64>,
}

impl Default for ClinicalAdjustments {
    fn default() -> Self {
        Self {
            primary_endpoint_not_met: 0.30,
            single_arm: 0.07,
            china_only: 0.15,
            clinical_hold_history: 0.05,
            mental_health: BTreeMap::from([
                (MentalHealthIndication::Mdd, 0.12),
                (MentalHealthIndication::Ptsd, 0.10),
                (MentalHealthIndication::Anxiety, 0.08),
                (MentalHealthIndication::Bipolar, 0.06),
                (MentalHealthIndication::Schizophrenia, 0.04),
                (MentalHealthIndication::Other, 0.08),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManufacturingAdjustments {
    pub pai_passed: f64,
    pub pai_failed: f64,
    pub warning_letter: f64,
    pub form_483_minor: f64,
    pub form_483_moderate: f64,
    pub form_483_critical: f64,
    pub high_risk_cdmo: f64,
    pub temporal: TemporalRules,
}

impl Default for ManufacturingAdjustments {
    fn default() -> Self {
        Self {
            pai_passed: 0.12,
            pai_failed: 0.20,
            warning_letter: 0.30,
            form_483_minor: 0.03,
            form_483_moderate: 0.08,
            form_483_critical: 0.15,
            high_risk_cdmo: 0.05,
            temporal: TemporalRules::default(),
        }
    }
}

/// Age-based scaling for inspection findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalRules {
    pub warning_letter_stale_days: i64,
    pub warning_letter_stale_multiplier: f64,
    pub warning_letter_after_pai_multiplier: f64,
    pub form_483_aging_days: i64,
    pub form_483_aging_multiplier: f64,
    pub form_483_stale_days: i64,
    pub form_483_stale_multiplier: f64,
}

impl Default for TemporalRules {
    fn default() -> Self {
        Self {
            warning_letter_stale_days: 365,
            warning_letter_stale_multiplier: 0.5,
            warning_letter_after_pai_multiplier: 1.25,
            form_483_aging_days: 180,
            form_483_aging_multiplier: 0.75,
            form_483_stale_days: 365,
            form_483_stale_multiplier: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisputeAdjustments {
    pub won: f64,
    pub partial: f64,
    pub lost: f64,
}

impl Default for DisputeAdjustments {
    fn default() -> Self {
        Self {
            won: 0.10,
            partial: 0.05,
            lost: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsCallAdjustments {
    pub label_negotiation: f64,
    pub timeline_delay: f64,
    pub confident_tone: f64,
    pub cautious_tone: f64,
}

impl Default for EarningsCallAdjustments {
    fn default() -> Self {
        Self {
            label_negotiation: 0.08,
            timeline_delay: 0.10,
            confident_tone: 0.03,
            cautious_tone: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetitionAdjustments {
    pub filed: f64,
    pub denied: f64,
    pub granted: f64,
}

impl Default for PetitionAdjustments {
    fn default() -> Self {
        Self {
            filed: 0.08,
            denied: 0.05,
            granted: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialAdjustments {
    pub first_in_class: f64,
    pub supplement: f64,
    pub spa_agreed: f64,
    pub spa_rescinded: f64,
}

impl Default for SpecialAdjustments {
    fn default() -> Self {
        Self {
            first_in_class: 0.05,
            supplement: 0.08,
            spa_agreed: 0.08,
            spa_rescinded: 0.15,
        }
    }
}

/// Ceilings imposed by disqualifying conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardCaps {
    pub catastrophic: f64,
    pub critical: f64,
    pub severe: f64,
    pub moderate: f64,
}

impl Default for HardCaps {
    fn default() -> Self {
        Self {
            catastrophic: 0.05,
            critical: 0.15,
            severe: 0.25,
            moderate: 0.40,
        }
    }
}

impl HardCaps {
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("catastrophic", self.catastrophic),
            ("critical", self.critical),
            ("severe", self.severe),
            ("moderate", self.moderate),
        ]
    }
}

/// Minimums guaranteed by favorable standing, always subordinate to caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Floors {
    pub designation: f64,
    pub spa_agreed: f64,
}

impl Default for Floors {
    fn default() -> Self {
        Self {
            designation: 0.15,
            spa_agreed: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ProbabilityBounds {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 0.90,
        }
    }
}

impl ProbabilityBounds {
    pub fn clamp(&self, probability: f64) -> f64 {
        probability.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub verification: f64,
    pub recency: f64,
    pub warnings: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            verification: 0.5,
            recency: 0.2,
            warnings: 0.3,
        }
    }
}

/// One requirement of an interaction: a single factor name, or any one of
/// several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    Factor(String),
    AnyOf(Vec<String>),
}

impl Requirement {
    pub fn names(&self) -> &[String] {
        match self {
            Requirement::Factor(name) => std::slice::from_ref(name),
            Requirement::AnyOf(names) => names,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionEffect {
    /// Refunds a fraction of every penalty applied before the context layer.
    PenaltyReduction { fraction: f64 },
    Bonus { value: f64 },
    /// Deepens the named penalties by a fraction of their combined size.
    PenaltyAmplification { fraction: f64, targets: Vec<String> },
}

impl InteractionEffect {
    fn validate(&self, rule: &str) -> Result<(), ConstantsError> {
        let (label, value, max) = match self {
            InteractionEffect::PenaltyReduction { fraction } => ("reduction fraction", *fraction, 1.0),
            InteractionEffect::Bonus { value } => ("bonus", *value, 1.0),
            InteractionEffect::PenaltyAmplification { fraction, .. } => {
                ("amplification fraction", *fraction, f64::MAX)
            }
        };
        if !value.is_finite() || !(0.0..=max).contains(&value) {
            return Err(ConstantsError::Invalid(format!(
                "interaction '{rule}' has an out-of-range {label} ({value})"
            )));
        }
        Ok(())
    }
}

/// Configured combination effect evaluated in the context layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub requires: Vec<Requirement>,
    pub effect: InteractionEffect,
}

impl InteractionRule {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "strong_designation_combo".to_string(),
                description: "Breakthrough, orphan and first-in-class together soften penalties"
                    .to_string(),
                requires: vec![
                    Requirement::Factor("breakthrough_therapy".to_string()),
                    Requirement::Factor("orphan_drug".to_string()),
                    Requirement::Factor("first_in_class".to_string()),
                ],
                effect: InteractionEffect::PenaltyReduction { fraction: 0.75 },
            },
            Self {
                name: "clinical_support_combo".to_string(),
                description: "Agreed SPA backed by a favorable advisory committee".to_string(),
                requires: vec![
                    Requirement::Factor("spa_agreed".to_string()),
                    Requirement::AnyOf(vec![
                        "adcom_unanimous".to_string(),
                        "adcom_vote_positive".to_string(),
                    ]),
                ],
                effect: InteractionEffect::Bonus { value: 0.03 },
            },
            Self {
                name: "manufacturing_risk_combo".to_string(),
                description: "Warning letter at a high-risk contract manufacturer".to_string(),
                requires: vec![
                    Requirement::Factor("facility_warning_letter".to_string()),
                    Requirement::Factor("cdmo_high_risk".to_string()),
                ],
                effect: InteractionEffect::PenaltyAmplification {
                    fraction: 0.25,
                    targets: vec![
                        "facility_warning_letter".to_string(),
                        "cdmo_high_risk".to_string(),
                    ],
                },
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        CalculatorConfig::default()
            .validate()
            .expect("default constants are valid");
    }

    #[test]
    fn most_conservative_rate_is_the_minimum() {
        let rates = BaseRates::default();
        assert_eq!(rates.most_conservative(), rates.phase1);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_sections() {
        let config = CalculatorConfig::from_json(r#"{ "designations": { "breakthrough_therapy": 0.1 } }"#)
            .expect("partial constants parse");
        assert_eq!(config.designations.breakthrough_therapy, 0.1);
        assert_eq!(config.designations.priority_review, 0.05);
        assert_eq!(config.caps, HardCaps::default());
        assert_eq!(config.interactions.len(), 3);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = CalculatorConfig::from_json(r#"{ "bounds": { "min": 0.9, "max": 0.1 } }"#)
            .expect_err("inverted bounds rejected");
        assert!(matches!(err, ConstantsError::Invalid(_)));
    }

    #[test]
    fn rejects_cap_outside_bounds() {
        let err = CalculatorConfig::from_json(r#"{ "caps": { "catastrophic": 0.01 } }"#)
            .expect_err("cap below global minimum rejected");
        match err {
            ConstantsError::Invalid(message) => assert!(message.contains("catastrophic")),
            other => panic!("expected invalid constants, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_interaction_effects() {
        for effect in [
            r#"{ "kind": "penalty_reduction", "fraction": 1.5 }"#,
            r#"{ "kind": "penalty_reduction", "fraction": -0.1 }"#,
            r#"{ "kind": "bonus", "value": 2.0 }"#,
            r#"{ "kind": "penalty_amplification", "fraction": -0.25, "targets": ["cdmo_high_risk"] }"#,
        ] {
            let raw = format!(
                r#"{{ "interactions": [{{ "name": "combo", "requires": ["spa_agreed"], "effect": {effect} }}] }}"#
            );
            match CalculatorConfig::from_json(&raw) {
                Err(ConstantsError::Invalid(message)) => assert!(message.contains("combo"), "{message}"),
                other => panic!("expected {effect} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_finite_interaction_effects_are_rejected() {
        let mut config = CalculatorConfig::default();
        config.interactions[1].effect = InteractionEffect::Bonus { value: f64::NAN };
        assert!(config.validate().is_err());

        let mut config = CalculatorConfig::default();
        config.interactions[2].effect = InteractionEffect::PenaltyAmplification {
            fraction: f64::INFINITY,
            targets: vec!["cdmo_high_risk".to_string()],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn interaction_requirements_accept_names_and_alternatives() {
        let raw = r#"{
            "interactions": [{
                "name": "combo",
                "requires": ["spa_agreed", ["adcom_unanimous", "adcom_vote_positive"]],
                "effect": { "kind": "bonus", "value": 0.02 }
            }]
        }"#;
        let config = CalculatorConfig::from_json(raw).expect("interaction parses");
        let rule = &config.interactions[0];
        assert_eq!(rule.requires[0].names(), ["spa_agreed".to_string()]);
        assert_eq!(rule.requires[1].names().len(), 2);
        assert_eq!(rule.effect, InteractionEffect::Bonus { value: 0.02 });
    }
}
