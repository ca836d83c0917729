//! Registry of factor rules and the layer pass that evaluates them.
//!
//! Mutations replace the shared table wholesale, so a calculation holding a
//! [`RegistrySnapshot`] never observes a half-applied change.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::context::AnalysisContext;
use super::layers::{self, Layer};
use super::result::{FactorOutcome, FactorResult, Warning};
use crate::config::constants::CalculatorConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("factor '{0}' is already registered")]
    DuplicateFactor(String),
    #[error("no factor named '{0}' is registered")]
    UnknownFactor(String),
    #[error("group '{group}' conflicts with existing members: {reason}")]
    GroupConflict { group: String, reason: String },
}

/// Failure raised by a single rule; the calculation continues without it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("missing required input '{0}'")]
    MissingInput(&'static str),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPolicy {
    /// Every member whose condition holds contributes.
    Independent,
    /// The first registered member that holds contributes; the rest are
    /// suppressed.
    Exclusive,
    /// Only the member with the largest absolute adjustment contributes.
    MaxOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorGroup {
    pub key: String,
    pub policy: GroupPolicy,
}

/// Proposed movement of the running probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub value: f64,
    pub reason: String,
    pub warning: Option<Warning>,
    /// Exact landing point for resets, so caps and floors are hit without
    /// rounding drift.
    pub target: Option<f64>,
}

impl Adjustment {
    pub fn bonus(magnitude: f64, reason: impl Into<String>) -> Self {
        Self {
            value: magnitude.abs(),
            reason: reason.into(),
            warning: None,
            target: None,
        }
    }

    pub fn penalty(magnitude: f64, reason: impl Into<String>) -> Self {
        Self {
            value: -magnitude.abs(),
            reason: reason.into(),
            warning: None,
            target: None,
        }
    }

    /// Moves the running probability to `target`.
    pub fn set_to(target: f64, current: f64, reason: impl Into<String>) -> Self {
        Self {
            value: target - current,
            reason: reason.into(),
            warning: None,
            target: Some(target),
        }
    }

    /// Running probability after this adjustment.
    pub fn apply_to(&self, probability: f64) -> f64 {
        self.target.unwrap_or(probability + self.value)
    }

    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// Read-only inputs a rule may consult besides the context.
pub struct RuleInput<'a> {
    pub probability: f64,
    /// Results recorded by earlier factors in this calculation.
    pub trace: &'a [FactorResult],
    pub config: &'a CalculatorConfig,
}

impl RuleInput<'_> {
    /// True when a factor with this name held earlier in the calculation.
    pub fn held(&self, name: &str) -> bool {
        self.trace
            .iter()
            .any(|result| result.name == name && result.held())
    }
}

pub type RuleOutcome = Result<Option<Adjustment>, RuleError>;

/// Condition plus adjustment. `Ok(None)` means the condition did not hold.
pub trait FactorRule: Send + Sync {
    fn evaluate(&self, context: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome;
}

pub type RuleFn = fn(&AnalysisContext, &RuleInput<'_>) -> RuleOutcome;

struct FnRule(RuleFn);

impl FactorRule for FnRule {
    fn evaluate(&self, context: &AnalysisContext, input: &RuleInput<'_>) -> RuleOutcome {
        (self.0)(context, input)
    }
}

/// A named, ordered rule within one layer.
#[derive(Clone)]
pub struct Factor {
    pub name: String,
    pub layer: Layer,
    pub order: i32,
    pub group: Option<FactorGroup>,
    pub description: String,
    pub version: String,
    rule: Arc<dyn FactorRule>,
}

impl Factor {
    pub fn new(
        name: impl Into<String>,
        layer: Layer,
        order: i32,
        rule: Arc<dyn FactorRule>,
    ) -> Self {
        Self {
            name: name.into(),
            layer,
            order,
            group: None,
            description: String::new(),
            version: "1".to_string(),
            rule,
        }
    }

    pub fn from_fn(name: impl Into<String>, layer: Layer, order: i32, rule: RuleFn) -> Self {
        Self::new(name, layer, order, Arc::new(FnRule(rule)))
    }

    pub fn in_group(mut self, key: impl Into<String>, policy: GroupPolicy) -> Self {
        self.group = Some(FactorGroup {
            key: key.into(),
            policy,
        });
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

impl fmt::Debug for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factor")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("order", &self.order)
            .field("group", &self.group)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Diagnostic view of a registered factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorInfo {
    pub name: String,
    pub layer: Layer,
    pub order: i32,
    pub group: Option<FactorGroup>,
    pub enabled: bool,
    pub deprecated: Option<String>,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone)]
struct RegisteredFactor {
    factor: Factor,
    enabled: bool,
    deprecated: Option<String>,
    sequence: u64,
}

impl RegisteredFactor {
    fn info(&self) -> FactorInfo {
        FactorInfo {
            name: self.factor.name.clone(),
            layer: self.factor.layer,
            order: self.factor.order,
            group: self.factor.group.clone(),
            enabled: self.enabled,
            deprecated: self.deprecated.clone(),
            description: self.factor.description.clone(),
            version: self.factor.version.clone(),
        }
    }

    fn sort_key(&self) -> (Layer, i32, u64) {
        (self.factor.layer, self.factor.order, self.sequence)
    }
}

#[derive(Debug, Clone, Default)]
struct FactorTable {
    entries: Vec<RegisteredFactor>,
    next_sequence: u64,
}

impl FactorTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.factor.name == name)
    }
}

/// Thread-safe factor registry shared by every calculator built from it.
pub struct FactorRegistry {
    table: RwLock<Arc<FactorTable>>,
    config: Arc<CalculatorConfig>,
}

impl FactorRegistry {
    pub fn new(config: CalculatorConfig) -> Self {
        Self {
            table: RwLock::new(Arc::new(FactorTable::default())),
            config: Arc::new(config),
        }
    }

    /// Registry loaded with the stock factor set for every layer.
    pub fn with_defaults(config: CalculatorConfig) -> Result<Self, RegistryError> {
        let factors = layers::default_factors(&config);
        let registry = Self::new(config);
        for factor in factors {
            registry.register(factor)?;
        }
        info!(factors = registry.len(), "factor registry initialized");
        Ok(registry)
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn register(&self, factor: Factor) -> Result<(), RegistryError> {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if guard.position(&factor.name).is_some() {
            return Err(RegistryError::DuplicateFactor(factor.name));
        }
        if let Some(group) = &factor.group {
            check_group(&guard, &factor, group)?;
        }

        let table = Arc::make_mut(&mut *guard);
        let entry = RegisteredFactor {
            factor,
            enabled: true,
            deprecated: None,
            sequence: table.next_sequence,
        };
        table.next_sequence += 1;
        let at = table
            .entries
            .partition_point(|existing| existing.sort_key() <= entry.sort_key());
        debug!(factor = %entry.factor.name, layer = %entry.factor.layer, "factor registered");
        table.entries.insert(at, entry);
        Ok(())
    }

    /// Removes a factor. Returns whether anything was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = guard.position(name) else {
            return false;
        };
        Arc::make_mut(&mut *guard).entries.remove(index);
        debug!(factor = name, "factor unregistered");
        true
    }

    /// Returns `Ok(true)` when the state changed; repeating the call is a no-op.
    pub fn enable(&self, name: &str) -> Result<bool, RegistryError> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> Result<bool, RegistryError> {
        self.set_enabled(name, false)
    }

    /// Marks a factor deprecated. It keeps firing but each firing adds a
    /// warning to the result.
    pub fn deprecate(&self, name: &str, reason: impl Into<String>) -> Result<bool, RegistryError> {
        let reason = reason.into();
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let index = guard
            .position(name)
            .ok_or_else(|| RegistryError::UnknownFactor(name.to_string()))?;
        if guard.entries[index].deprecated.as_deref() == Some(reason.as_str()) {
            return Ok(false);
        }
        Arc::make_mut(&mut *guard).entries[index].deprecated = Some(reason);
        warn!(factor = name, "factor deprecated");
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<FactorInfo> {
        let snapshot = self.snapshot();
        snapshot
            .table
            .entries
            .iter()
            .find(|entry| entry.factor.name == name)
            .map(RegisteredFactor::info)
    }

    /// Every registered factor in evaluation order.
    pub fn list(&self) -> Vec<FactorInfo> {
        self.snapshot()
            .table
            .entries
            .iter()
            .map(RegisteredFactor::info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent view used for the whole of one calculation.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            table: Arc::clone(&table),
            config: Arc::clone(&self.config),
        }
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, RegistryError> {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let index = guard
            .position(name)
            .ok_or_else(|| RegistryError::UnknownFactor(name.to_string()))?;
        if guard.entries[index].enabled == enabled {
            return Ok(false);
        }
        Arc::make_mut(&mut *guard).entries[index].enabled = enabled;
        info!(factor = name, enabled, "factor toggled");
        Ok(true)
    }
}

impl fmt::Debug for FactorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorRegistry")
            .field("factors", &self.len())
            .finish_non_exhaustive()
    }
}

fn check_group(
    table: &FactorTable,
    factor: &Factor,
    group: &FactorGroup,
) -> Result<(), RegistryError> {
    let existing = table.entries.iter().find(|entry| {
        entry
            .factor
            .group
            .as_ref()
            .is_some_and(|other| other.key == group.key)
    });
    let Some(existing) = existing else {
        return Ok(());
    };
    if existing.factor.layer != factor.layer {
        return Err(RegistryError::GroupConflict {
            group: group.key.clone(),
            reason: format!(
                "members live in the {} layer, not {}",
                existing.factor.layer, factor.layer
            ),
        });
    }
    if existing.factor.group.as_ref().map(|other| other.policy) != Some(group.policy) {
        return Err(RegistryError::GroupConflict {
            group: group.key.clone(),
            reason: "members must share one group policy".to_string(),
        });
    }
    Ok(())
}

/// Condition-holding member of a group, in registration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupCandidate {
    pub sequence: u64,
    pub adjustment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Apply,
    Suppress { winner: usize },
}

/// Decides which candidates of one group contribute.
///
/// Candidates arrive in evaluation order. `MaxOnly` ties go to the earliest
/// candidate, as do `Exclusive` groups whose members share an order value.
pub fn resolve_group(policy: GroupPolicy, candidates: &[GroupCandidate]) -> Vec<Resolution> {
    let winner = match policy {
        GroupPolicy::Independent => return vec![Resolution::Apply; candidates.len()],
        GroupPolicy::Exclusive => candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, candidate)| candidate.sequence)
            .map(|(index, _)| index),
        GroupPolicy::MaxOnly => {
            candidates
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (index, candidate)| {
                    let magnitude = candidate.adjustment.abs();
                    match best {
                        Some((_, best_magnitude)) if best_magnitude >= magnitude => best,
                        _ => Some((index, magnitude)),
                    }
                })
                .map(|(index, _)| index)
        }
    };

    (0..candidates.len())
        .map(|index| match winner {
            Some(winner) if winner != index => Resolution::Suppress { winner },
            _ => Resolution::Apply,
        })
        .collect()
}

/// Output of running every layer over one context.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPass {
    pub probability: f64,
    pub trace: Vec<FactorResult>,
    pub warnings: Vec<Warning>,
}

/// Immutable registry view plus the constants it was built with.
#[derive(Clone)]
pub struct RegistrySnapshot {
    table: Arc<FactorTable>,
    config: Arc<CalculatorConfig>,
}

impl RegistrySnapshot {
    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn apply_all(&self, context: &AnalysisContext, start: f64) -> LayerPass {
        let mut trace = Vec::new();
        let mut warnings = Vec::new();
        let mut probability = start;
        for layer in Layer::ORDER {
            probability =
                self.apply_layer(layer, context, probability, &mut trace, &mut warnings);
        }
        LayerPass {
            probability,
            trace,
            warnings,
        }
    }

    /// Evaluates the enabled factors of one layer, appending to `trace`, and
    /// returns the new running probability.
    pub fn apply_layer(
        &self,
        layer: Layer,
        context: &AnalysisContext,
        probability: f64,
        trace: &mut Vec<FactorResult>,
        warnings: &mut Vec<Warning>,
    ) -> f64 {
        let members: Vec<&RegisteredFactor> = self
            .table
            .entries
            .iter()
            .filter(|entry| entry.enabled && entry.factor.layer == layer)
            .collect();

        let mut resolved: BTreeSet<&str> = BTreeSet::new();
        let mut probability = probability;
        for entry in &members {
            match &entry.factor.group {
                Some(group) if group.policy != GroupPolicy::Independent => {
                    if !resolved.insert(group.key.as_str()) {
                        continue;
                    }
                    let group_members: Vec<&RegisteredFactor> = members
                        .iter()
                        .copied()
                        .filter(|member| {
                            member
                                .factor
                                .group
                                .as_ref()
                                .is_some_and(|other| other.key == group.key)
                        })
                        .collect();
                    probability = self.apply_group(
                        group.policy,
                        &group_members,
                        context,
                        probability,
                        trace,
                        warnings,
                    );
                }
                _ => {
                    probability = self.apply_single(entry, context, probability, trace, warnings);
                }
            }
        }
        probability
    }

    /// Runs one factor by name against `probability`, outside the layer walk
    /// and ignoring its enabled flag. Grouping is not applied and the rule sees
    /// an empty trace. Returns `None` when no factor has that name.
    pub fn simulate_factor(
        &self,
        name: &str,
        context: &AnalysisContext,
        probability: f64,
        warnings: &mut Vec<Warning>,
    ) -> Option<FactorResult> {
        let entry = self
            .table
            .entries
            .iter()
            .find(|entry| entry.factor.name == name)?;

        let result = match self.evaluate(entry, context, probability, &[]) {
            Ok(Some(adjustment)) => {
                warn_if_deprecated(entry, warnings);
                if let Some(warning) = &adjustment.warning {
                    warnings.push(warning.clone());
                }
                let after = adjustment.apply_to(probability);
                applied(entry, adjustment, probability, after)
            }
            Ok(None) => FactorResult {
                name: entry.factor.name.clone(),
                layer: entry.factor.layer,
                adjustment: 0.0,
                reason: String::new(),
                probability_before: probability,
                probability_after: probability,
                outcome: FactorOutcome::NotTriggered,
            },
            Err(error) => failed(entry, &error, probability, warnings),
        };
        Some(result)
    }

    fn apply_single(
        &self,
        entry: &RegisteredFactor,
        context: &AnalysisContext,
        probability: f64,
        trace: &mut Vec<FactorResult>,
        warnings: &mut Vec<Warning>,
    ) -> f64 {
        match self.evaluate(entry, context, probability, trace) {
            Ok(Some(adjustment)) => {
                warn_if_deprecated(entry, warnings);
                if let Some(warning) = &adjustment.warning {
                    warnings.push(warning.clone());
                }
                let after = adjustment.apply_to(probability);
                trace.push(applied(entry, adjustment, probability, after));
                after
            }
            Ok(None) => probability,
            Err(error) => {
                trace.push(failed(entry, &error, probability, warnings));
                probability
            }
        }
    }

    fn apply_group(
        &self,
        policy: GroupPolicy,
        members: &[&RegisteredFactor],
        context: &AnalysisContext,
        probability: f64,
        trace: &mut Vec<FactorResult>,
        warnings: &mut Vec<Warning>,
    ) -> f64 {
        let mut held: Vec<(&RegisteredFactor, Adjustment)> = Vec::new();
        for entry in members {
            match self.evaluate(entry, context, probability, trace) {
                Ok(Some(adjustment)) => held.push((*entry, adjustment)),
                Ok(None) => {}
                Err(error) => trace.push(failed(entry, &error, probability, warnings)),
            }
        }

        let candidates: Vec<GroupCandidate> = held
            .iter()
            .map(|(entry, adjustment)| GroupCandidate {
                sequence: entry.sequence,
                adjustment: adjustment.value,
            })
            .collect();
        let resolutions = resolve_group(policy, &candidates);

        let mut probability = probability;
        for (index, (entry, adjustment)) in held.iter().enumerate() {
            if let Some(warning) = &adjustment.warning {
                warnings.push(warning.clone());
            }
            match resolutions[index] {
                Resolution::Apply => {
                    warn_if_deprecated(entry, warnings);
                    let after = adjustment.apply_to(probability);
                    trace.push(applied(entry, adjustment.clone(), probability, after));
                    probability = after;
                }
                Resolution::Suppress { winner } => {
                    trace.push(FactorResult {
                        name: entry.factor.name.clone(),
                        layer: entry.factor.layer,
                        adjustment: 0.0,
                        reason: adjustment.reason.clone(),
                        probability_before: probability,
                        probability_after: probability,
                        outcome: FactorOutcome::Suppressed {
                            winner: held[winner].0.factor.name.clone(),
                        },
                    });
                }
            }
        }
        probability
    }

    fn evaluate(
        &self,
        entry: &RegisteredFactor,
        context: &AnalysisContext,
        probability: f64,
        trace: &[FactorResult],
    ) -> RuleOutcome {
        let input = RuleInput {
            probability,
            trace,
            config: &self.config,
        };
        let outcome = entry.factor.rule.evaluate(context, &input)?;
        match outcome {
            Some(adjustment)
                if !adjustment.value.is_finite()
                    || adjustment.target.is_some_and(|target| !target.is_finite()) =>
            {
                Err(RuleError::Failed(format!(
                    "produced a non-finite adjustment ({})",
                    adjustment.value
                )))
            }
            other => Ok(other),
        }
    }
}

fn applied(
    entry: &RegisteredFactor,
    adjustment: Adjustment,
    before: f64,
    after: f64,
) -> FactorResult {
    FactorResult {
        name: entry.factor.name.clone(),
        layer: entry.factor.layer,
        adjustment: adjustment.value,
        reason: adjustment.reason,
        probability_before: before,
        probability_after: after,
        outcome: FactorOutcome::Applied,
    }
}

fn failed(
    entry: &RegisteredFactor,
    error: &RuleError,
    probability: f64,
    warnings: &mut Vec<Warning>,
) -> FactorResult {
    warn!(factor = %entry.factor.name, %error, "factor rule failed; treating as neutral");
    warnings.push(Warning::major(format!(
        "factor '{}' failed and was ignored: {error}",
        entry.factor.name
    )));
    FactorResult {
        name: entry.factor.name.clone(),
        layer: entry.factor.layer,
        adjustment: 0.0,
        reason: String::new(),
        probability_before: probability,
        probability_after: probability,
        outcome: FactorOutcome::Failed {
            error: error.to_string(),
        },
    }
}

/// Only factors that actually moved the probability warn about deprecation;
/// suppressed group members contributed nothing.
fn warn_if_deprecated(entry: &RegisteredFactor, warnings: &mut Vec<Warning>) {
    if let Some(reason) = &entry.deprecated {
        warnings.push(Warning::minor(format!(
            "factor '{}' is deprecated: {reason}",
            entry.factor.name
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(sequence: u64, adjustment: f64) -> GroupCandidate {
        GroupCandidate {
            sequence,
            adjustment,
        }
    }

    #[test]
    fn max_only_keeps_largest_magnitude() {
        let resolutions = resolve_group(
            GroupPolicy::MaxOnly,
            &[candidate(0, 0.05), candidate(1, 0.08), candidate(2, 0.04)],
        );
        assert_eq!(
            resolutions,
            vec![
                Resolution::Suppress { winner: 1 },
                Resolution::Apply,
                Resolution::Suppress { winner: 1 },
            ]
        );
    }

    #[test]
    fn max_only_ties_go_to_the_earliest_candidate() {
        let resolutions = resolve_group(
            GroupPolicy::MaxOnly,
            &[candidate(3, 0.05), candidate(4, -0.05)],
        );
        assert_eq!(
            resolutions,
            vec![Resolution::Apply, Resolution::Suppress { winner: 0 }]
        );
    }

    #[test]
    fn exclusive_prefers_registration_order() {
        let resolutions = resolve_group(
            GroupPolicy::Exclusive,
            &[candidate(7, 0.12), candidate(2, -0.20)],
        );
        assert_eq!(
            resolutions,
            vec![Resolution::Suppress { winner: 1 }, Resolution::Apply]
        );
    }

    #[test]
    fn independent_applies_everything() {
        let resolutions = resolve_group(
            GroupPolicy::Independent,
            &[candidate(0, 0.1), candidate(1, 0.2)],
        );
        assert_eq!(resolutions, vec![Resolution::Apply, Resolution::Apply]);
    }

    #[test]
    fn empty_group_resolves_to_nothing() {
        assert!(resolve_group(GroupPolicy::MaxOnly, &[]).is_empty());
    }
}
