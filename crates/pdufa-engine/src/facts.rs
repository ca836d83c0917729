//! Raw fact records as they arrive from research and verification tooling.
//!
//! Nothing in here is trusted. The [`crate::analysis::ContextBuilder`] decides
//! what survives into an analysis.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a fact came from and how far it was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceTag {
    /// Confirmed against an official primary source (FDA letter, filing).
    VerifiedPrimary,
    /// Agreed on by at least two independent secondary sources.
    CrossVerifiedSecondary,
    SecondaryOnly,
    /// Derived by a model or heuristic rather than read from a source.
    InferredDerived,
    Unverified,
    NotApplicable,
    /// The research step for this fact has not run.
    NotYetSearched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEntry {
    #[serde(default)]
    pub value: Option<FactValue>,
    pub provenance: ProvenanceTag,
    #[serde(default)]
    pub observed_on: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<String>,
}

impl FactEntry {
    pub fn new(value: FactValue, provenance: ProvenanceTag) -> Self {
        Self {
            value: Some(value),
            provenance,
            observed_on: None,
            source: None,
        }
    }

    pub fn observed_on(mut self, date: NaiveDate) -> Self {
        self.observed_on = Some(date);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Resolved outcome, present only for historical events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Approved,
    #[serde(alias = "complete_response", alias = "rejected")]
    Crl,
}

/// All facts known about one PDUFA event, keyed by fact name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub event_id: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub drug_name: String,
    /// Free-form date as captured upstream; parsed by the builder.
    #[serde(default)]
    pub pdufa_date: Option<String>,
    #[serde(default)]
    pub facts: BTreeMap<String, FactEntry>,
    #[serde(default)]
    pub outcome: Option<EventOutcome>,
}

impl FactRecord {
    pub fn new(
        event_id: impl Into<String>,
        ticker: impl Into<String>,
        drug_name: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            ticker: ticker.into(),
            drug_name: drug_name.into(),
            pdufa_date: None,
            facts: BTreeMap::new(),
            outcome: None,
        }
    }

    pub fn with_pdufa_date(mut self, raw: impl Into<String>) -> Self {
        self.pdufa_date = Some(raw.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: FactEntry) {
        self.facts.insert(key.into(), entry);
    }

    pub fn set(&mut self, key: impl Into<String>, value: FactValue, provenance: ProvenanceTag) {
        self.insert(key, FactEntry::new(value, provenance));
    }

    pub fn set_not_applicable(&mut self, key: impl Into<String>) {
        self.insert(
            key,
            FactEntry {
                value: None,
                provenance: ProvenanceTag::NotApplicable,
                observed_on: None,
                source: None,
            },
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FactStoreError {
    #[error("no fact record for event '{0}'")]
    NotFound(String),
    #[error("fact record '{id}' is malformed: {reason}")]
    Malformed { id: String, reason: String },
    #[error("fact store unavailable: {0}")]
    Unavailable(String),
}

/// Source of fact records. Implementations decide where records live.
pub trait FactStore: Send + Sync {
    fn load(&self, event_id: &str) -> Result<FactRecord, FactStoreError>;
    fn event_ids(&self) -> Result<Vec<String>, FactStoreError>;
}

#[derive(Default)]
pub struct InMemoryFactStore {
    records: RwLock<BTreeMap<String, FactRecord>>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: FactRecord) {
        let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(record.event_id.clone(), record);
    }
}

impl FactStore for InMemoryFactStore {
    fn load(&self, event_id: &str) -> Result<FactRecord, FactStoreError> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(event_id)
            .cloned()
            .ok_or_else(|| FactStoreError::NotFound(event_id.to_string()))
    }

    fn event_ids(&self) -> Result<Vec<String>, FactStoreError> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_accepts_mixed_value_types() {
        let raw = r#"{
            "event_id": "abcd-2026",
            "ticker": "ABCD",
            "drug_name": "abcimab",
            "pdufa_date": "2026-03-14",
            "facts": {
                "breakthrough_therapy": { "value": true, "provenance": "verified_primary" },
                "adcom_vote_ratio": { "value": 0.8, "provenance": "cross_verified_secondary" },
                "resubmission_number": { "value": 1, "provenance": "verified_primary" },
                "trial_phase": { "value": "phase 3", "provenance": "secondary_only",
                                 "observed_on": "2025-11-02", "source": "10-K" },
                "warning_letter": { "provenance": "not_yet_searched" }
            },
            "outcome": "complete_response"
        }"#;
        let record: FactRecord = serde_json::from_str(raw).expect("record parses");
        assert_eq!(record.facts.len(), 5);
        assert_eq!(
            record.facts["breakthrough_therapy"].value,
            Some(FactValue::Bool(true))
        );
        assert_eq!(
            record.facts["resubmission_number"].value,
            Some(FactValue::Integer(1))
        );
        assert_eq!(
            record.facts["adcom_vote_ratio"].value,
            Some(FactValue::Number(0.8))
        );
        assert_eq!(record.facts["warning_letter"].value, None);
        assert_eq!(record.outcome, Some(EventOutcome::Crl));
    }

    #[test]
    fn in_memory_store_reports_missing_events() {
        let store = InMemoryFactStore::new();
        store.insert(FactRecord::new("one", "ONE", "onezumab"));
        assert_eq!(store.event_ids().expect("ids list"), vec!["one".to_string()]);
        match store.load("two") {
            Err(FactStoreError::NotFound(id)) => assert_eq!(id, "two"),
            other => panic!("expected not found, got {other:?}"),
        }
    }
}
