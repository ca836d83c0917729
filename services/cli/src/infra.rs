use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pdufa_engine::analysis::{parse_date, TrustPolicy};
use pdufa_engine::facts::{FactRecord, FactStore, FactStoreError, FactValue};
use tracing::debug;

/// Fact records stored one per file as `<event_id>.json`.
#[derive(Debug, Clone)]
pub(crate) struct JsonDirFactStore {
    root: PathBuf,
}

impl JsonDirFactStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, event_id: &str) -> PathBuf {
        self.root.join(format!("{event_id}.json"))
    }
}

impl FactStore for JsonDirFactStore {
    fn load(&self, event_id: &str) -> Result<FactRecord, FactStoreError> {
        let path = self.path_for(event_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FactStoreError::NotFound(event_id.to_string()))
            }
            Err(err) => {
                return Err(FactStoreError::Unavailable(format!(
                    "{}: {err}",
                    path.display()
                )))
            }
        };

        let mut record: FactRecord =
            serde_json::from_str(&raw).map_err(|err| FactStoreError::Malformed {
                id: event_id.to_string(),
                reason: err.to_string(),
            })?;
        if record.event_id.trim().is_empty() {
            record.event_id = event_id.to_string();
        }
        debug!(event = event_id, facts = record.facts.len(), "fact record loaded");
        Ok(record)
    }

    fn event_ids(&self) -> Result<Vec<String>, FactStoreError> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            FactStoreError::Unavailable(format!("{}: {err}", self.root.display()))
        })?;

        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_json(path))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

fn is_json(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

pub(crate) fn parse_as_of(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("failed to parse '{raw}' as a date (YYYY-MM-DD)"))
}

pub(crate) fn parse_trust_policy(raw: &str) -> Result<TrustPolicy, String> {
    TrustPolicy::parse(raw).ok_or_else(|| format!("expected 'strict' or 'standard', got '{raw}'"))
}

/// Parses a `fact=value` override. Values are read as JSON when possible so
/// `true`, `0.8` and `2` keep their types; anything else is taken as text.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, FactValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FACT=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing fact name in '{raw}'"));
    }
    let value = value.trim();
    let value = serde_json::from_str::<FactValue>(value)
        .unwrap_or_else(|_| FactValue::Text(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdufa_engine::facts::ProvenanceTag;

    fn write_record(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).expect("write fixture");
    }

    #[test]
    fn directory_store_lists_and_loads_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_record(
            dir.path(),
            "abcd-2026.json",
            r#"{
                "event_id": "abcd-2026",
                "ticker": "ABCD",
                "drug_name": "abcimab",
                "pdufa_date": "2026-04-30",
                "facts": {
                    "pai_passed": { "value": true, "provenance": "verified_primary" }
                }
            }"#,
        );
        write_record(
            dir.path(),
            "efgh-2025.json",
            r#"{ "event_id": "", "ticker": "EFGH", "drug_name": "efgostat" }"#,
        );
        write_record(dir.path(), "notes.txt", "not a record");

        let store = JsonDirFactStore::new(dir.path());
        assert_eq!(
            store.event_ids().expect("ids listed"),
            vec!["abcd-2026".to_string(), "efgh-2025".to_string()]
        );

        let record = store.load("abcd-2026").expect("record loads");
        assert_eq!(record.ticker, "ABCD");
        assert_eq!(
            record.facts["pai_passed"].provenance,
            ProvenanceTag::VerifiedPrimary
        );
        assert_eq!(
            store.load("efgh-2025").expect("record loads").event_id,
            "efgh-2025"
        );
    }

    #[test]
    fn directory_store_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_record(dir.path(), "broken.json", "{ not json");
        let store = JsonDirFactStore::new(dir.path());

        assert!(matches!(
            store.load("absent"),
            Err(FactStoreError::NotFound(id)) if id == "absent"
        ));
        assert!(matches!(
            store.load("broken"),
            Err(FactStoreError::Malformed { .. })
        ));
    }

    #[test]
    fn assignments_keep_json_types() {
        assert_eq!(
            parse_assignment("pai_passed=false"),
            Ok(("pai_passed".to_string(), FactValue::Bool(false)))
        );
        assert_eq!(
            parse_assignment("adcom_vote_ratio = 0.4"),
            Ok(("adcom_vote_ratio".to_string(), FactValue::Number(0.4)))
        );
        assert_eq!(
            parse_assignment("trial_phase=phase 2"),
            Ok((
                "trial_phase".to_string(),
                FactValue::Text("phase 2".to_string())
            ))
        );
        assert!(parse_assignment("no_equals_sign").is_err());
    }

    #[test]
    fn as_of_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date");
        assert_eq!(parse_as_of("2026-01-15"), Ok(expected));
        assert_eq!(parse_as_of("01/15/2026"), Ok(expected));
        assert!(parse_as_of("soon").is_err());
    }
}
