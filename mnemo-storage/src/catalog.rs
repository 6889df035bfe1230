//! Subject catalog: the lookup from subject id to its mnemonic texts.
//!
//! Two export shapes are accepted:
//!
//! - the subject list, `[{"id": 12, "data": {"meaning_mnemonic": "...", ...}}, ...]`
//! - the key/value export, `[{"key": "12", "value": "<subject json>"}, ...]`

use std::collections::HashMap;

use mnemo_core::{Facet, StorageError, SubjectId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct SubjectRecord {
    id: u32,
    #[serde(default)]
    data: SubjectData,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubjectData {
    #[serde(default)]
    meaning_mnemonic: Option<String>,
    #[serde(default)]
    reading_mnemonic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct KvRecord {
    key: String,
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CatalogRow {
    Subject(SubjectRecord),
    Kv(KvRecord),
}

/// Mnemonic texts of one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectMnemonics {
    pub meaning: Option<String>,
    pub reading: Option<String>,
}

impl SubjectMnemonics {
    pub fn get(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Meaning => self.meaning.as_deref(),
            Facet::Reading => self.reading.as_deref(),
        }
    }
}

/// In-memory subject lookup, read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SubjectCatalog {
    subjects: HashMap<SubjectId, SubjectMnemonics>,
}

impl SubjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse either export shape. `source` names the entry for error messages.
    pub fn from_json(source: &str, bytes: &[u8]) -> Result<Self, StorageError> {
        let malformed = |reason: String| StorageError::Malformed {
            key: source.to_string(),
            reason,
        };
        let rows: Vec<CatalogRow> =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;

        let mut catalog = Self::new();
        for row in rows {
            let record = match row {
                CatalogRow::Subject(record) => record,
                CatalogRow::Kv(kv) => serde_json::from_str::<SubjectRecord>(&kv.value)
                    .map_err(|e| malformed(format!("bad value for key {}: {}", kv.key, e)))?,
            };
            // Id 0 never names a subject; skip rather than fail the whole catalog.
            let Ok(id) = SubjectId::new(record.id) else {
                continue;
            };
            catalog.insert(
                id,
                SubjectMnemonics {
                    meaning: record.data.meaning_mnemonic,
                    reading: record.data.reading_mnemonic,
                },
            );
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, id: SubjectId, mnemonics: SubjectMnemonics) {
        self.subjects.insert(id, mnemonics);
    }

    /// Raw mnemonic text for a subject facet, if both are defined.
    pub fn mnemonic(&self, id: SubjectId, facet: Facet) -> Option<&str> {
        self.subjects.get(&id).and_then(|s| s.get(facet))
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> SubjectId {
        SubjectId::new(value).unwrap()
    }

    #[test]
    fn test_parses_subject_list() {
        let json = br#"[
            {"id": 1, "object": "radical", "data": {"meaning_mnemonic": "A <radical>ground</radical>."}},
            {"id": 440, "data": {"meaning_mnemonic": "One stick.", "reading_mnemonic": "Ichi is itchy."}}
        ]"#;
        let catalog = SubjectCatalog::from_json("subjects.json", json).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.mnemonic(id(1), Facet::Meaning),
            Some("A <radical>ground</radical>.")
        );
        assert_eq!(catalog.mnemonic(id(1), Facet::Reading), None);
        assert_eq!(catalog.mnemonic(id(440), Facet::Reading), Some("Ichi is itchy."));
        assert_eq!(catalog.mnemonic(id(999_999), Facet::Meaning), None);
    }

    #[test]
    fn test_parses_key_value_export() {
        let json = br#"[
            {"key": "7", "value": "{\"id\":7,\"data\":{\"reading_mnemonic\":\"Seven.\"}}"}
        ]"#;
        let catalog = SubjectCatalog::from_json("subjects_kv.json", json).unwrap();
        assert_eq!(catalog.mnemonic(id(7), Facet::Reading), Some("Seven."));
        assert_eq!(catalog.mnemonic(id(7), Facet::Meaning), None);
    }

    #[test]
    fn test_null_mnemonic_is_absent() {
        let json = br#"[{"id": 3, "data": {"meaning_mnemonic": null}}]"#;
        let catalog = SubjectCatalog::from_json("subjects.json", json).unwrap();
        assert_eq!(catalog.mnemonic(id(3), Facet::Meaning), None);
    }

    #[test]
    fn test_malformed_catalog_is_storage_error() {
        let err = SubjectCatalog::from_json("subjects.json", b"{not json").unwrap_err();
        assert!(matches!(err, StorageError::Malformed { ref key, .. } if key == "subjects.json"));
    }
}
