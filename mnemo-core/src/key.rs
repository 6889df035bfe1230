//! Cache key derivation and public retrieval URLs.
//!
//! A cache key names one artifact: `<zero-padded subject id>_<facet>.png`.
//! The same string is the storage key and the path on the public asset host.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{Facet, SubjectId};

/// Minimum width of the subject id inside a key. Wider ids are kept whole.
pub const SUBJECT_ID_WIDTH: usize = 5;

/// File extension of every stored artifact.
pub const ARTIFACT_EXTENSION: &str = "png";

/// Storage key of one (subject, facet) artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(subject: SubjectId, facet: Facet) -> Self {
        Self(format!(
            "{}.{}",
            Self::stem_for(subject, facet),
            ARTIFACT_EXTENSION
        ))
    }

    /// The key without its extension, e.g. `00012_meaning`.
    pub fn stem_for(subject: SubjectId, facet: Facet) -> String {
        format!(
            "{:0width$}_{}",
            subject.get(),
            facet,
            width = SUBJECT_ID_WIDTH
        )
    }

    /// Recover the (subject, facet) pair from a key string.
    pub fn parse(key: &str) -> Option<(SubjectId, Facet)> {
        let stem = key.strip_suffix(ARTIFACT_EXTENSION)?.strip_suffix('.')?;
        let (digits, facet) = stem.split_once('_')?;
        if digits.len() < SUBJECT_ID_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let subject = digits.parse::<SubjectId>().ok()?;
        let facet = facet.parse::<Facet>().ok()?;
        // Reject non-canonical padding such as "000012_meaning.png".
        (Self::new(subject, facet).0 == key).then_some((subject, facet))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without its extension.
    pub fn stem(&self) -> &str {
        self.0
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Base URL of the static host that serves artifacts straight from the blob cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBase(String);

impl AssetBase {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self(base.trim().trim_end_matches('/').to_string())
    }

    /// Public retrieval URL for a key.
    pub fn url_for(&self, key: &CacheKey) -> String {
        format!("{}/{}", self.0, key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: u32) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    #[test]
    fn test_key_derivation_pads_to_five_digits() {
        assert_eq!(
            CacheKey::new(subject(12), Facet::Meaning).as_str(),
            "00012_meaning.png"
        );
        assert_eq!(
            CacheKey::new(subject(7), Facet::Reading).as_str(),
            "00007_reading.png"
        );
    }

    #[test]
    fn test_key_keeps_wide_ids_whole() {
        assert_eq!(
            CacheKey::new(subject(999_999), Facet::Meaning).as_str(),
            "999999_meaning.png"
        );
    }

    #[test]
    fn test_key_stem() {
        let key = CacheKey::new(subject(5), Facet::Reading);
        assert_eq!(key.stem(), "00005_reading");
        assert_eq!(CacheKey::stem_for(subject(5), Facet::Reading), "00005_reading");
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(CacheKey::parse("subjects.json"), None);
        assert_eq!(CacheKey::parse("12_meaning.png"), None);
        assert_eq!(CacheKey::parse("000012_meaning.png"), None);
        assert_eq!(CacheKey::parse("00012_kanji.png"), None);
        assert_eq!(CacheKey::parse("00000_meaning.png"), None);
    }

    #[test]
    fn test_asset_base_trims_trailing_slash() {
        let base = AssetBase::new("https://images.example.com/");
        let key = CacheKey::new(subject(5), Facet::Reading);
        assert_eq!(
            base.url_for(&key),
            "https://images.example.com/00005_reading.png"
        );
    }
}
