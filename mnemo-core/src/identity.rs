//! Identity types for subjects and their facets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// ============================================================================
// SUBJECT
// ============================================================================

/// Identifier of a learning item. Always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SubjectId(u32);

impl SubjectId {
    /// Create a subject id, rejecting zero.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidSubjectId {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    /// The raw numeric id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for u32 {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl FromStr for SubjectId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidSubjectId {
                value: trimmed.to_string(),
            })?;
        Self::new(value)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FACET
// ============================================================================

/// One of the two mnemonic aspects of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Meaning,
    Reading,
}

impl Facet {
    /// Every facet, in a stable order.
    pub const ALL: [Facet; 2] = [Facet::Meaning, Facet::Reading];

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Meaning => "meaning",
            Facet::Reading => "reading",
        }
    }
}

impl FromStr for Facet {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meaning" => Ok(Facet::Meaning),
            "reading" => Ok(Facet::Reading),
            other => Err(ValidationError::UnknownFacet {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
