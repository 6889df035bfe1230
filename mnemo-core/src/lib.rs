//! Mnemo Core - Shared Types
//!
//! Subjects, facets, cache keys and the error taxonomy shared by the
//! generation service and the page client. No I/O lives here.

pub mod error;
pub mod identity;
pub mod key;
pub mod prompt;

pub use error::{
    ConfigError, MnemoError, MnemoResult, StorageError, SynthesisError, ValidationError,
};
pub use identity::{Facet, SubjectId};
pub use key::{AssetBase, CacheKey, ARTIFACT_EXTENSION, SUBJECT_ID_WIDTH};
pub use prompt::mnemonic_to_prompt;
