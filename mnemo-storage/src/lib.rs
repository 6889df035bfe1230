//! Mnemo Storage - Blob Cache and Prompt Lookup
//!
//! The blob cache is the durable, content-addressed home of generated
//! artifacts. The prompt lookup maps a subject facet to its mnemonic text.
//! Both are read through traits so the generation service can run against
//! real backends or in-memory fakes.

pub mod blob;
pub mod catalog;
pub mod fs;
pub mod resolver;

pub use blob::{BlobStats, BlobStore, InMemoryBlobStore};
pub use catalog::{SubjectCatalog, SubjectMnemonics};
pub use fs::FsBlobStore;
pub use resolver::{
    CatalogPromptResolver, PromptResolver, StoreCatalogResolver, DEFAULT_SUBJECTS_KEY,
};
