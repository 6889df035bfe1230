//! Prompt resolution: (subject, facet) to the text the synthesizer draws.

use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::{mnemonic_to_prompt, Facet, MnemoError, MnemoResult, StorageError, SubjectId};
use tokio::sync::OnceCell;

use crate::blob::BlobStore;
use crate::catalog::SubjectCatalog;

/// Default blob cache entry holding the subject catalog.
pub const DEFAULT_SUBJECTS_KEY: &str = "subjects.json";

/// Maps a subject facet to a generation prompt.
///
/// `Ok(None)` means the subject is unknown or has no text for that facet.
/// `Err` is reserved for failures reading the backing data.
#[async_trait]
pub trait PromptResolver: Send + Sync {
    async fn resolve(&self, subject: SubjectId, facet: Facet) -> MnemoResult<Option<String>>;
}

/// Resolver over an already-loaded catalog.
#[derive(Debug, Clone)]
pub struct CatalogPromptResolver {
    catalog: Arc<SubjectCatalog>,
}

impl CatalogPromptResolver {
    pub fn new(catalog: SubjectCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

#[async_trait]
impl PromptResolver for CatalogPromptResolver {
    async fn resolve(&self, subject: SubjectId, facet: Facet) -> MnemoResult<Option<String>> {
        Ok(self
            .catalog
            .mnemonic(subject, facet)
            .and_then(mnemonic_to_prompt))
    }
}

/// Resolver that reads the catalog from a blob store entry on first use.
///
/// A failed load is not memoized; the next request tries again.
pub struct StoreCatalogResolver {
    store: Arc<dyn BlobStore>,
    key: String,
    catalog: OnceCell<SubjectCatalog>,
}

impl StoreCatalogResolver {
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            catalog: OnceCell::new(),
        }
    }

    async fn catalog(&self) -> MnemoResult<&SubjectCatalog> {
        self.catalog
            .get_or_try_init(|| async {
                let bytes = self
                    .store
                    .get(&self.key)
                    .await?
                    .ok_or_else(|| StorageError::MissingEntry {
                        key: self.key.clone(),
                    })?;
                let catalog = SubjectCatalog::from_json(&self.key, &bytes)?;
                tracing::info!(key = %self.key, subjects = catalog.len(), "Subject catalog loaded");
                Ok::<_, MnemoError>(catalog)
            })
            .await
    }
}

#[async_trait]
impl PromptResolver for StoreCatalogResolver {
    async fn resolve(&self, subject: SubjectId, facet: Facet) -> MnemoResult<Option<String>> {
        let catalog = self.catalog().await?;
        Ok(catalog.mnemonic(subject, facet).and_then(mnemonic_to_prompt))
    }
}

impl std::fmt::Debug for StoreCatalogResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCatalogResolver")
            .field("backend", &self.store.backend_name())
            .field("key", &self.key)
            .field("loaded", &self.catalog.initialized())
            .finish()
    }
}
