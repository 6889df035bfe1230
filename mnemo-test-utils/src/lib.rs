//! Mnemo Test Utilities
//!
//! Shared test infrastructure for the mnemo workspace:
//! - An in-memory host page
//! - Fakes for the client's probe, sleep, remote, credential and notice seams
//! - A blob store that fails on demand
//! - Proptest generators and page fixtures
//! - Assertions for the one-element-per-slot rule

mod page;

pub use page::MemoryPage;

// Re-export types tests reach for alongside the fakes
pub use mnemo_client::{
    ClientError, ClientResult, GenerationReceipt, HostPage, NodeId, Notice, ProbeResult, Selector,
    SlotElement,
};
pub use mnemo_core::{
    AssetBase, CacheKey, Facet, MnemoError, MnemoResult, StorageError, SubjectId,
};
pub use mnemo_llm::MockImageSynthesizer;
pub use mnemo_storage::{BlobStats, BlobStore, InMemoryBlobStore};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// CLIENT FAKES
// ============================================================================

/// Prober answering from a per-URL table, then a queue, then a fallback.
#[derive(Debug)]
pub struct ScriptedProber {
    routes: Mutex<HashMap<String, ProbeResult>>,
    queue: Mutex<VecDeque<ProbeResult>>,
    fallback: ProbeResult,
    urls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    /// Every probe answers `result`.
    pub fn always(result: ProbeResult) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            fallback: result,
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `results` in order, then `fallback` forever.
    pub fn sequence(results: Vec<ProbeResult>, fallback: ProbeResult) -> Self {
        let prober = Self::always(fallback);
        *prober.queue.lock().unwrap() = results.into();
        prober
    }

    /// Fix the answer for one URL.
    pub fn route(self, url: impl Into<String>, result: ProbeResult) -> Self {
        self.routes.lock().unwrap().insert(url.into(), result);
        self
    }

    /// Change the answer for one URL after construction.
    pub fn set_route(&self, url: impl Into<String>, result: ProbeResult) {
        self.routes.lock().unwrap().insert(url.into(), result);
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl mnemo_client::Prober for ScriptedProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(result) = self.routes.lock().unwrap().get(url) {
            return result.clone();
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl mnemo_client::Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Generation endpoint returning a fixed result.
#[derive(Debug)]
pub struct FakeGenerationApi {
    result: ClientResult<GenerationReceipt>,
    calls: Mutex<Vec<(SubjectId, Facet, String)>>,
}

impl FakeGenerationApi {
    /// Answer 201 with `url`.
    pub fn created(url: impl Into<String>) -> Self {
        Self {
            result: Ok(GenerationReceipt {
                created: true,
                message: "Image generated and stored.".to_string(),
                url: url.into(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ClientError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(subject, facet, credential)` of each call.
    pub fn calls(&self) -> Vec<(SubjectId, Facet, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl mnemo_client::GenerationApi for FakeGenerationApi {
    async fn request_generation(
        &self,
        subject: SubjectId,
        facet: Facet,
        credential: &str,
    ) -> ClientResult<GenerationReceipt> {
        self.calls
            .lock()
            .unwrap()
            .push((subject, facet, credential.to_string()));
        self.result.clone()
    }
}

/// Credential source with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl StaticCredentials {
    pub fn key(value: &str) -> Self {
        Self(Some(value.to_string()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl mnemo_client::CredentialSource for StaticCredentials {
    fn credential(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Notifier that keeps every notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl mnemo_client::Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// ============================================================================
// STORAGE FAKES
// ============================================================================

/// Which blob store operations fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Reads,
    Writes,
}

/// In-memory store whose reads or writes always fail.
#[derive(Debug)]
pub struct FailingBlobStore {
    inner: InMemoryBlobStore,
    mode: FailureMode,
    attempts: AtomicUsize,
}

impl FailingBlobStore {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            mode,
            attempts: AtomicUsize::new(0),
        }
    }

    /// The underlying store, for seeding and inspection.
    pub fn inner(&self) -> &InMemoryBlobStore {
        &self.inner
    }

    /// Operations that were refused.
    pub fn failed_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn get(&self, key: &str) -> MnemoResult<Option<Vec<u8>>> {
        if self.mode == FailureMode::Reads {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> MnemoResult<()> {
        if self.mode == FailureMode::Writes {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.put(key, bytes).await
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for mnemo identity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid subject id (1..=99999, the five-digit range).
    pub fn arb_subject_id() -> impl Strategy<Value = SubjectId> {
        (1u32..=99_999).prop_filter_map("non-zero", |n| SubjectId::new(n).ok())
    }

    /// Generate a subject id of any width.
    pub fn arb_wide_subject_id() -> impl Strategy<Value = SubjectId> {
        (1u32..=u32::MAX).prop_filter_map("non-zero", |n| SubjectId::new(n).ok())
    }

    pub fn arb_facet() -> impl Strategy<Value = Facet> {
        prop_oneof![Just(Facet::Meaning), Just(Facet::Reading)]
    }

    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        (arb_subject_id(), arb_facet()).prop_map(|(subject, facet)| CacheKey::new(subject, facet))
    }

    /// A mix of transient probe outcomes (neither found nor not-found).
    pub fn arb_transient_probe() -> impl Strategy<Value = ProbeResult> {
        prop_oneof![
            (500u16..600).prop_map(ProbeResult::Unexpected),
            Just(ProbeResult::Unexpected(403)),
            "[a-z ]{1,20}".prop_map(ProbeResult::TransportError),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built pages and catalogs.

    use super::*;

    /// Asset host used throughout the tests.
    pub const ASSET_HOST: &str = "https://wanikani-mnemonic-images.com";

    /// Subject export with a full subject (5), a meaning-only subject (12)
    /// and a subject whose reading text is only markup (7).
    pub const SAMPLE_CATALOG: &[u8] = br#"[
        {"id": 5, "object": "kanji", "data": {
            "meaning_mnemonic": "Five <radical>fingers</radical> on one hand.",
            "reading_mnemonic": "A <reading>go</reading> board with five stones."}},
        {"id": 12, "object": "radical", "data": {
            "meaning_mnemonic": "A tiny <radical>mountain</radical>."}},
        {"id": 7, "object": "kanji", "data": {
            "meaning_mnemonic": "Seven <kanji>dwarves</kanji>.",
            "reading_mnemonic": "<reading></reading>"}}
    ]"#;

    pub fn subject(id: u32) -> SubjectId {
        SubjectId::new(id).expect("fixture subject ids are non-zero")
    }

    pub fn assets() -> AssetBase {
        AssetBase::new(ASSET_HOST)
    }

    /// Public URL for `(subject, facet)` on the fixture host.
    pub fn asset_url(subject_id: u32, facet: Facet) -> String {
        assets().url_for(&CacheKey::new(subject(subject_id), facet))
    }

    /// In-memory store holding the sample catalog under `key`.
    pub fn seeded_store(key: &str) -> InMemoryBlobStore {
        let store = InMemoryBlobStore::new();
        store
            .seed(key, SAMPLE_CATALOG)
            .expect("seeding an in-memory store cannot fail");
        store
    }

    /// A review-mode page and handles to its sections.
    #[derive(Debug, Clone)]
    pub struct ReviewPage {
        pub page: MemoryPage,
        pub label: NodeId,
        pub meaning: NodeId,
        pub meaning_note: NodeId,
        pub reading: NodeId,
        pub reading_note: NodeId,
    }

    /// Quiz answer label carrying the subject, both sections with notes.
    pub fn review_page(subject_id: u32) -> ReviewPage {
        let mut page = MemoryPage::new();
        let body = page.body();
        let id = subject_id.to_string();
        let label = page.append(
            body,
            "label",
            &[("for", "user-response"), ("data-subject-id", id.as_str())],
        );
        let (meaning, meaning_note) = review_section(&mut page, Facet::Meaning);
        let (reading, reading_note) = review_section(&mut page, Facet::Reading);
        ReviewPage {
            page,
            label,
            meaning,
            meaning_note,
            reading,
            reading_note,
        }
    }

    /// Append a fresh `#section-<facet>` with content and note; returns
    /// `(section, note)`.
    pub fn review_section(page: &mut MemoryPage, facet: Facet) -> (NodeId, NodeId) {
        let body = page.body();
        let section_id = format!("section-{}", facet);
        let section = page.append(
            body,
            "section",
            &[("id", section_id.as_str()), ("class", "subject-section")],
        );
        page.append(section, "div", &[("class", "subject-section__text")]);
        let note = page.append(section, "div", &[("class", "subject-section__note")]);
        (section, note)
    }

    /// A lesson-mode page and handles to its slides.
    #[derive(Debug, Clone)]
    pub struct LessonPage {
        pub page: MemoryPage,
        pub meta: NodeId,
        pub meaning: NodeId,
        pub reading: NodeId,
    }

    /// Subject carried by the meta tag, one content block per facet.
    pub fn lesson_page(subject_id: u32) -> LessonPage {
        let mut page = MemoryPage::new();
        let body = page.body();
        let id = subject_id.to_string();
        let meta = page.append(body, "meta", &[("name", "subject_id"), ("content", id.as_str())]);
        let slides = page.append(body, "div", &[("class", "subject-slides")]);
        let meaning = page.append(
            slides,
            "div",
            &[
                ("class", "subject-slide__content"),
                ("data-subject-slide", "meaning"),
            ],
        );
        let reading = page.append(
            slides,
            "div",
            &[
                ("class", "subject-slide__content"),
                ("data-subject-slide", "reading"),
            ],
        );
        LessonPage {
            page,
            meta,
            meaning,
            reading,
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over rendered slots.

    use super::*;
    use mnemo_client::page::{control_element_id, image_element_id};

    /// How many images and controls the page holds for a slot.
    pub fn slot_counts(page: &MemoryPage, subject: SubjectId, facet: Facet) -> (usize, usize) {
        let key = CacheKey::new(subject, facet);
        (
            page.count_with_id(&image_element_id(&key)),
            page.count_with_id(&control_element_id(&key)),
        )
    }

    /// Exactly one of image or control is present for the slot.
    #[track_caller]
    pub fn assert_exactly_one_slot_element(page: &MemoryPage, subject: SubjectId, facet: Facet) {
        let (images, controls) = slot_counts(page, subject, facet);
        assert_eq!(
            images + controls,
            1,
            "expected one slot element for {} {}, found {} images and {} controls",
            subject,
            facet,
            images,
            controls
        );
    }

    /// The slot shows the image (and no control).
    #[track_caller]
    pub fn assert_shows_image(page: &MemoryPage, subject: SubjectId, facet: Facet) {
        assert_eq!(slot_counts(page, subject, facet), (1, 0));
    }

    /// The slot shows the control (and no image).
    #[track_caller]
    pub fn assert_shows_control(page: &MemoryPage, subject: SubjectId, facet: Facet) {
        assert_eq!(slot_counts(page, subject, facet), (0, 1));
    }
}
